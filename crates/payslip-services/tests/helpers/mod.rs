//! Test doubles for the sync engine.

#![allow(dead_code)]

use async_trait::async_trait;
use payslip_core::{AuthenticationError, FetchError, MonthKey, PayslipArtifact};
use payslip_services::PayslipSource;
use payslip_storage::{
    Destination, DestinationBackend, StorageError, StorageResult, WriteOutcome,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the fake source answers for a given month.
#[derive(Clone)]
pub enum Reply {
    Pdf(Vec<u8>),
    Nothing,
    Error,
}

/// Scripted source. Months without a scripted reply get a small PDF.
#[derive(Default)]
pub struct FakeSource {
    replies: HashMap<MonthKey, Reply>,
    fail_auth: bool,
    pub auth_calls: AtomicUsize,
    pub fetched: Mutex<Vec<MonthKey>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, month: MonthKey, reply: Reply) -> Self {
        self.replies.insert(month, reply);
        self
    }

    pub fn failing_auth() -> Self {
        Self {
            fail_auth: true,
            ..Self::default()
        }
    }

    pub fn fetched(&self) -> Vec<MonthKey> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayslipSource for FakeSource {
    async fn authenticate(&self) -> Result<(), AuthenticationError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            Err(AuthenticationError::NoToken)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, month: &MonthKey) -> Result<Option<PayslipArtifact>, FetchError> {
        self.fetched.lock().unwrap().push(*month);
        match self.replies.get(month) {
            None => Ok(Some(PayslipArtifact::new(
                *month,
                format!("%PDF-1.4 {}", month).into_bytes(),
            ))),
            Some(Reply::Pdf(bytes)) => Ok(Some(PayslipArtifact::new(*month, bytes.clone()))),
            Some(Reply::Nothing) => Ok(None),
            Some(Reply::Error) => Err(FetchError::Transport("connection reset".into())),
        }
    }
}

/// Wraps a real destination and counts calls; can be told to fail.
pub struct CountingDestination {
    inner: Arc<dyn Destination>,
    fail_listing: bool,
    fail_writes: bool,
    pub list_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
}

impl CountingDestination {
    pub fn new(inner: Arc<dyn Destination>) -> Self {
        Self {
            inner,
            fail_listing: false,
            fail_writes: false,
            list_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Destination for CountingDestination {
    async fn list_stored_months(&self) -> StorageResult<BTreeSet<MonthKey>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(StorageError::ListFailed("quota exceeded".into()));
        }
        self.inner.list_stored_months().await
    }

    async fn write(&self, artifact: &PayslipArtifact) -> StorageResult<WriteOutcome> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StorageError::UploadFailed("503 backend error".into()));
        }
        self.inner.write(artifact).await
    }

    fn backend_type(&self) -> DestinationBackend {
        self.inner.backend_type()
    }
}

pub fn month(year: i32, month: u32) -> MonthKey {
    MonthKey::new(year, month).unwrap()
}
