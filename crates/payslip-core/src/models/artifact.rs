use bytes::Bytes;

use super::MonthKey;

/// The PDF for one pay period, owned by the run that fetched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayslipArtifact {
    pub month: MonthKey,
    pub content: Bytes,
}

impl PayslipArtifact {
    pub fn new(month: MonthKey, content: impl Into<Bytes>) -> Self {
        Self {
            month,
            content: content.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    pub fn destination_file_name(&self) -> String {
        self.month.destination_file_name()
    }
}
