use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_FRESHNESS_HOURS;

/// Paybooks login token plus the moment it was obtained.
///
/// A token is never refreshed in place; once stale it is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// On-disk representation: `{"token": "...", "timestamp": "<ISO-8601>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub timestamp: String,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.issued_at
    }

    /// Fresh iff strictly less than 24 hours old at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now) < Duration::hours(TOKEN_FRESHNESS_HOURS)
    }

    pub fn to_stored(&self) -> StoredToken {
        StoredToken {
            token: self.token.clone(),
            timestamp: self.issued_at.to_rfc3339(),
        }
    }

    /// Accepts RFC 3339 timestamps, and naive ISO-8601 timestamps (interpreted
    /// as local time) written by older tooling.
    pub fn from_stored(stored: StoredToken) -> Option<Self> {
        let issued_at = parse_timestamp(&stored.timestamp)?;
        if stored.token.trim().is_empty() {
            return None;
        }
        Some(Self {
            token: stored.token,
            issued_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
