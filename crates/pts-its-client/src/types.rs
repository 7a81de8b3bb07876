//! Transport-level value types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An authority-assigned transfer document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(String);

impl TransferId {
    /// Wrap an authority transfer id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive date range for transfer searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range.
    pub from: NaiveDate,
    /// Last day of the range.
    pub to: NaiveDate,
}

/// A bearer token with its expiry, as issued by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The bearer secret.
    pub secret: String,
    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token should be refreshed. A 30-second safety margin
    /// avoids racing the expiry on a slow request.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(30) >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_staleness_includes_safety_margin() {
        let now = Utc::now();
        let fresh = Token {
            secret: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(300),
        };
        let nearly_expired = Token {
            secret: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(10),
        };
        assert!(!fresh.is_stale(now));
        assert!(nearly_expired.is_stale(now));
    }
}
