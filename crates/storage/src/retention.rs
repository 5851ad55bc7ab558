//! Retention policy for stored readings
//!
//! Readings are never deleted explicitly. Instead an expiration rule is
//! declared once on the `timestamp` field and the store purges old documents
//! on its own schedule.

use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use std::time::Duration;

/// Default retention window in seconds
pub const DEFAULT_RETENTION_SECS: u64 = 100;

/// Expiration rule on a timestamp field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Field the expiration is anchored on
    pub field: String,
    /// Age after which a document is eligible for removal
    pub expire_after: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RETENTION_SECS))
    }
}

impl RetentionPolicy {
    /// Expire on `timestamp` after `expire_after`
    pub fn new(expire_after: Duration) -> Self {
        Self {
            field: "timestamp".to_string(),
            expire_after,
        }
    }

    /// MongoDB TTL index implementing this policy
    pub fn index_model(&self) -> IndexModel {
        let options = IndexOptions::builder()
            .expire_after(self.expire_after)
            .build();

        let mut keys = Document::new();
        keys.insert(self.field.clone(), 1);

        IndexModel::builder()
            .keys(keys)
            .options(options)
            .build()
    }

    /// Whether a document stamped `timestamp` is past the window at `now`
    pub fn is_expired(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let window = chrono::Duration::from_std(self.expire_after)
            .unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(timestamp) > window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_default_window() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.field, "timestamp");
        assert_eq!(policy.expire_after, Duration::from_secs(100));
    }

    #[test]
    fn test_index_model() {
        let model = RetentionPolicy::default().index_model();
        assert_eq!(model.keys, doc! { "timestamp": 1 });

        let options = model.options.expect("TTL index must carry options");
        assert_eq!(options.expire_after, Some(Duration::from_secs(100)));
    }

    #[test]
    fn test_is_expired() {
        let policy = RetentionPolicy::default();
        let now = Utc::now();

        assert!(!policy.is_expired(now, now));
        assert!(!policy.is_expired(now - chrono::Duration::seconds(100), now));
        assert!(policy.is_expired(now - chrono::Duration::seconds(101), now));
    }
}
