//! Per-page schedule state
//!
//! Stored as JSON values in the `page_fetch_config` hash, keyed by the
//! internal page id. The value shape is shared with the downstream
//! analyzer tooling and must stay stable.

use serde::{Deserialize, Serialize};

/// Schedule state for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfigEntry {
    /// Internal page id
    pub page_id: i64,
    /// Fetch interval in seconds
    pub interval: u64,
    /// Unix timestamp of the last fetch; 0 until the scheduler runs
    pub last_fetch: i64,
}

impl FetchConfigEntry {
    /// Fresh schedule entry; `last_fetch` starts at 0 so the first
    /// scheduler pass picks the page up immediately.
    pub fn new(page_id: i64, interval: u64) -> Self {
        Self {
            page_id,
            interval,
            last_fetch: 0,
        }
    }

    /// Whether the page is due for a fetch at `now` (unix seconds)
    pub fn is_due(&self, now: i64) -> bool {
        now - self.last_fetch >= self.interval as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_immediately_due() {
        let entry = FetchConfigEntry::new(1, 3600);
        assert_eq!(entry.last_fetch, 0);
        assert!(entry.is_due(1_700_000_000));
    }

    #[test]
    fn test_is_due_respects_interval() {
        let entry = FetchConfigEntry {
            page_id: 1,
            interval: 3600,
            last_fetch: 1_700_000_000,
        };
        assert!(!entry.is_due(1_700_000_000));
        assert!(!entry.is_due(1_700_003_599));
        assert!(entry.is_due(1_700_003_600));
        assert!(entry.is_due(1_700_010_000));
    }

    #[test]
    fn test_wire_shape_is_stable() {
        let entry = FetchConfigEntry {
            page_id: 7,
            interval: 3600,
            last_fetch: 0,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"page_id": 7, "interval": 3600, "last_fetch": 0})
        );

        let parsed: FetchConfigEntry =
            serde_json::from_str(r#"{"page_id":7,"interval":3600,"last_fetch":123}"#).unwrap();
        assert_eq!(parsed.last_fetch, 123);
    }
}
