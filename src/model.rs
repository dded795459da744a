//! Core data model.
//!
//! A pending item is one inbound payload waiting for its key to go quiet.
//! A flush takes every pending item for a key and delivers them as one
//! combined payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Pending items
// ---------------------------------------------------------------------------

/// One submission buffered for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

impl PendingItem {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}

/// Join a burst into the payload handed to the consumer.
///
/// Arrival order is preserved and nothing is deduplicated; payloads are
/// separated by a single space.
pub fn coalesce(items: &[PendingItem]) -> String {
    items
        .iter()
        .map(|item| item.payload.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Flush cycle
// ---------------------------------------------------------------------------

/// Identifies one flush cycle in logs and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlushId(pub Uuid);

impl FlushId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for FlushId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for FlushId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a flush cycle ended. Every variant returns the key to bookkeeping;
/// none of them re-queues the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The consumer returned successfully.
    Delivered,
    /// The consumer failed. The burst is reported and dropped.
    Failed(String),
    /// The cancellation signal fired before or during delivery.
    Cancelled,
}

impl FlushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FlushOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(error) => write!(f, "failed: {error}"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Key status
// ---------------------------------------------------------------------------

/// Point-in-time view of one key's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    /// Items waiting for the next flush.
    pub pending: usize,
    /// A delivery is in flight.
    pub flushing: bool,
    /// A flush is scheduled.
    pub timer_armed: bool,
}

impl KeyStatus {
    /// Nothing buffered, nothing scheduled, nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && !self.flushing && !self.timer_armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_joins_in_arrival_order() {
        let items = vec![
            PendingItem::new("hello"),
            PendingItem::new("there"),
            PendingItem::new("hello"),
        ];
        assert_eq!(coalesce(&items), "hello there hello");
    }

    #[test]
    fn coalesce_single_item_has_no_separator() {
        assert_eq!(coalesce(&[PendingItem::new("A")]), "A");
    }

    #[test]
    fn coalesce_empty_is_empty() {
        assert_eq!(coalesce(&[]), "");
    }

    #[test]
    fn flush_outcome_labels() {
        assert_eq!(FlushOutcome::Delivered.as_str(), "delivered");
        assert_eq!(FlushOutcome::Cancelled.as_str(), "cancelled");
        let failed = FlushOutcome::Failed("boom".to_string());
        assert_eq!(failed.as_str(), "failed");
        assert_eq!(failed.to_string(), "failed: boom");
    }

    #[test]
    fn flush_id_display_is_short() {
        assert_eq!(FlushId::new().to_string().len(), 8);
    }

    #[test]
    fn idle_status() {
        let idle = KeyStatus {
            pending: 0,
            flushing: false,
            timer_armed: false,
        };
        assert!(idle.is_idle());
        assert!(!KeyStatus { pending: 1, ..idle }.is_idle());
        assert!(!KeyStatus { flushing: true, ..idle }.is_idle());
    }
}
