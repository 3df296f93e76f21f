use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A row in the transactional outbox. Written in the same database
/// transaction as the aggregate mutation it describes; published later by
/// a separate poller so the write and the publish can never diverge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// `aggregate_type` is the event's owning aggregate ("account" or
    /// "transfer"), matching the row the same transaction just wrote.
    pub fn new(aggregate_type: &str, aggregate_id: Uuid, event_type: &str, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            event_type: event_type.to_string(),
            payload,
            occurred_at: now,
            published_at: None,
            attempts: 0,
            next_attempt_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Maximum delivery attempts before an outbox row is considered
/// dead-lettered and stops being retried by the publisher.
pub const MAX_PUBLISH_ATTEMPTS: i32 = 100;

/// Cap on the exponential backoff applied between publish attempts.
pub const MAX_BACKOFF_SECONDS: i64 = 3600;

/// Backoff delay for the given attempt count, doubling from one second and
/// capped at `MAX_BACKOFF_SECONDS`. Jitter is applied by the caller, which
/// has access to a random source; this function stays deterministic so it
/// can be unit tested.
pub fn backoff_seconds(attempts: i32) -> i64 {
    let base = 1i64.saturating_shl(attempts.clamp(0, 32) as u32);
    base.min(MAX_BACKOFF_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_starts_unpublished_with_zero_attempts() {
        let event = OutboxEvent::new(
            "account",
            Uuid::new_v4(),
            "AccountFrozen",
            serde_json::json!({}),
        );
        assert!(!event.is_published());
        assert_eq!(event.attempts, 0);
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff_seconds(0), 1);
        assert_eq!(backoff_seconds(1), 2);
        assert_eq!(backoff_seconds(10), 1024);
        assert_eq!(backoff_seconds(20), MAX_BACKOFF_SECONDS);
        assert_eq!(backoff_seconds(100), MAX_BACKOFF_SECONDS);
    }
}
