use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Topic every domain event is published to. Consumers discriminate on the
/// envelope's `event_type`/`aggregate_type` fields rather than on topic.
pub mod topics {
    pub const DOMAIN_EVENTS: &str = "money-movement.domain-events";
}

/// Wire format published to external consumers, built from an
/// `OutboxEvent` row. Field names match the spec's external event payload:
/// `eventType`, `aggregateType`, `aggregateId`, `occurredAt`, `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub data: Value,
}

impl EventEnvelope {
    pub fn from_outbox_event(event: &crate::models::OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            event_type: event.event_type.clone(),
            aggregate_type: event.aggregate_type.clone(),
            aggregate_id: event.aggregate_id,
            occurred_at: event.occurred_at,
            data: event.payload.clone(),
        }
    }

    pub fn topic() -> &'static str {
        topics::DOMAIN_EVENTS
    }

    /// Partition key: events for the same aggregate publish to the same
    /// partition, preserving per-aggregate order.
    pub fn partition_key(&self) -> String {
        format!("{}:{}", self.aggregate_type, self.aggregate_id)
    }
}
