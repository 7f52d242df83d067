use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use vertobank_core::{AggregateRoot, DomainEvent};

/// Envelope for a committed domain event, as handed to the message publisher.
///
/// Notes:
/// - `aggregate_type` / `aggregate_key` identify the aggregate that raised it.
/// - `payload` is the serialized domain event; consumers deserialize by `event_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_id: Uuid,

    aggregate_type: String,
    aggregate_key: String,

    event_type: String,
    occurred_at: DateTime<Utc>,

    payload: JsonValue,
}

impl EventEnvelope {
    pub fn new(
        event_id: Uuid,
        aggregate_type: impl Into<String>,
        aggregate_key: impl Into<String>,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: JsonValue,
    ) -> Self {
        Self {
            event_id,
            aggregate_type: aggregate_type.into(),
            aggregate_key: aggregate_key.into(),
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    /// Wrap a typed event raised by `aggregate`.
    pub fn from_typed<A: AggregateRoot>(
        aggregate: &A,
        event: &A::Event,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            Uuid::now_v7(),
            A::AGGREGATE_TYPE,
            aggregate.id().to_string(),
            event.event_type(),
            event.occurred_at(),
            serde_json::to_value(event)?,
        ))
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_key(&self) -> &str {
        &self.aggregate_key
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }

    pub fn into_payload(self) -> JsonValue {
        self.payload
    }
}
