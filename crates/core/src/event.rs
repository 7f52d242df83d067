use chrono::{DateTime, Utc};
use serde::Serialize;

/// A domain event raised by an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **ordered** within the aggregate that raised them
/// - **serializable**, so they can be published as JSON envelopes after commit
pub trait DomainEvent: Clone + core::fmt::Debug + Serialize + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "items.item.created").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
