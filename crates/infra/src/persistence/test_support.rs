//! Small aggregates shared by the persistence tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vertobank_core::{AggregateRoot, DomainEvent, DomainEvents, Entity};
use vertobank_events::InMemoryMessageBus;

use super::PersistenceContext;
use crate::store::InMemoryStore;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct CounterId(u64);

impl core::fmt::Display for CounterId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum CounterEvent {
    Created { value: i64, at: DateTime<Utc> },
    Bumped { value: i64, at: DateTime<Utc> },
}

impl DomainEvent for CounterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CounterEvent::Created { .. } => "counter.created",
            CounterEvent::Bumped { .. } => "counter.bumped",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CounterEvent::Created { at, .. } | CounterEvent::Bumped { at, .. } => *at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Counter {
    id: CounterId,
    value: i64,
    #[serde(skip)]
    events: DomainEvents<CounterEvent>,
}

impl Counter {
    pub(crate) fn key(n: u64) -> CounterId {
        CounterId(n)
    }

    pub(crate) fn value(&self) -> i64 {
        self.value
    }

    pub(crate) fn bump(&mut self) {
        self.value += 1;
        self.events.raise(CounterEvent::Bumped {
            value: self.value,
            at: Utc::now(),
        });
    }
}

impl Entity for Counter {
    type Id = CounterId;

    fn id(&self) -> &CounterId {
        &self.id
    }
}

impl AggregateRoot for Counter {
    type Event = CounterEvent;
    const AGGREGATE_TYPE: &'static str = "counter";

    fn events(&self) -> &DomainEvents<CounterEvent> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut DomainEvents<CounterEvent> {
        &mut self.events
    }
}

/// A new counter that raised its `counter.created` event.
pub(crate) fn counter(id: u64, value: i64) -> Counter {
    let mut counter = Counter {
        id: CounterId(id),
        value,
        events: DomainEvents::new(),
    };
    counter.events.raise(CounterEvent::Created {
        value,
        at: Utc::now(),
    });
    counter
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LabelCreated {
    text: String,
    at: DateTime<Utc>,
}

impl DomainEvent for LabelCreated {
    fn event_type(&self) -> &'static str {
        "label.created"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.at
    }
}

/// A second aggregate type, for ordering across tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Label {
    id: CounterId,
    text: String,
    #[serde(skip)]
    events: DomainEvents<LabelCreated>,
}

impl Entity for Label {
    type Id = CounterId;

    fn id(&self) -> &CounterId {
        &self.id
    }
}

impl AggregateRoot for Label {
    type Event = LabelCreated;
    const AGGREGATE_TYPE: &'static str = "label";

    fn events(&self) -> &DomainEvents<LabelCreated> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut DomainEvents<LabelCreated> {
        &mut self.events
    }
}

pub(crate) fn label(id: u64, text: &str) -> Label {
    let mut label = Label {
        id: CounterId(id),
        text: text.to_string(),
        events: DomainEvents::new(),
    };
    label.events.raise(LabelCreated {
        text: text.to_string(),
        at: Utc::now(),
    });
    label
}

/// A context over a fresh in-memory store and bus.
pub(crate) fn in_memory_context() -> (PersistenceContext, Arc<InMemoryStore>, Arc<InMemoryMessageBus>) {
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryMessageBus::new());
    let ctx = PersistenceContext::new(store.clone(), bus.clone());
    (ctx, store, bus)
}
