//! Change tracking for one unit of work.

use std::any::Any;
use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value as JsonValue;

use vertobank_core::AggregateRoot;
use vertobank_events::EventEnvelope;

use super::PersistenceError;
use crate::store::Mutation;

/// Object-safe view of a tracked aggregate of any type.
pub(crate) trait TrackedAggregate: Send + Sync {
    fn aggregate_type(&self) -> &'static str;

    fn key(&self) -> String;

    fn to_document(&self) -> Result<JsonValue, serde_json::Error>;

    fn pending_envelopes(&self) -> Result<Vec<EventEnvelope>, serde_json::Error>;

    fn clear_pending_events(&mut self);

    fn as_any(&self) -> &dyn Any;
}

impl<A> TrackedAggregate for A
where
    A: AggregateRoot + Serialize,
{
    fn aggregate_type(&self) -> &'static str {
        A::AGGREGATE_TYPE
    }

    fn key(&self) -> String {
        self.id().to_string()
    }

    fn to_document(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn pending_envelopes(&self) -> Result<Vec<EventEnvelope>, serde_json::Error> {
        self.pending_events()
            .iter()
            .map(|event| EventEnvelope::from_typed(self, event))
            .collect()
    }

    fn clear_pending_events(&mut self) {
        AggregateRoot::clear_pending_events(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum EntryState {
    Added,
    Modified,
    Deleted,
    Unchanged,
}

pub(crate) struct Entry {
    state: EntryState,
    aggregate: Box<dyn TrackedAggregate>,
}

impl Entry {
    fn is(&self, aggregate_type: &str, key: &str) -> bool {
        self.aggregate.aggregate_type() == aggregate_type && self.aggregate.key() == key
    }
}

/// Outcome of removing a key that is already tracked.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum TrackedRemoval {
    /// The entry was live in this unit of work and is now staged for deletion.
    Removed,
    /// The entry was already staged for deletion.
    AlreadyDeleted,
}

/// Tracked aggregates in tracking order.
///
/// At most one entry exists per `(aggregate type, key)`.
#[derive(Default)]
pub(crate) struct ChangeTracker {
    entries: Vec<Entry>,
}

impl ChangeTracker {
    fn position(&self, aggregate_type: &str, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.is(aggregate_type, key))
    }

    /// Start tracking a new aggregate (staged insert).
    pub(crate) fn add<A>(&mut self, aggregate: A) -> Result<(), PersistenceError>
    where
        A: AggregateRoot + Serialize,
    {
        let key = aggregate.id().to_string();
        if self.position(A::AGGREGATE_TYPE, &key).is_some() {
            return Err(PersistenceError::AlreadyTracked {
                aggregate_type: A::AGGREGATE_TYPE,
                key,
            });
        }

        self.entries.push(Entry {
            state: EntryState::Added,
            aggregate: Box::new(aggregate),
        });
        Ok(())
    }

    /// Start tracking several new aggregates, all or none.
    ///
    /// Every key is checked against the tracker and the rest of the batch
    /// before anything is staged.
    pub(crate) fn add_all<A>(&mut self, aggregates: Vec<A>) -> Result<(), PersistenceError>
    where
        A: AggregateRoot + Serialize,
    {
        let mut batch_keys = HashSet::with_capacity(aggregates.len());
        for aggregate in &aggregates {
            let key = aggregate.id().to_string();
            if self.position(A::AGGREGATE_TYPE, &key).is_some() || !batch_keys.insert(key.clone()) {
                return Err(PersistenceError::AlreadyTracked {
                    aggregate_type: A::AGGREGATE_TYPE,
                    key,
                });
            }
        }

        self.entries.extend(aggregates.into_iter().map(|aggregate| Entry {
            state: EntryState::Added,
            aggregate: Box::new(aggregate) as Box<dyn TrackedAggregate>,
        }));
        Ok(())
    }

    /// Attach an aggregate and flag it as modified in full.
    ///
    /// Replaces the tracked instance when the key is already tracked. A
    /// not-yet-written aggregate stays a staged insert.
    pub(crate) fn attach_modified<A>(&mut self, aggregate: A)
    where
        A: AggregateRoot + Serialize,
    {
        let key = aggregate.id().to_string();
        match self.position(A::AGGREGATE_TYPE, &key) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if entry.state != EntryState::Added {
                    entry.state = EntryState::Modified;
                }
                entry.aggregate = Box::new(aggregate);
            }
            None => self.entries.push(Entry {
                state: EntryState::Modified,
                aggregate: Box::new(aggregate),
            }),
        }
    }

    /// Stage deletion of an already-tracked key.
    ///
    /// Returns `None` when the key is not tracked. A staged insert is simply
    /// dropped, since the store never saw it.
    pub(crate) fn remove_tracked(&mut self, aggregate_type: &str, key: &str) -> Option<TrackedRemoval> {
        let idx = self.position(aggregate_type, key)?;

        match self.entries[idx].state {
            EntryState::Deleted => Some(TrackedRemoval::AlreadyDeleted),
            EntryState::Added => {
                self.entries.remove(idx);
                Some(TrackedRemoval::Removed)
            }
            EntryState::Modified | EntryState::Unchanged => {
                self.entries[idx].state = EntryState::Deleted;
                Some(TrackedRemoval::Removed)
            }
        }
    }

    /// Track an aggregate loaded from the store as deleted.
    pub(crate) fn track_deleted<A>(&mut self, aggregate: A)
    where
        A: AggregateRoot + Serialize,
    {
        self.entries.push(Entry {
            state: EntryState::Deleted,
            aggregate: Box::new(aggregate),
        });
    }

    pub(crate) fn get<A>(&self, key: &str) -> Option<&A>
    where
        A: AggregateRoot,
    {
        let idx = self.position(A::AGGREGATE_TYPE, key)?;
        self.entries[idx].aggregate.as_any().downcast_ref::<A>()
    }

    pub(crate) fn state_of(&self, aggregate_type: &str, key: &str) -> Option<EntryState> {
        self.position(aggregate_type, key).map(|idx| self.entries[idx].state)
    }

    pub(crate) fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.state != EntryState::Unchanged)
    }

    /// All pending events, in tracking order and per-aggregate raise order.
    pub(crate) fn collect_events(&self) -> Result<Vec<EventEnvelope>, PersistenceError> {
        let mut events = Vec::new();
        for entry in &self.entries {
            events.extend(entry.aggregate.pending_envelopes()?);
        }
        Ok(events)
    }

    /// The write batch for every staged change.
    pub(crate) fn mutations(&self) -> Result<Vec<Mutation>, PersistenceError> {
        let mut batch = Vec::new();
        for entry in &self.entries {
            let table = entry.aggregate.aggregate_type();
            let key = entry.aggregate.key();
            let mutation = match entry.state {
                EntryState::Unchanged => continue,
                EntryState::Added => Mutation::insert(table, key, entry.aggregate.to_document()?),
                EntryState::Modified => Mutation::update(table, key, entry.aggregate.to_document()?),
                EntryState::Deleted => Mutation::delete(table, key),
            };
            batch.push(mutation);
        }
        Ok(batch)
    }

    /// Mark the staged changes as written.
    pub(crate) fn accept_changes(&mut self) {
        self.entries.retain(|e| e.state != EntryState::Deleted);
        for entry in &mut self.entries {
            entry.state = EntryState::Unchanged;
        }
    }

    pub(crate) fn clear_events(&mut self) {
        for entry in &mut self.entries {
            entry.aggregate.clear_pending_events();
        }
    }
}
