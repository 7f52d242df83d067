//! Unit of work + commit-time domain event dispatch.
//!
//! ## Commit pipeline
//!
//! ```text
//! commit()
//!   ↓
//! 1. Collect pending events of every tracked aggregate (tracking order, raise order)
//!   ↓
//! 2. Apply the staged mutations to the store as one atomic batch
//!   ↓   (failure: return the error, publish nothing, keep everything staged)
//! 3. Accept changes (staged entries become unchanged, deleted ones are detached)
//!   ↓
//! 4. Publish each event sequentially; failures are logged and skipped
//!   ↓
//! 5. Clear the aggregates' pending events
//! ```
//!
//! Publication happens strictly after the write, one event at a time, so event
//! N+1 is only handed to the publisher once event N's publish call returned.

use std::sync::{Arc, Mutex, MutexGuard};

use vertobank_events::{EventEnvelope, MessagePublisher};

use super::query_object::{QueryObject, StoreSource};
use super::repository::Repository;
use super::tracker::{ChangeTracker, EntryState};
use super::{Persistable, PersistenceError};
use crate::store::Store;

/// Request-scoped unit of work over one module's store.
///
/// Not meant to be shared between concurrent requests: build one per request
/// from a [`PersistenceContextFactory`].
pub struct PersistenceContext {
    store: Arc<dyn Store>,
    publisher: Arc<dyn MessagePublisher>,
    tracker: Mutex<ChangeTracker>,
}

impl PersistenceContext {
    pub fn new(store: Arc<dyn Store>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self {
            store,
            publisher,
            tracker: Mutex::new(ChangeTracker::default()),
        }
    }

    /// Write path for aggregate type `A`, staging into this unit of work.
    pub fn repository<A: Persistable>(&self) -> Repository<'_, A> {
        Repository::new(self)
    }

    /// Read path for aggregate type `A`, reading committed state from the store.
    pub fn query<A: Persistable>(&self) -> QueryObject<A> {
        QueryObject::new(Arc::new(StoreSource::<A>::new(self.store.clone())))
    }

    /// Whether any tracked aggregate has a staged change.
    pub fn has_changes(&self) -> Result<bool, PersistenceError> {
        Ok(self.tracker()?.has_changes())
    }

    /// Whether the aggregate with `id` is tracked and staged for deletion.
    pub fn is_deleted<A: Persistable>(&self, id: &A::Id) -> Result<bool, PersistenceError> {
        Ok(self.tracker()?.state_of(A::AGGREGATE_TYPE, &id.to_string()) == Some(EntryState::Deleted))
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn tracker(&self) -> Result<MutexGuard<'_, ChangeTracker>, PersistenceError> {
        self.tracker.lock().map_err(|_| PersistenceError::Poisoned)
    }

    /// Flush every staged change, then publish the collected domain events.
    ///
    /// Returns the number of written rows. Publish failures never fail the
    /// commit once the write went through.
    pub async fn commit(&self) -> Result<usize, PersistenceError> {
        let (events, batch) = {
            let tracker = self.tracker()?;
            (tracker.collect_events()?, tracker.mutations()?)
        };

        let rows = batch.len();
        if rows > 0 {
            self.store.apply(batch).await?;
        }

        self.tracker()?.accept_changes();

        let published = events.len();
        for event in events {
            self.dispatch(event).await;
        }

        self.tracker()?.clear_events();

        tracing::debug!(rows, events = published, "committed unit of work");
        Ok(rows)
    }

    async fn dispatch(&self, event: EventEnvelope) {
        if let Err(err) = self.publisher.publish(event.clone()).await {
            tracing::error!(
                error = %err,
                event_type = event.event_type(),
                aggregate_type = event.aggregate_type(),
                aggregate_key = event.aggregate_key(),
                event = %event.payload(),
                "error publishing domain event"
            );
        }
    }
}

/// Builds request-scoped [`PersistenceContext`]s for one module.
///
/// Registered once by the module's infrastructure phase; cheap to clone.
#[derive(Clone)]
pub struct PersistenceContextFactory {
    store: Arc<dyn Store>,
    publisher: Arc<dyn MessagePublisher>,
}

impl PersistenceContextFactory {
    pub fn new(store: Arc<dyn Store>, publisher: Arc<dyn MessagePublisher>) -> Self {
        Self { store, publisher }
    }

    /// Start a new unit of work.
    pub fn begin(&self) -> PersistenceContext {
        PersistenceContext::new(self.store.clone(), self.publisher.clone())
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

impl core::fmt::Debug for PersistenceContextFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistenceContextFactory").finish_non_exhaustive()
    }
}
