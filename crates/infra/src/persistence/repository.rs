use std::marker::PhantomData;

use super::context::PersistenceContext;
use super::tracker::TrackedRemoval;
use super::{Persistable, PersistenceError};

/// Generic write path for one aggregate type.
///
/// A repository only stages changes in its [`PersistenceContext`]; nothing
/// reaches the store until [`Repository::commit`] (or the context's `commit`)
/// runs. Repositories for different aggregate types over the same context
/// share one unit of work.
pub struct Repository<'ctx, A> {
    context: &'ctx PersistenceContext,
    _aggregate: PhantomData<fn() -> A>,
}

impl<'ctx, A> Repository<'ctx, A>
where
    A: Persistable,
{
    pub fn new(context: &'ctx PersistenceContext) -> Self {
        Self {
            context,
            _aggregate: PhantomData,
        }
    }

    /// Stage a new aggregate for insertion.
    pub fn insert(&self, aggregate: A) -> Result<(), PersistenceError> {
        self.context.tracker()?.add(aggregate)
    }

    /// Stage several new aggregates, in order.
    ///
    /// Nothing is staged when any of them is already tracked or appears twice.
    pub fn insert_many(&self, aggregates: impl IntoIterator<Item = A>) -> Result<(), PersistenceError> {
        self.context.tracker()?.add_all(aggregates.into_iter().collect())
    }

    /// Attach a (possibly detached) aggregate and flag it as modified.
    ///
    /// The whole document is rewritten on commit; there is no partial update.
    pub fn update(&self, aggregate: A) -> Result<(), PersistenceError> {
        self.context.tracker()?.attach_modified(aggregate);
        Ok(())
    }

    /// Stage removal of the aggregate with `id`.
    ///
    /// Returns `false` (and stages nothing) when no such aggregate exists.
    pub async fn remove(&self, id: &A::Id) -> Result<bool, PersistenceError> {
        let key = id.to_string();

        let tracked = self.context.tracker()?.remove_tracked(A::AGGREGATE_TYPE, &key);
        match tracked {
            Some(TrackedRemoval::Removed) => return Ok(true),
            Some(TrackedRemoval::AlreadyDeleted) => return Ok(false),
            None => {}
        }

        let Some(document) = self.context.store().get(A::AGGREGATE_TYPE, &key).await? else {
            return Ok(false);
        };

        let aggregate: A = serde_json::from_value(document)?;
        self.context.tracker()?.track_deleted(aggregate);
        Ok(true)
    }

    /// Flush every staged change of the unit of work.
    pub async fn commit(&self) -> Result<usize, PersistenceError> {
        self.context.commit().await
    }

    /// The tracked instance of `id` in this unit of work, if any.
    pub fn tracked(&self, id: &A::Id) -> Result<Option<A>, PersistenceError> {
        Ok(self
            .context
            .tracker()?
            .get::<A>(&id.to_string())
            .cloned())
    }

    /// The aggregate with `id`, preferring the tracked instance over the store.
    pub async fn find(&self, id: &A::Id) -> Result<Option<A>, PersistenceError> {
        if let Some(tracked) = self.tracked(id)? {
            return Ok(Some(tracked));
        }

        match self.context.store().get(A::AGGREGATE_TYPE, &id.to_string()).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }
}
