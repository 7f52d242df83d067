//! Generic persistence abstraction over the document store.
//!
//! - [`QueryObject`]: composable read queries (filter / order / page), executed lazily
//! - [`Repository`]: staged writes for one aggregate type
//! - [`PersistenceContext`]: the unit of work; commits staged writes atomically and
//!   publishes the aggregates' domain events afterwards

pub mod context;
pub mod query_object;
pub mod repository;
mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use vertobank_core::AggregateRoot;

use crate::store::StoreError;

pub use context::{PersistenceContext, PersistenceContextFactory};
pub use query_object::{PageWindow, QueryError, QueryObject, QuerySource, StoreSource};
pub use repository::Repository;

/// An aggregate the persistence layer can store as a JSON document.
///
/// Blanket-implemented; aggregates only need the serde derives plus `Clone`.
pub trait Persistable: AggregateRoot + Serialize + DeserializeOwned + Clone {}

impl<A> Persistable for A where A: AggregateRoot + Serialize + DeserializeOwned + Clone {}

/// Unit-of-work error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The underlying write or read failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An aggregate or one of its events could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An insert targeted an aggregate this unit of work already tracks.
    #[error("{aggregate_type} '{key}' is already tracked by this unit of work")]
    AlreadyTracked {
        aggregate_type: &'static str,
        key: String,
    },

    /// The change tracker lock was poisoned by a panic.
    #[error("change tracker poisoned")]
    Poisoned,
}
