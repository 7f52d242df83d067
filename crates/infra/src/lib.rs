//! Infrastructure layer: document storage and the generic persistence abstraction.

pub mod persistence;
pub mod store;

pub use persistence::{
    PageWindow, Persistable, PersistenceContext, PersistenceContextFactory, PersistenceError,
    QueryError, QueryObject, QuerySource, Repository, StoreSource,
};
pub use store::{InMemoryStore, Mutation, MutationKind, PostgresStore, Store, StoreError};
