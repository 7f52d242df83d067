use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// One staged write against a document table.
///
/// `Mutation` is what a unit of work hands to a [`Store`] on commit. Each
/// aggregate is stored as one JSON document keyed by `(table, key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub table: String,
    pub key: String,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    /// Create a new document. Fails if the key already exists.
    Insert(JsonValue),
    /// Replace an existing document in full. Fails if the key is absent.
    Update(JsonValue),
    /// Remove an existing document. Fails if the key is absent.
    Delete,
}

impl Mutation {
    pub fn insert(table: impl Into<String>, key: impl Into<String>, document: JsonValue) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            kind: MutationKind::Insert(document),
        }
    }

    pub fn update(table: impl Into<String>, key: impl Into<String>, document: JsonValue) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            kind: MutationKind::Update(document),
        }
    }

    pub fn delete(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            kind: MutationKind::Delete,
        }
    }
}

/// Store operation error.
///
/// These are **infrastructure errors**. Domain failures never reach the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert targeted a key that already exists.
    #[error("duplicate key: {0}")]
    Conflict(String),

    /// An update or delete targeted a key that does not exist.
    #[error("missing key: {0}")]
    Missing(String),

    /// The backend failed (connection, lock poisoning, driver error, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Document store underneath the persistence abstraction.
///
/// The store is supplied by the environment; the persistence layer only needs
/// three capabilities from it:
///
/// - `scan`: every document of one table (the query path)
/// - `get`: one document by key (the remove-by-id path)
/// - `apply`: an **atomic** batch of mutations (the commit path). Either every
///   mutation is applied or none is.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn scan(&self, table: &str) -> Result<Vec<JsonValue>, StoreError>;

    async fn get(&self, table: &str, key: &str) -> Result<Option<JsonValue>, StoreError>;

    async fn apply(&self, batch: Vec<Mutation>) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn scan(&self, table: &str) -> Result<Vec<JsonValue>, StoreError> {
        (**self).scan(table).await
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(table, key).await
    }

    async fn apply(&self, batch: Vec<Mutation>) -> Result<(), StoreError> {
        (**self).apply(batch).await
    }
}
