use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use super::r#trait::{Mutation, MutationKind, Store, StoreError};

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance. Documents within a
/// table are kept ordered by key.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, BTreeMap<String, JsonValue>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `table` (test/diagnostic helper).
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map(BTreeMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    fn check(
        tables: &HashMap<String, BTreeMap<String, JsonValue>>,
        batch: &[Mutation],
    ) -> Result<(), StoreError> {
        // Track existence as the batch would leave it, so a batch is checked
        // against its own earlier mutations too.
        let mut overlay: HashMap<(&str, &str), bool> = HashMap::new();

        for m in batch {
            let slot = (m.table.as_str(), m.key.as_str());
            let exists = match overlay.get(&slot) {
                Some(exists) => *exists,
                None => tables
                    .get(&m.table)
                    .is_some_and(|table| table.contains_key(&m.key)),
            };

            match (&m.kind, exists) {
                (MutationKind::Insert(_), true) => {
                    return Err(StoreError::Conflict(format!("{}/{}", m.table, m.key)));
                }
                (MutationKind::Update(_) | MutationKind::Delete, false) => {
                    return Err(StoreError::Missing(format!("{}/{}", m.table, m.key)));
                }
                _ => {}
            }

            overlay.insert(slot, !matches!(m.kind, MutationKind::Delete));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn scan(&self, table: &str) -> Result<Vec<JsonValue>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(tables
            .get(table)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        Ok(tables.get(table).and_then(|docs| docs.get(key)).cloned())
    }

    async fn apply(&self, batch: Vec<Mutation>) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Validate the whole batch before touching anything (all-or-nothing).
        Self::check(&tables, &batch)?;

        for m in batch {
            let table = tables.entry(m.table).or_default();
            match m.kind {
                MutationKind::Insert(doc) | MutationKind::Update(doc) => {
                    table.insert(m.key, doc);
                }
                MutationKind::Delete => {
                    table.remove(&m.key);
                }
            }
        }

        Ok(())
    }
}
