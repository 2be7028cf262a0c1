//! Page metadata store keyed by `(graph_id, name)`.

mod json;
mod persistence;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::OutlineError;
use crate::models::{PageFlag, PageRecord};

pub use self::json::JsonPageStore;

type PageKey = (String, String);

/// Persistent key/value table of [`PageRecord`]s.
///
/// Calls are synchronous so an index builder can check its generation token
/// immediately before every write.
pub trait PageStore: Send + Sync {
    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;

    /// Insert or overwrite the record at `record.key()`.
    fn upsert(&self, record: PageRecord) -> Result<(), OutlineError>;

    /// Fetch one record.
    fn get(&self, graph_id: &str, name: &str) -> Result<Option<PageRecord>, OutlineError>;

    /// Delete one record; returns whether it existed.
    fn delete(&self, graph_id: &str, name: &str) -> Result<bool, OutlineError>;

    /// Delete every record of `graph_id`; returns how many were removed.
    fn clear_graph(&self, graph_id: &str) -> Result<usize, OutlineError>;

    /// All records of `graph_id`, ordered by name.
    fn list_graph(&self, graph_id: &str) -> Result<Vec<PageRecord>, OutlineError> {
        self.list_prefix(graph_id, "")
    }

    /// Records of `graph_id` whose name starts with `name_prefix`.
    fn list_prefix(&self, graph_id: &str, name_prefix: &str)
    -> Result<Vec<PageRecord>, OutlineError>;

    /// Records of `graph_id` carrying `flag`.
    fn list_flagged(&self, graph_id: &str, flag: PageFlag) -> Result<Vec<PageRecord>, OutlineError> {
        Ok(self
            .list_graph(graph_id)?
            .into_iter()
            .filter(|record| flag.is_set(record))
            .collect())
    }
}

/// In-memory ordered table; the base of every store in this crate.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    records: RwLock<BTreeMap<PageKey, PageRecord>>,
}

impl MemoryPageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: impl IntoIterator<Item = PageRecord>) -> Self {
        let table = records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        Self {
            records: RwLock::new(table),
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<PageRecord> {
        self.read_lock().values().cloned().collect()
    }

    /// Number of records across all graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, BTreeMap<PageKey, PageRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, BTreeMap<PageKey, PageRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn graph_range<'a>(
    table: &'a BTreeMap<PageKey, PageRecord>,
    graph_id: &str,
    name_prefix: &str,
) -> impl Iterator<Item = &'a PageRecord> {
    let start = (graph_id.to_string(), name_prefix.to_string());
    let graph = graph_id.to_string();
    let prefix = name_prefix.to_string();
    table
        .range((Bound::Included(start), Bound::Unbounded))
        .take_while(move |((g, name), _)| *g == graph && name.starts_with(&prefix))
        .map(|(_, record)| record)
}

impl PageStore for MemoryPageStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn upsert(&self, record: PageRecord) -> Result<(), OutlineError> {
        self.write_lock().insert(record.key(), record);
        Ok(())
    }

    fn get(&self, graph_id: &str, name: &str) -> Result<Option<PageRecord>, OutlineError> {
        let key = (graph_id.to_string(), name.to_string());
        Ok(self.read_lock().get(&key).cloned())
    }

    fn delete(&self, graph_id: &str, name: &str) -> Result<bool, OutlineError> {
        let key = (graph_id.to_string(), name.to_string());
        Ok(self.write_lock().remove(&key).is_some())
    }

    fn clear_graph(&self, graph_id: &str) -> Result<usize, OutlineError> {
        let mut table = self.write_lock();
        let before = table.len();
        table.retain(|(graph, _), _| graph != graph_id);
        Ok(before - table.len())
    }

    fn list_prefix(
        &self,
        graph_id: &str,
        name_prefix: &str,
    ) -> Result<Vec<PageRecord>, OutlineError> {
        let table = self.read_lock();
        Ok(graph_range(&table, graph_id, name_prefix).cloned().collect())
    }
}
