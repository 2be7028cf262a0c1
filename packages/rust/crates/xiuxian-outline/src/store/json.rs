use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::persistence::persist_records;
use super::{MemoryPageStore, PageStore};
use crate::error::OutlineError;
use crate::models::PageRecord;

/// JSON-file backed store: an in-memory table flushed atomically on demand.
#[derive(Debug)]
pub struct JsonPageStore {
    path: PathBuf,
    table: MemoryPageStore,
    dirty: AtomicBool,
}

impl JsonPageStore {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or decoded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, OutlineError> {
        let path = path.into();
        let records: Vec<PageRecord> = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        info!(
            "opened page index {} ({} records)",
            path.display(),
            records.len()
        );
        Ok(Self {
            path,
            table: MemoryPageStore::from_records(records),
            dirty: AtomicBool::new(false),
        })
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are writes not yet flushed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Persist the table if it changed since the last flush.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Store`] when the table file cannot be replaced.
    pub fn flush(&self) -> Result<(), OutlineError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let records = self.table.snapshot();
        if let Err(err) = persist_records(&self.path, &records) {
            self.dirty.store(true, Ordering::Release);
            return Err(err);
        }
        debug!(
            "flushed {} page records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}

impl PageStore for JsonPageStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn upsert(&self, record: PageRecord) -> Result<(), OutlineError> {
        self.table.upsert(record)?;
        self.mark_dirty();
        Ok(())
    }

    fn get(&self, graph_id: &str, name: &str) -> Result<Option<PageRecord>, OutlineError> {
        self.table.get(graph_id, name)
    }

    fn delete(&self, graph_id: &str, name: &str) -> Result<bool, OutlineError> {
        let removed = self.table.delete(graph_id, name)?;
        if removed {
            self.mark_dirty();
        }
        Ok(removed)
    }

    fn clear_graph(&self, graph_id: &str) -> Result<usize, OutlineError> {
        let removed = self.table.clear_graph(graph_id)?;
        if removed > 0 {
            self.mark_dirty();
        }
        Ok(removed)
    }

    fn list_prefix(
        &self,
        graph_id: &str,
        name_prefix: &str,
    ) -> Result<Vec<PageRecord>, OutlineError> {
        self.table.list_prefix(graph_id, name_prefix)
    }
}
