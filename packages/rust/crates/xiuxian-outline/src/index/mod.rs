//! Page index builder.
//!
//! Two sources feed the metadata store: a directory crawl
//! ([`IndexBuilder::rebuild_directory`]) and an outliner API
//! ([`IndexBuilder::rebuild_outliner`]). Every rebuild captures a
//! [`Generation`] at start and re-checks it after each listing, after each
//! batch and right before each store write; a newer rebuild (or
//! [`IndexBuilder::cancel`]) turns the older one's remaining writes into
//! no-ops.

mod dedup;
mod directory;
mod generation;
mod lazy;
mod outliner;
mod summary;

use serde::Serialize;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::OutlineError;
use crate::models::PageRecord;
use crate::store::PageStore;

pub use self::dedup::{PageListing, build_listing};
pub use self::generation::{ActiveGuard, ActiveRebuilds, Generation, GenerationCounter};
pub use self::lazy::{LazyUpsert, upsert_on_open};
pub use self::outliner::{MtimeProbe, OutlinerPage, OutlinerSource};
pub use self::summary::{
    PageSummary, SummaryLimits, first_image_ref, first_tree_image, summarize_text, summarize_tree,
};

/// Counters reported by a finished rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildStats {
    /// Records written.
    pub pages_indexed: usize,
    /// Files whose bytes were read.
    pub files_read: usize,
    /// Records whose summary was reused because `last_modified` matched.
    pub summaries_reused: usize,
    /// Later files or records with an already-seen page name.
    pub duplicates_skipped: usize,
    /// Files that could not be stat'ed or read.
    pub unreadable_skipped: usize,
    /// Outliner records skipped because they were not newer.
    pub unchanged_skipped: usize,
    /// Stale records removed after a directory crawl.
    pub stale_removed: usize,
}

/// How a rebuild ended. Supersession is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Ran to completion.
    Completed(RebuildStats),
    /// A newer rebuild or an explicit cancel took over.
    Superseded,
}

impl RebuildOutcome {
    /// Stats of a completed rebuild.
    #[must_use]
    pub fn stats(&self) -> Option<RebuildStats> {
        match self {
            Self::Completed(stats) => Some(*stats),
            Self::Superseded => None,
        }
    }
}

/// Progress snapshot passed to the optional callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildProgress {
    /// Records written so far.
    pub indexed: usize,
    /// Entries examined so far.
    pub processed: usize,
    /// Total entries when known up front (outliner source only).
    pub total: Option<usize>,
}

/// Optional progress callback.
pub type ProgressFn<'a> = Option<&'a (dyn Fn(RebuildProgress) + Send + Sync)>;

/// Index builder owning the generation token and the in-progress flag.
///
/// Cheap to clone; clones share the token, so a rebuild started from any
/// clone supersedes rebuilds running on the others.
#[derive(Debug)]
pub struct IndexBuilder<S: PageStore> {
    store: Arc<S>,
    config: IndexConfig,
    excluded_dirs: Vec<String>,
    generations: GenerationCounter,
    active: ActiveRebuilds,
}

impl<S: PageStore> Clone for IndexBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            excluded_dirs: self.excluded_dirs.clone(),
            generations: self.generations.clone(),
            active: self.active.clone(),
        }
    }
}

impl<S: PageStore> IndexBuilder<S> {
    /// Create a builder writing into `store`.
    pub fn new(store: Arc<S>, config: IndexConfig) -> Self {
        Self {
            store,
            config,
            excluded_dirs: Vec::new(),
            generations: GenerationCounter::default(),
            active: ActiveRebuilds::default(),
        }
    }

    /// Directory names skipped while crawling.
    #[must_use]
    pub fn with_excluded_dirs(mut self, excluded_dirs: Vec<String>) -> Self {
        self.excluded_dirs = excluded_dirs;
        self
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Builder settings.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Whether any rebuild is running.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.active.in_progress()
    }

    /// Stop every running rebuild at its next checkpoint.
    pub fn cancel(&self) {
        log::info!("page index rebuild cancelled");
        self.generations.cancel();
    }

    fn summary_limits(&self) -> SummaryLimits {
        SummaryLimits {
            char_cap: self.config.summary_char_cap,
            max_lines: self.config.summary_max_lines,
        }
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        name.starts_with('.')
            || self
                .excluded_dirs
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }

    /// Write `record` only while `generation` is still current.
    ///
    /// Returns `Ok(false)` when the write was skipped because the rebuild
    /// was superseded.
    fn guarded_upsert(
        &self,
        generation: &Generation,
        record: PageRecord,
    ) -> Result<bool, OutlineError> {
        if !generation.is_current() {
            return Ok(false);
        }
        self.store.upsert(record)?;
        Ok(true)
    }
}

fn report(progress: ProgressFn<'_>, snapshot: RebuildProgress) {
    if let Some(callback) = progress {
        callback(snapshot);
    }
}
