use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::summary::{first_tree_image, summarize_tree};
use super::{IndexBuilder, ProgressFn, RebuildOutcome, RebuildProgress, RebuildStats, report};
use crate::error::OutlineError;
use crate::fs::DirectoryAccess;
use crate::models::{ContentNode, PageRecord};
use crate::session::GraphSession;
use crate::store::PageStore;

/// One page as reported by an outliner API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlinerPage {
    /// Page name.
    pub name: String,
    /// Page uuid.
    pub uuid: String,
    /// API-reported modification time, unix milliseconds.
    pub updated_at: i64,
    /// Whether the API classifies the page as a journal.
    pub journal: bool,
}

/// Alternate metadata source (e.g. a live outliner).
#[async_trait]
pub trait OutlinerSource: Send + Sync {
    /// Flat page listing; `None` when the host is unavailable.
    async fn list_pages_basic(&self) -> Option<Vec<OutlinerPage>>;

    /// Block tree of a page by uuid or name.
    async fn get_page_tree(&self, id_or_name: &str) -> Option<Vec<ContentNode>>;
}

/// Cross-check of page modification times against backing files.
#[async_trait]
pub trait MtimeProbe: Send + Sync {
    /// Modification time of the file backing `page_name`, if resolvable.
    async fn page_mtime(&self, page_name: &str) -> Option<i64>;
}

#[async_trait]
impl<D: DirectoryAccess> MtimeProbe for GraphSession<D> {
    async fn page_mtime(&self, page_name: &str) -> Option<i64> {
        self.resolve_page(page_name)
            .await
            .map(|file| file.info.last_modified)
    }
}

impl<S: PageStore> IndexBuilder<S> {
    /// Index pages reported by an outliner source, in batches.
    ///
    /// Names are de-duplicated (first wins). With a `crosscheck`, a page is
    /// skipped when its file mtime is not newer than the stored record;
    /// without one the API timestamp is accepted. Pages whose tree yields no
    /// summary are not written. Between batches the builder sleeps for
    /// `batch_sleep_ms`.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; an unavailable source indexes
    /// nothing.
    pub async fn rebuild_outliner(
        &self,
        graph_id: &str,
        source: &dyn OutlinerSource,
        crosscheck: Option<&dyn MtimeProbe>,
        progress: ProgressFn<'_>,
    ) -> Result<RebuildOutcome, OutlineError> {
        let _active = self.active.enter();
        let generation = self.generations.begin();
        info!(
            "outliner index rebuild #{} started for graph {graph_id}",
            generation.id()
        );

        let listing = match source.list_pages_basic().await {
            Some(pages) => pages,
            None => {
                info!("outliner source unavailable; no records indexed");
                Vec::new()
            }
        };
        if !generation.is_current() {
            return Ok(RebuildOutcome::Superseded);
        }

        let mut stats = RebuildStats::default();
        let mut seen = HashSet::new();
        let pages: Vec<OutlinerPage> = listing
            .into_iter()
            .filter(|page| {
                let name = page.name.trim();
                if name.is_empty() {
                    return false;
                }
                if seen.insert(name.to_string()) {
                    true
                } else {
                    stats.duplicates_skipped += 1;
                    false
                }
            })
            .collect();
        let total = pages.len();
        let batch_size = self.config.batch_size.max(1);
        let limits = self.summary_limits();
        let mut processed = 0;

        for (batch_idx, batch) in pages.chunks(batch_size).enumerate() {
            if batch_idx > 0 {
                tokio::time::sleep(self.config.batch_sleep()).await;
                if !generation.is_current() {
                    debug!("outliner index rebuild #{} superseded", generation.id());
                    return Ok(RebuildOutcome::Superseded);
                }
            }
            for page in batch {
                processed += 1;
                let name = page.name.trim();
                let existing = self.store.get(graph_id, name)?;

                let last_modified = match crosscheck {
                    Some(probe) => {
                        let mtime = probe.page_mtime(name).await.unwrap_or(page.updated_at);
                        if existing
                            .as_ref()
                            .is_some_and(|known| mtime <= known.last_modified)
                        {
                            stats.unchanged_skipped += 1;
                            continue;
                        }
                        mtime
                    }
                    None => page.updated_at,
                };

                let lookup = if page.uuid.trim().is_empty() {
                    name
                } else {
                    page.uuid.trim()
                };
                let Some(tree) = source.get_page_tree(lookup).await else {
                    debug!("outliner has no tree for {name:?}");
                    continue;
                };
                let summary = summarize_tree(&tree, limits);
                if summary.is_empty() {
                    continue;
                }

                let mut record = PageRecord::new(graph_id, name);
                record.uuid = page.uuid.trim().to_string();
                record.last_modified = last_modified;
                record.summary_lines = summary;
                record.image_ref = first_tree_image(&tree).unwrap_or_default();
                record.journal = page.journal;
                if let Some(known) = &existing {
                    record.carry_flags_from(known);
                }
                if !self.guarded_upsert(&generation, record)? {
                    debug!("outliner index rebuild #{} superseded", generation.id());
                    return Ok(RebuildOutcome::Superseded);
                }
                stats.pages_indexed += 1;
                report(
                    progress,
                    RebuildProgress {
                        indexed: stats.pages_indexed,
                        processed,
                        total: Some(total),
                    },
                );
            }
            if !generation.is_current() {
                debug!("outliner index rebuild #{} superseded", generation.id());
                return Ok(RebuildOutcome::Superseded);
            }
        }

        info!(
            "outliner index rebuild #{} finished: {} of {total} pages indexed",
            generation.id(),
            stats.pages_indexed
        );
        Ok(RebuildOutcome::Completed(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::store::MemoryPageStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeOutliner {
        pages: Option<Vec<OutlinerPage>>,
        trees: HashMap<String, Vec<ContentNode>>,
        tree_calls: AtomicUsize,
    }

    #[async_trait]
    impl OutlinerSource for FakeOutliner {
        async fn list_pages_basic(&self) -> Option<Vec<OutlinerPage>> {
            self.pages.clone()
        }

        async fn get_page_tree(&self, id_or_name: &str) -> Option<Vec<ContentNode>> {
            self.tree_calls.fetch_add(1, Ordering::SeqCst);
            self.trees.get(id_or_name).cloned()
        }
    }

    struct FixedMtime(i64);

    #[async_trait]
    impl MtimeProbe for FixedMtime {
        async fn page_mtime(&self, _page_name: &str) -> Option<i64> {
            Some(self.0)
        }
    }

    fn page(name: &str, uuid: &str, updated_at: i64) -> OutlinerPage {
        OutlinerPage {
            name: name.to_string(),
            uuid: uuid.to_string(),
            updated_at,
            journal: false,
        }
    }

    fn builder(batch_size: usize) -> IndexBuilder<MemoryPageStore> {
        let config = IndexConfig {
            batch_size,
            batch_sleep_ms: 300,
            ..IndexConfig::default()
        };
        IndexBuilder::new(Arc::new(MemoryPageStore::new()), config)
    }

    fn source() -> FakeOutliner {
        FakeOutliner {
            pages: Some(vec![
                page("Alpha", "u-1", 10),
                page("Alpha", "u-dup", 11),
                page("Beta", "", 20),
                page("Empty", "u-3", 30),
            ]),
            trees: HashMap::from([
                (
                    "u-1".to_string(),
                    vec![ContentNode::with_children(
                        "alpha root",
                        vec![ContentNode::leaf("![x](../assets/a.png)")],
                    )],
                ),
                ("Beta".to_string(), vec![ContentNode::leaf("beta")]),
                ("u-3".to_string(), vec![ContentNode::leaf("id:: u-3")]),
            ]),
            tree_calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_outliner_rebuild_dedupes_and_skips_empty_summaries() {
        let builder = builder(2);
        let source = source();
        let started = tokio::time::Instant::now();
        let stats = builder
            .rebuild_outliner("g", &source, None, None)
            .await
            .unwrap()
            .stats()
            .unwrap();
        assert_eq!(stats.pages_indexed, 2);
        assert_eq!(stats.duplicates_skipped, 1);
        assert!(started.elapsed() >= std::time::Duration::from_millis(300));

        let alpha = builder.store().get("g", "Alpha").unwrap().unwrap();
        assert_eq!(alpha.uuid, "u-1");
        assert_eq!(alpha.summary_lines, vec!["alpha root", "> ![x](../assets/a.png)"]);
        assert_eq!(alpha.image_ref, "../assets/a.png");
        assert!(builder.store().get("g", "Empty").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_source_indexes_nothing() {
        let builder = builder(100);
        let source = FakeOutliner::default();
        let outcome = builder
            .rebuild_outliner("g", &source, None, None)
            .await
            .unwrap();
        assert_eq!(outcome.stats().unwrap().pages_indexed, 0);
        assert!(builder.store().list_graph("g").unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crosscheck_skips_records_that_are_not_newer() {
        let builder = builder(100);
        let mut known = PageRecord::new("g", "Beta");
        known.last_modified = 500;
        known.archived = true;
        builder.store().upsert(known).unwrap();

        let source = source();
        let stale = FixedMtime(500);
        let stats = builder
            .rebuild_outliner("g", &source, Some(&stale), None)
            .await
            .unwrap()
            .stats()
            .unwrap();
        assert_eq!(stats.unchanged_skipped, 1);

        let fresh = FixedMtime(900);
        builder
            .rebuild_outliner("g", &source, Some(&fresh), None)
            .await
            .unwrap();
        let beta = builder.store().get("g", "Beta").unwrap().unwrap();
        assert_eq!(beta.last_modified, 900);
        assert!(beta.archived);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_batches_supersedes() {
        let builder = builder(1);
        let source = source();
        let canceller = builder.clone();
        let (outcome, ()) = tokio::join!(
            builder.rebuild_outliner("g", &source, None, None),
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                canceller.cancel();
            }
        );
        assert_eq!(outcome.unwrap(), RebuildOutcome::Superseded);
        assert_eq!(builder.store().list_graph("g").unwrap().len(), 1);
        assert!(!builder.in_progress());
    }
}
