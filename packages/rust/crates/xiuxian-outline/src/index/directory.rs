use log::{debug, info, warn};
use std::collections::{HashMap, HashSet, VecDeque};

use super::summary::{PageSummary, summarize_text};
use super::{
    Generation, IndexBuilder, ProgressFn, RebuildOutcome, RebuildProgress, RebuildStats, report,
};
use crate::error::OutlineError;
use crate::fs::{DirEntry, DirectoryAccess, EntryKind, decode_text};
use crate::models::PageRecord;
use crate::resolver::{decode_page_name, parse_journal_date, split_outline_file_name};
use crate::session::{GraphSession, JOURNALS_DIR_NAME};
use crate::store::PageStore;

struct PendingDir<H> {
    dir: H,
    prefix: String,
    journal: bool,
}

struct Crawl<'a> {
    graph_id: &'a str,
    previous: HashMap<String, PageRecord>,
    seen: HashSet<String>,
    written: HashSet<String>,
    stats: RebuildStats,
    processed: usize,
}

fn page_name_for(prefix: &str, base: &str) -> String {
    let decoded = decode_page_name(base);
    if prefix.is_empty() {
        decoded
    } else {
        format!("{prefix}/{decoded}")
    }
}

impl<S: PageStore> IndexBuilder<S> {
    /// Rebuild the graph of `session` from its directories.
    ///
    /// Crawls the pages root (its `journals` subdirectory included) and the
    /// optional sibling journals root, upserting every page it finds. The
    /// first file to decode to a given page name wins. Archived/favorite
    /// flags of surviving names carry over, and files whose `last_modified`
    /// did not change keep their previous summary without being read. Once
    /// the crawl completes, records for names no file produced are removed.
    ///
    /// # Errors
    ///
    /// Fails without touching the store when the pages root cannot be
    /// listed, or when the store itself fails.
    pub async fn rebuild_directory<D: DirectoryAccess>(
        &self,
        session: &GraphSession<D>,
        progress: ProgressFn<'_>,
    ) -> Result<RebuildOutcome, OutlineError> {
        let _active = self.active.enter();
        let generation = self.generations.begin();
        let graph_id = session.graph_id();
        let access = session.access();
        info!(
            "page index rebuild #{} started for graph {graph_id}",
            generation.id()
        );

        let previous: HashMap<String, PageRecord> = self
            .store
            .list_graph(graph_id)?
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        let root_entries = access.list_entries(session.pages_root()).await?;
        if !generation.is_current() {
            debug!("page index rebuild #{} superseded", generation.id());
            return Ok(RebuildOutcome::Superseded);
        }

        let mut crawl = Crawl {
            graph_id,
            previous,
            seen: HashSet::new(),
            written: HashSet::new(),
            stats: RebuildStats::default(),
            processed: 0,
        };
        let mut queue: VecDeque<PendingDir<D::Dir>> = VecDeque::new();
        let mut listing = Some((
            PendingDir {
                dir: session.pages_root().clone(),
                prefix: String::new(),
                journal: false,
            },
            root_entries,
        ));
        if let Some(journals_root) = session.journals_root() {
            queue.push_back(PendingDir {
                dir: journals_root.clone(),
                prefix: String::new(),
                journal: true,
            });
        }

        loop {
            let (pending, entries) = match listing.take() {
                Some(current) => current,
                None => {
                    let Some(next) = queue.pop_front() else {
                        break;
                    };
                    let entries = match access.list_entries(&next.dir).await {
                        Ok(entries) => entries,
                        Err(err) => {
                            warn!("skipping unlistable directory {:?}: {err}", next.dir);
                            continue;
                        }
                    };
                    if !generation.is_current() {
                        debug!("page index rebuild #{} superseded", generation.id());
                        return Ok(RebuildOutcome::Superseded);
                    }
                    (next, entries)
                }
            };

            for entry in entries {
                match entry.kind {
                    EntryKind::Directory => {
                        if let Some(child) = self.child_dir(session, &pending, &entry).await {
                            queue.push_back(child);
                        }
                    }
                    EntryKind::File => {
                        let keep_going = self
                            .index_file(session, &generation, &mut crawl, &pending, &entry.name)
                            .await?;
                        if !keep_going {
                            debug!("page index rebuild #{} superseded", generation.id());
                            return Ok(RebuildOutcome::Superseded);
                        }
                        report(
                            progress,
                            RebuildProgress {
                                indexed: crawl.stats.pages_indexed,
                                processed: crawl.processed,
                                total: None,
                            },
                        );
                    }
                }
            }
        }

        if !self.remove_unseen(&generation, &mut crawl)? {
            debug!("page index rebuild #{} superseded", generation.id());
            return Ok(RebuildOutcome::Superseded);
        }
        info!(
            "page index rebuild #{} finished: {} pages ({} read, {} reused, {} removed)",
            generation.id(),
            crawl.stats.pages_indexed,
            crawl.stats.files_read,
            crawl.stats.summaries_reused,
            crawl.stats.stale_removed
        );
        Ok(RebuildOutcome::Completed(crawl.stats))
    }

    /// Drop records of the graph that the finished crawl did not produce.
    ///
    /// Runs only after a complete crawl, so an interrupted rebuild never
    /// leaves the graph half empty. `Ok(false)` means superseded.
    fn remove_unseen(
        &self,
        generation: &Generation,
        crawl: &mut Crawl<'_>,
    ) -> Result<bool, OutlineError> {
        for record in self.store.list_graph(crawl.graph_id)? {
            if crawl.written.contains(&record.name) {
                continue;
            }
            if !generation.is_current() {
                return Ok(false);
            }
            if self.store.delete(crawl.graph_id, &record.name)? {
                debug!("removed stale page {:?}", record.name);
                crawl.stats.stale_removed += 1;
            }
        }
        Ok(generation.is_current())
    }

    async fn child_dir<D: DirectoryAccess>(
        &self,
        session: &GraphSession<D>,
        parent: &PendingDir<D::Dir>,
        entry: &DirEntry,
    ) -> Option<PendingDir<D::Dir>> {
        if self.is_excluded_dir(&entry.name) {
            debug!("skipping excluded directory {}", entry.name);
            return None;
        }
        let dir = session
            .access()
            .get_subdirectory(&parent.dir, &entry.name)
            .await?;
        let top_level_journals = parent.prefix.is_empty()
            && !parent.journal
            && entry.name.eq_ignore_ascii_case(JOURNALS_DIR_NAME);
        let (prefix, journal) = if top_level_journals || parent.journal {
            (parent.prefix.clone(), true)
        } else if parent.prefix.is_empty() {
            (entry.name.clone(), false)
        } else {
            (format!("{}/{}", parent.prefix, entry.name), false)
        };
        Some(PendingDir {
            dir,
            prefix,
            journal,
        })
    }

    /// Index one file; `Ok(false)` means the rebuild was superseded.
    async fn index_file<D: DirectoryAccess>(
        &self,
        session: &GraphSession<D>,
        generation: &Generation,
        crawl: &mut Crawl<'_>,
        pending: &PendingDir<D::Dir>,
        file_name: &str,
    ) -> Result<bool, OutlineError> {
        let Some((base, _ext)) = split_outline_file_name(file_name) else {
            return Ok(true);
        };
        crawl.processed += 1;
        let name = page_name_for(&pending.prefix, base);
        if !crawl.seen.insert(name.clone()) {
            debug!("duplicate page name {name:?} from {file_name}; keeping first");
            crawl.stats.duplicates_skipped += 1;
            return Ok(true);
        }

        let access = session.access();
        let info = match access.get_file(&pending.dir, file_name).await {
            Ok(info) => info,
            Err(err) => {
                warn!("skipping unreadable page {file_name}: {err}");
                crawl.stats.unreadable_skipped += 1;
                return Ok(true);
            }
        };

        let previous = crawl.previous.get(&name);
        let summary = match previous {
            Some(prev) if prev.last_modified == info.last_modified => {
                crawl.stats.summaries_reused += 1;
                PageSummary {
                    lines: prev.summary_lines.clone(),
                    image_ref: prev.image_ref.clone(),
                    uuid: prev.uuid.clone(),
                }
            }
            _ if info.size > self.config.max_file_bytes => {
                debug!("page {name:?} exceeds max_file_bytes; indexing without summary");
                PageSummary::default()
            }
            _ => match access.read_file(&pending.dir, file_name).await {
                Ok(bytes) => {
                    crawl.stats.files_read += 1;
                    summarize_text(&decode_text(&bytes), self.summary_limits())
                }
                Err(err) => {
                    warn!(
                        "skipping unreadable page {}: {err}",
                        access.describe(&pending.dir, file_name)
                    );
                    crawl.stats.unreadable_skipped += 1;
                    return Ok(true);
                }
            },
        };

        let mut record = PageRecord::new(crawl.graph_id, name.clone());
        record.uuid = summary.uuid;
        record.last_modified = info.last_modified;
        record.summary_lines = summary.lines;
        record.image_ref = summary.image_ref;
        record.journal = pending.journal || parse_journal_date(&name).is_some();
        if let Some(prev) = previous {
            record.carry_flags_from(prev);
        }
        if !self.guarded_upsert(generation, record)? {
            return Ok(false);
        }
        crawl.written.insert(name);
        crawl.stats.pages_indexed += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::fs::LocalDirectory;
    use crate::models::PageFlag;
    use crate::store::MemoryPageStore;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn builder() -> IndexBuilder<MemoryPageStore> {
        IndexBuilder::new(Arc::new(MemoryPageStore::new()), IndexConfig::default())
            .with_excluded_dirs(vec!["logseq".to_string()])
    }

    #[tokio::test]
    async fn test_crawl_decodes_names_and_classifies_journals() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "pages/area___project.md", "- plan\n");
        write(tmp.path(), "pages/notes.txt", "ignored");
        write(tmp.path(), "pages/journals/2025_01_01.md", "- new year\n");
        write(tmp.path(), "pages/logseq/bak/old.md", "- backup\n");
        write(tmp.path(), "pages/.hidden/secret.md", "- hidden\n");

        let session = GraphSession::new("g", LocalDirectory, tmp.path().join("pages"));
        let builder = builder();
        let outcome = builder.rebuild_directory(&session, None).await.unwrap();
        let stats = outcome.stats().unwrap();
        assert_eq!(stats.pages_indexed, 2);
        assert!(!builder.in_progress());

        let records = builder.store().list_graph("g").unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["2025_01_01", "area/project"]);
        assert!(records[0].journal);
        assert!(!records[1].journal);
        assert_eq!(records[1].summary_lines, vec!["- plan"]);
    }

    #[tokio::test]
    async fn test_rebuild_drops_stale_names_and_carries_flags() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "pages/keep.md", "- keep\n");
        write(tmp.path(), "pages/gone.md", "- gone\n");
        let session = GraphSession::new("g", LocalDirectory, tmp.path().join("pages"));
        let builder = builder();
        builder.rebuild_directory(&session, None).await.unwrap();

        let mut starred = builder.store().get("g", "keep").unwrap().unwrap();
        starred.favorite = true;
        builder.store().upsert(starred).unwrap();
        fs::remove_file(tmp.path().join("pages/gone.md")).unwrap();

        let stats = builder
            .rebuild_directory(&session, None)
            .await
            .unwrap()
            .stats()
            .unwrap();
        assert_eq!(stats.summaries_reused, 1);
        assert_eq!(stats.files_read, 0);
        assert_eq!(stats.stale_removed, 1);
        assert!(builder.store().get("g", "gone").unwrap().is_none());
        let favorites = builder.store().list_flagged("g", PageFlag::Favorite).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].summary_lines, vec!["- keep"]);
    }

    #[tokio::test]
    async fn test_first_decoded_name_wins_and_sibling_journals() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "pages/a%2Fb.md", "- legacy encoding\n");
        write(tmp.path(), "pages/a___b.md", "- current encoding\n");
        write(tmp.path(), "journals/2024_12_31.md", "- eve\n");
        let session = GraphSession::new("g", LocalDirectory, tmp.path().join("pages"))
            .with_journals_root(tmp.path().join("journals"));
        let builder = builder();
        let stats = builder
            .rebuild_directory(&session, None)
            .await
            .unwrap()
            .stats()
            .unwrap();
        assert_eq!(stats.duplicates_skipped, 1);
        let record = builder.store().get("g", "a/b").unwrap().unwrap();
        assert_eq!(record.summary_lines, vec!["- legacy encoding"]);
        assert!(builder.store().get("g", "2024_12_31").unwrap().unwrap().journal);
    }

    #[tokio::test]
    async fn test_missing_root_fails_without_clearing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let builder = builder();
        builder
            .store()
            .upsert(PageRecord::new("g", "survivor"))
            .unwrap();
        let session = GraphSession::new("g", LocalDirectory, tmp.path().join("missing"));
        assert!(builder.rebuild_directory(&session, None).await.is_err());
        assert!(builder.store().get("g", "survivor").unwrap().is_some());
        assert!(!builder.in_progress());
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "pages/a.md", "- a\n");
        write(tmp.path(), "pages/b.org", "* b\n");
        let session = GraphSession::new("g", LocalDirectory, tmp.path().join("pages"));
        let seen = std::sync::Mutex::new(Vec::new());
        let callback = |progress: RebuildProgress| seen.lock().unwrap().push(progress.indexed);
        builder()
            .rebuild_directory(&session, Some(&callback))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
