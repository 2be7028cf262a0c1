//! Per-graph session context: directory handles plus resolver settings.
//!
//! Sessions are explicit values passed to the resolver, the index builder
//! and the hover controller; there is no process-wide handle registry.

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::config::{OutlineConfig, ResolverConfig};
use crate::fs::{DirectoryAccess, LocalDirectory, decode_text};
use crate::models::PageContent;
use crate::parser::parse;
use crate::resolver::{ResolvedFile, build_candidates, resolve};

/// Name of the journals subdirectory under the pages root.
pub const JOURNALS_DIR_NAME: &str = "journals";

/// Directory handles and lookup settings for one graph.
#[derive(Debug, Clone)]
pub struct GraphSession<D: DirectoryAccess> {
    graph_id: String,
    access: D,
    pages_root: D::Dir,
    journals_root: Option<D::Dir>,
    extra_dirs: Vec<D::Dir>,
    resolver: ResolverConfig,
}

/// Text of a resolved page.
#[derive(Debug, Clone)]
pub struct LoadedPage<H> {
    /// Where the text came from.
    pub file: ResolvedFile<H>,
    /// Decoded file text.
    pub text: String,
}

impl<D: DirectoryAccess> GraphSession<D> {
    /// Create a session rooted at `pages_root`.
    pub fn new(graph_id: impl Into<String>, access: D, pages_root: D::Dir) -> Self {
        Self {
            graph_id: graph_id.into(),
            access,
            pages_root,
            journals_root: None,
            extra_dirs: Vec::new(),
            resolver: ResolverConfig::default(),
        }
    }

    /// Add a sibling top-level journals root.
    #[must_use]
    pub fn with_journals_root(mut self, journals_root: D::Dir) -> Self {
        self.journals_root = Some(journals_root);
        self
    }

    /// Add extra lookup directories, searched after the journal roots.
    #[must_use]
    pub fn with_extra_dirs(mut self, extra_dirs: Vec<D::Dir>) -> Self {
        self.extra_dirs = extra_dirs;
        self
    }

    /// Replace resolver settings.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Graph identifier used as the store key prefix.
    #[must_use]
    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// Directory accessor.
    pub fn access(&self) -> &D {
        &self.access
    }

    /// Primary pages directory.
    pub fn pages_root(&self) -> &D::Dir {
        &self.pages_root
    }

    /// Sibling journals root, if configured.
    pub fn journals_root(&self) -> Option<&D::Dir> {
        self.journals_root.as_ref()
    }

    /// Resolver settings.
    #[must_use]
    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    /// Lookup order: pages root, its `journals` subdirectory, the sibling
    /// journals root, then extra directories.
    pub async fn lookup_dirs(&self) -> Vec<D::Dir> {
        let mut dirs = vec![self.pages_root.clone()];
        if let Some(journals) = self
            .access
            .get_subdirectory(&self.pages_root, JOURNALS_DIR_NAME)
            .await
        {
            dirs.push(journals);
        }
        if let Some(journals_root) = &self.journals_root {
            dirs.push(journals_root.clone());
        }
        dirs.extend(self.extra_dirs.iter().cloned());
        dirs
    }

    /// Resolve a page name to its backing file.
    pub async fn resolve_page(&self, name: &str) -> Option<ResolvedFile<D::Dir>> {
        let candidates = build_candidates(name, self.resolver.candidate_options());
        if candidates.is_empty() {
            return None;
        }
        let dirs = self.lookup_dirs().await;
        resolve(
            &self.access,
            &dirs,
            &candidates,
            self.resolver.resolve_options(),
        )
        .await
    }

    /// Resolve and read a page. Unreadable files count as absent.
    pub async fn read_page(&self, name: &str) -> Option<LoadedPage<D::Dir>> {
        let file = self.resolve_page(name).await?;
        match self.access.read_file(&file.dir, &file.file_name).await {
            Ok(bytes) => Some(LoadedPage {
                text: decode_text(&bytes),
                file,
            }),
            Err(err) => {
                warn!(
                    "page {name:?} resolved to {} but could not be read: {err}",
                    self.access.describe(&file.dir, &file.file_name)
                );
                None
            }
        }
    }

    /// Resolve, read and parse a page.
    pub async fn load_page(&self, name: &str) -> PageContent {
        match self.read_page(name).await {
            Some(page) => {
                debug!("loaded page {name:?} from {}", page.file.file_name);
                PageContent::from_blocks(parse(&page.text))
            }
            None => PageContent::NotFound,
        }
    }
}

impl GraphSession<LocalDirectory> {
    /// Local-filesystem session from configuration; relative directories
    /// are resolved against `graph_root`.
    #[must_use]
    pub fn local(graph_id: impl Into<String>, graph_root: &Path, config: &OutlineConfig) -> Self {
        let absolutize = |path: &PathBuf| -> PathBuf {
            if path.is_absolute() {
                path.clone()
            } else {
                graph_root.join(path)
            }
        };
        let mut session = Self::new(
            graph_id,
            LocalDirectory::new(),
            absolutize(&config.graph.pages_dir),
        )
        .with_extra_dirs(config.graph.extra_dirs.iter().map(absolutize).collect())
        .with_resolver(config.resolver);
        if let Some(journals) = &config.graph.journals_dir {
            session = session.with_journals_root(absolutize(journals));
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentNode;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_lookup_order_and_three_load_states() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "pages/Empty Page.md", "---\ntitle: x\n---\n");
        write(tmp.path(), "pages/Full.md", "- body");
        write(tmp.path(), "pages/journals/2025_03_04.md", "- nested journal");
        write(tmp.path(), "journals/2025_03_05.md", "- sibling journal");

        let config = OutlineConfig {
            graph: crate::config::GraphConfig {
                journals_dir: Some(PathBuf::from("journals")),
                ..Default::default()
            },
            ..Default::default()
        };
        let session = GraphSession::local("g", tmp.path(), &config);
        let dirs = session.lookup_dirs().await;
        assert_eq!(
            dirs,
            vec![
                tmp.path().join("pages"),
                tmp.path().join("pages/journals"),
                tmp.path().join("journals"),
            ]
        );

        assert_eq!(session.load_page("Empty Page").await, PageContent::Empty);
        assert_eq!(
            session.load_page("Full").await,
            PageContent::Blocks(vec![ContentNode::leaf("body")])
        );
        assert_eq!(session.load_page("Missing").await, PageContent::NotFound);
        assert_eq!(session.load_page("2025-03-04").await.blocks().len(), 1);
        assert_eq!(
            session.load_page("March 5th, 2025").await,
            PageContent::Blocks(vec![ContentNode::leaf("sibling journal")])
        );
    }
}
