//! xiuxian-outline - Outline graph browser core.
//!
//! Module layout (by domain):
//! - `resolver`: page name to file candidates and directory probing
//! - `parser`: outline text to block trees (front matter, LOGBOOK, indent)
//! - `render`: rule pipeline and outline/plain/summary output
//! - `index`: directory and outliner rebuilds with generation tokens
//! - `hover`: delayed hover previews with a bounded fetch cache
//! - `store` / `session` / `fs`: collaborators the core reads and writes
//!
//! # Examples
//!
//! ```rust
//! use xiuxian_outline::{FilterOptions, RenderMode, parse, render};
//!
//! let blocks = parse("- TODO write report\n  - id:: 64f0\n  - details");
//! let options = FilterOptions {
//!     normalize_tasks: true,
//!     ..FilterOptions::default()
//! };
//! let text = render(&blocks, &options, RenderMode::Outline);
//! assert_eq!(text, "- [ ] write report\n  - details");
//! ```

use regex::Regex;

// ---------------------------------------------------------------------------
// Core domain modules
// ---------------------------------------------------------------------------
pub mod hover;
pub mod index;
pub mod parser;
pub mod render;
pub mod resolver;

// ---------------------------------------------------------------------------
// Collaborators and ambient modules
// ---------------------------------------------------------------------------
pub mod config;
pub mod error;
pub mod fs;
pub mod models;
pub mod session;
pub mod store;

pub use config::{GraphConfig, HoverConfig, IndexConfig, OutlineConfig, ResolverConfig};
pub use error::OutlineError;
pub use fs::{DirEntry, DirectoryAccess, EntryKind, FileInfo, LocalDirectory};
pub use hover::{HoverAnchor, HoverPhase, HoverPreview, PreviewCache, PreviewLoader};
pub use index::{
    IndexBuilder, LazyUpsert, MtimeProbe, OutlinerPage, OutlinerSource, PageListing,
    RebuildOutcome, RebuildProgress, RebuildStats, build_listing, upsert_on_open,
};
pub use models::{ContentNode, PageContent, PageFlag, PageRecord};
pub use parser::{page_uuid, parse};
pub use render::{FilterOptions, RefPolicy, RenderMode, render, walk};
pub use resolver::{
    CandidateOptions, ResolvedFile, build_candidates, decode_page_name, encode_page_name, resolve,
};
pub use session::GraphSession;
pub use store::{JsonPageStore, MemoryPageStore, PageStore};

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}
