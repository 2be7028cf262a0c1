use log::debug;

use super::summary::{SummaryLimits, summarize_text};
use crate::error::OutlineError;
use crate::fs::DirectoryAccess;
use crate::models::PageRecord;
use crate::resolver::{decode_page_name, parse_journal_date, split_outline_file_name};
use crate::session::GraphSession;
use crate::store::PageStore;

/// Result of [`upsert_on_open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazyUpsert {
    /// The graph already had a record for the page.
    AlreadyIndexed(PageRecord),
    /// A record was created.
    Indexed(PageRecord),
    /// The page could not be resolved or read.
    NotFound,
}

/// Index a page on open when the graph has no record for it yet.
///
/// # Errors
///
/// Only store failures are errors.
pub async fn upsert_on_open<D: DirectoryAccess, S: PageStore + ?Sized>(
    store: &S,
    session: &GraphSession<D>,
    page_name: &str,
    limits: SummaryLimits,
) -> Result<LazyUpsert, OutlineError> {
    let graph_id = session.graph_id();
    if let Some(existing) = store.get(graph_id, page_name.trim())? {
        return Ok(LazyUpsert::AlreadyIndexed(existing));
    }
    let Some(page) = session.read_page(page_name).await else {
        return Ok(LazyUpsert::NotFound);
    };
    let base = split_outline_file_name(&page.file.file_name)
        .map_or(page.file.file_name.as_str(), |(base, _ext)| base);
    let canonical = decode_page_name(base);
    if let Some(existing) = store.get(graph_id, &canonical)? {
        return Ok(LazyUpsert::AlreadyIndexed(existing));
    }

    let summary = summarize_text(&page.text, limits);
    let mut record = PageRecord::new(graph_id, canonical.as_str());
    record.uuid = summary.uuid;
    record.last_modified = page.file.info.last_modified;
    record.summary_lines = summary.lines;
    record.image_ref = summary.image_ref;
    record.journal = page.file.picked_name.starts_with("journals/")
        || parse_journal_date(&canonical).is_some();
    store.upsert(record.clone())?;
    debug!("lazily indexed page {canonical:?} in graph {graph_id}");
    Ok(LazyUpsert::Indexed(record))
}
