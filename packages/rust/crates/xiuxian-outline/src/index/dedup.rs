use std::collections::{HashMap, HashSet};

use crate::models::PageRecord;

/// Display listing split into journal and non-journal buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageListing {
    /// Non-journal pages, ordered by name.
    pub pages: Vec<PageRecord>,
    /// Journal pages, newest date first.
    pub journals: Vec<PageRecord>,
}

/// Keep only the most recently modified record per non-empty uuid.
fn latest_per_uuid(records: Vec<PageRecord>) -> Vec<PageRecord> {
    let mut winners: HashMap<String, usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        if record.uuid.is_empty() {
            continue;
        }
        winners
            .entry(record.uuid.clone())
            .and_modify(|best| {
                if record.last_modified > records[*best].last_modified {
                    *best = idx;
                }
            })
            .or_insert(idx);
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| {
            record.uuid.is_empty() || winners.get(&record.uuid) == Some(idx)
        })
        .map(|(_, record)| record)
        .collect()
}

/// Build the browsing listing for one graph.
///
/// Within each bucket, records sharing a uuid collapse to the one with the
/// greatest `last_modified`. A non-journal record whose uuid also appears
/// among the journals is dropped.
#[must_use]
pub fn build_listing(records: Vec<PageRecord>) -> PageListing {
    let (journals, pages): (Vec<PageRecord>, Vec<PageRecord>) =
        records.into_iter().partition(|record| record.journal);
    let mut journals = latest_per_uuid(journals);
    let journal_uuids: HashSet<String> = journals
        .iter()
        .filter(|record| !record.uuid.is_empty())
        .map(|record| record.uuid.clone())
        .collect();
    let mut pages: Vec<PageRecord> = latest_per_uuid(pages)
        .into_iter()
        .filter(|record| record.uuid.is_empty() || !journal_uuids.contains(&record.uuid))
        .collect();

    pages.sort_by(|left, right| left.name.cmp(&right.name));
    journals.sort_by(|left, right| right.name.cmp(&left.name));
    PageListing { pages, journals }
}
