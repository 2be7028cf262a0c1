use std::collections::HashSet;

use super::dates::{journal_file_base, journal_slash_form, parse_journal_date};
use super::encoding::{
    NAMESPACE_SEPARATOR, decode_page_name, encode_page_name, percent_decode_lossless,
};

/// Upper bound on generated candidates; bounds probe cost per lookup.
pub const DEFAULT_MAX_CANDIDATES: usize = 48;

const JOURNALS_PREFIX: &str = "journals/";
const OUTLINE_EXTENSIONS: &[&str] = &[".md", ".markdown", ".org"];

/// Candidate generation knobs.
#[derive(Debug, Clone, Copy)]
pub struct CandidateOptions {
    /// Put journal date forms ahead of generic candidates.
    pub prefer_journal: bool,
    /// Cap on the number of candidates returned.
    pub max_candidates: usize,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            prefer_journal: false,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Ordered, de-duplicated accumulator.
struct CandidateList {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl CandidateList {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "journals" || trimmed == JOURNALS_PREFIX {
            return;
        }
        if self.seen.insert(trimmed.to_string()) {
            self.items.push(trimmed.to_string());
        }
    }

    fn snapshot(&self) -> Vec<String> {
        self.items.clone()
    }
}

/// Strip a trailing `#anchor` / `?query` suffix and a known outline extension.
#[must_use]
pub fn strip_anchor_and_extension(raw: &str) -> String {
    let mut value = raw.trim();
    if let Some((left, _)) = value.split_once('#') {
        value = left;
    }
    if let Some((left, _)) = value.split_once('?') {
        value = left;
    }
    let lower = value.to_ascii_lowercase();
    for ext in OUTLINE_EXTENSIONS {
        if lower.ends_with(ext) {
            return value[..value.len() - ext.len()].to_string();
        }
    }
    value.to_string()
}

fn push_flattening_variants(list: &mut CandidateList) {
    for value in list.snapshot() {
        if value.contains('/') {
            list.push(&value.replace('/', NAMESPACE_SEPARATOR));
        }
        list.push(&encode_page_name(&value));
        if value.contains(NAMESPACE_SEPARATOR) {
            list.push(&value.replace(NAMESPACE_SEPARATOR, "/"));
            list.push(&decode_page_name(&value));
        }
    }
}

fn push_journal_prefix_toggles(list: &mut CandidateList) {
    for value in list.snapshot() {
        match value.strip_prefix(JOURNALS_PREFIX) {
            Some(stripped) => list.push(stripped),
            None => list.push(&format!("{JOURNALS_PREFIX}{value}")),
        }
    }
}

fn date_candidates(names: &[&str]) -> Vec<String> {
    let Some(date) = names.iter().find_map(|name| parse_journal_date(name)) else {
        return Vec::new();
    };
    let underscore = journal_file_base(date);
    let slash = journal_slash_form(date);
    vec![
        underscore.clone(),
        slash.clone(),
        format!("{JOURNALS_PREFIX}{underscore}"),
        format!("{JOURNALS_PREFIX}{slash}"),
    ]
}

/// Build the ordered list of file base names worth probing for `raw_name`.
///
/// Order: literal, anchor/extension-stripped, percent-decoded, namespace
/// flattening in both directions, `journals/` toggled, then journal date
/// forms (moved to the front when `prefer_journal` is set). Deduplicated and
/// capped at `max_candidates`.
#[must_use]
pub fn build_candidates(raw_name: &str, options: CandidateOptions) -> Vec<String> {
    let literal = raw_name.trim();
    if literal.is_empty() {
        return Vec::new();
    }
    let stripped = strip_anchor_and_extension(literal);
    let decoded_literal = percent_decode_lossless(literal);
    let decoded_stripped = percent_decode_lossless(&stripped);

    let mut generic = CandidateList::new();
    generic.push(literal);
    generic.push(&stripped);
    generic.push(&decoded_literal);
    generic.push(&decoded_stripped);
    push_flattening_variants(&mut generic);
    push_journal_prefix_toggles(&mut generic);

    let dates = date_candidates(&[literal, &stripped, &decoded_literal, &decoded_stripped]);

    let mut ordered = CandidateList::new();
    if options.prefer_journal {
        for value in &dates {
            ordered.push(value);
        }
    }
    for value in &generic.items {
        ordered.push(value);
    }
    if !options.prefer_journal {
        for value in &dates {
            ordered.push(value);
        }
    }

    let mut out = ordered.items;
    out.truncate(options.max_candidates.max(1));
    out
}
