use regex::Regex;
use std::sync::LazyLock;

use crate::compile_regex;
use crate::models::ContentNode;
use crate::parser::{page_uuid, split_front_matter, strip_logbook_ranges};
use crate::render::property_key;

static IMAGE_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"(?i)!\[[^\]]*\]\((?P<md>[^)\s]+)[^)]*\)|\[\[(?:file:)?(?P<org>[^\[\]]+\.(?:png|jpe?g|gif|webp|svg|bmp))\]\]",
    )
});

/// Limits applied to extracted summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    /// Characters kept per line; longer lines are cut, possibly mid-word.
    pub char_cap: usize,
    /// Lines kept per page.
    pub max_lines: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            char_cap: 100,
            max_lines: 8,
        }
    }
}

/// Summary pieces derived from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Summary lines.
    pub lines: Vec<String>,
    /// First image reference, or empty.
    pub image_ref: String,
    /// Page uuid declared in the document, or empty.
    pub uuid: String,
}

fn cap_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

fn is_skipped_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed == "---" || property_key(trimmed).is_some()
}

/// First image target in `text` (markdown `![..](..)` or org `[[file:..]]`).
#[must_use]
pub fn first_image_ref(text: &str) -> Option<String> {
    IMAGE_REF_REGEX.captures(text).and_then(|caps| {
        caps.name("md")
            .or_else(|| caps.name("org"))
            .map(|target| target.as_str().to_string())
    })
}

/// Line-for-line summary of raw file text: front matter, property lines
/// and logbook drawers are skipped, each line is capped.
#[must_use]
pub fn summarize_text(text: &str, limits: SummaryLimits) -> PageSummary {
    let (_front, body) = split_front_matter(text);
    let lines: Vec<&str> = body.lines().collect();
    let summary = strip_logbook_ranges(&lines)
        .into_iter()
        .filter(|line| !is_skipped_line(line))
        .take(limits.max_lines)
        .map(|line| cap_chars(line.trim_end(), limits.char_cap))
        .collect();
    PageSummary {
        lines: summary,
        image_ref: first_image_ref(body).unwrap_or_default(),
        uuid: page_uuid(text).unwrap_or_default(),
    }
}

fn is_hidden_tree_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed == "---" {
        return true;
    }
    property_key(trimmed).is_some_and(|key| {
        key.eq_ignore_ascii_case("id") || key.eq_ignore_ascii_case("collapsed")
    })
}

fn collect_tree_summary(
    nodes: &[ContentNode],
    depth: usize,
    limits: SummaryLimits,
    out: &mut Vec<String>,
) {
    for node in nodes {
        if out.len() >= limits.max_lines {
            return;
        }
        let first = node.first_line().trim();
        if !first.is_empty() && !is_hidden_tree_line(first) {
            let capped = cap_chars(first, limits.char_cap);
            if depth == 0 {
                out.push(capped);
            } else {
                out.push(format!("{}> {capped}", "  ".repeat(depth - 1)));
            }
        }
        collect_tree_summary(&node.children, depth + 1, limits, out);
    }
}

/// Summary of a block tree: the capped first line of each block, depth
/// prefixed past the top level.
#[must_use]
pub fn summarize_tree(nodes: &[ContentNode], limits: SummaryLimits) -> Vec<String> {
    let mut out = Vec::new();
    collect_tree_summary(nodes, 0, limits, &mut out);
    out
}

/// First image reference anywhere in a block tree (pre-order).
#[must_use]
pub fn first_tree_image(nodes: &[ContentNode]) -> Option<String> {
    nodes.iter().find_map(|node| {
        first_image_ref(&node.text).or_else(|| first_tree_image(&node.children))
    })
}
