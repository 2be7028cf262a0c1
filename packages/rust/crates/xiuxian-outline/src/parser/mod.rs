//! Outline text -> block tree.
//!
//! Pipeline: front matter strip, `:LOGBOOK:` range removal, then an
//! indentation-driven tree build. Every function here is total.

mod frontmatter;
mod logbook;
mod tree;

use serde_yaml::Value;

use crate::models::ContentNode;

pub use self::frontmatter::{parse_front_matter, split_front_matter};
pub use self::logbook::{is_drawer_end, is_logbook_start, strip_logbook_ranges};
pub use self::tree::{build_tree, split_list_marker};

pub(crate) use self::tree::is_fence_line;

/// Parse raw outline text into top-level blocks.
///
/// Empty or whitespace-only input yields an empty list.
#[must_use]
pub fn parse(raw: &str) -> Vec<ContentNode> {
    let (_front, body) = split_front_matter(raw);
    let lines: Vec<&str> = body.lines().collect();
    let visible = strip_logbook_ranges(&lines);
    build_tree(&visible)
}

/// Page uuid declared by the document itself.
///
/// Looks at an `id:` key in front matter first, then at an `id:: <uuid>`
/// property line that appears before the first bullet.
#[must_use]
pub fn page_uuid(raw: &str) -> Option<String> {
    let (front, body) = parse_front_matter(raw);
    if let Some(id) = front
        .as_ref()
        .and_then(|value| value.get("id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        return Some(id.to_string());
    }
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if split_list_marker(trimmed).is_some() {
            return None;
        }
        let Some((key, value)) = trimmed.split_once("::") else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("id") {
            let value = value.trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
    }
    None
}
