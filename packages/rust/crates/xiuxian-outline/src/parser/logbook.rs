use super::tree::{is_fence_line, split_list_marker};

fn drawer_token(line: &str) -> &str {
    let trimmed = line.trim();
    split_list_marker(trimmed).map_or(trimmed, |(_, rest)| rest.trim())
}

/// Whether `line` opens a `:LOGBOOK:` drawer (optionally behind a bullet).
#[must_use]
pub fn is_logbook_start(line: &str) -> bool {
    drawer_token(line).eq_ignore_ascii_case(":LOGBOOK:")
}

/// Whether `line` closes a drawer.
#[must_use]
pub fn is_drawer_end(line: &str) -> bool {
    drawer_token(line).eq_ignore_ascii_case(":END:")
}

/// Drop every `:LOGBOOK:` .. `:END:` range (inclusive), at any depth.
///
/// An unterminated drawer only loses its opening line. Lines inside fenced
/// code are kept verbatim.
#[must_use]
pub fn strip_logbook_ranges<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(lines.len());
    let mut in_fence = false;
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        if is_fence_line(line) {
            in_fence = !in_fence;
        } else if !in_fence && is_logbook_start(line) {
            let end = lines[idx + 1..]
                .iter()
                .position(|candidate| is_drawer_end(candidate));
            idx = match end {
                Some(offset) => idx + offset + 2,
                None => idx + 1,
            };
            continue;
        }
        out.push(line);
        idx += 1;
    }
    out
}
