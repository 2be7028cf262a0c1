use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::inline::link_display_text;
use super::options::FilterOptions;
use super::walk::{LineContent, RenderedLine, walk};
use crate::compile_regex;
use crate::models::ContentNode;

static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"^#{1,6}\s+"));
static EMPHASIS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"\*\*(.+?)\*\*|__(.+?)__|~~(.+?)~~|==(.+?)==|\^\^(.+?)\^\^|`([^`]+)`")
});
static ITALIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?:^|(?P<pre>\s))\*(?P<body>[^*\s][^*]*?)\*"));
static IMAGE_ONLY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^!\[(?P<alt>[^\]]*)\]\([^)]*\)$"));

/// Linearized output flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// `indent + "- " + content` for every visible line.
    Outline,
    /// Markup-free narrative text.
    Plain,
    /// First line per block with links resolved to display text.
    Summary,
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "outline" => Ok(Self::Outline),
            "plain" => Ok(Self::Plain),
            "summary" => Ok(Self::Summary),
            other => Err(format!("unknown render mode: {other}")),
        }
    }
}

fn placeholder(id: &str, embed: bool) -> String {
    if embed {
        format!("[embed] {id}")
    } else {
        format!("[ref] {id}")
    }
}

fn outline_line(line: &RenderedLine, text: &str) -> String {
    format!("{}- {}", "  ".repeat(line.depth), text)
}

/// Strip heading and emphasis markup, keeping the inner text.
#[must_use]
pub fn strip_markup(line: &str) -> String {
    let without_heading = HEADING_REGEX.replace(line, "");
    let without_emphasis = EMPHASIS_REGEX.replace_all(&without_heading, |caps: &regex::Captures<'_>| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map_or_else(String::new, |inner| inner.as_str().to_string())
    });
    ITALIC_REGEX
        .replace_all(&without_emphasis, "${pre}${body}")
        .into_owned()
}

fn plain_line(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(caps) = IMAGE_ONLY_REGEX.captures(trimmed) {
        let alt = caps.name("alt").map_or("", |alt| alt.as_str()).trim();
        return (!alt.is_empty()).then(|| alt.to_string());
    }
    Some(strip_markup(&link_display_text(text)))
}

/// Flattened outline text.
#[must_use]
pub fn render_outline(nodes: &[ContentNode], options: &FilterOptions) -> Vec<String> {
    walk(nodes, options, 0)
        .map(|line| match &line.content {
            LineContent::Text(text) => outline_line(&line, text),
            LineContent::Reference { id, embed } => outline_line(&line, &placeholder(id, *embed)),
        })
        .collect()
}

/// Plain narrative text.
#[must_use]
pub fn render_plain(nodes: &[ContentNode], options: &FilterOptions) -> Vec<String> {
    walk(nodes, options, 0)
        .filter_map(|line| match &line.content {
            LineContent::Text(text) => plain_line(text),
            LineContent::Reference { id, .. } => Some(format!("[ref] {id}")),
        })
        .collect()
}

/// Outline summary: first line per block, links resolved to display text.
#[must_use]
pub fn render_summary(nodes: &[ContentNode], options: &FilterOptions) -> Vec<String> {
    walk(nodes, options, 0)
        .first_lines_only()
        .map(|line| match &line.content {
            LineContent::Text(text) => outline_line(&line, &link_display_text(text)),
            LineContent::Reference { id, embed } => outline_line(&line, &placeholder(id, *embed)),
        })
        .collect()
}

/// Render `nodes` in `mode`, one string per output line.
#[must_use]
pub fn render_lines(nodes: &[ContentNode], options: &FilterOptions, mode: RenderMode) -> Vec<String> {
    match mode {
        RenderMode::Outline => render_outline(nodes, options),
        RenderMode::Plain => render_plain(nodes, options),
        RenderMode::Summary => render_summary(nodes, options),
    }
}

/// Render `nodes` in `mode` as one newline-joined string.
#[must_use]
pub fn render(nodes: &[ContentNode], options: &FilterOptions, mode: RenderMode) -> String {
    render_lines(nodes, options, mode).join("\n")
}
