//! Inline link segmentation and link activation.

use regex::Regex;
use std::sync::LazyLock;

use super::options::FilterOptions;
use crate::compile_regex;
use crate::resolver::{canonical_journal_name, percent_decode_lossless, strip_anchor_and_extension};

static INLINE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"!\[(?P<alt>[^\]]*)\]\((?P<src>[^)\s]+)(?:\s+[^)]*)?\)|\[\[(?P<page>[^\[\]]+)\]\]|\[(?P<label>[^\[\]]+)\]\((?P<href>[^)\s]+)\)|\(\((?P<block>[^()\s]+)\)\)",
    )
});

const EXTERNAL_SCHEMES: &[&str] = &[
    "http://", "https://", "mailto:", "tel:", "ftp://", "file://", "data:",
];
const ASSET_DIR_MARKERS: &[&str] = &["../assets/", "./assets/", "assets/", "/assets/"];

/// Maps an asset-relative path to a displayable resource locator.
pub trait AssetResolver {
    /// Locator for `relative` (e.g. `../assets/pic.png`), or `None`.
    fn resolve_asset(&self, relative: &str) -> Option<String>;
}

/// Receives canonical page names when an internal link is activated.
pub trait Navigator {
    /// Open `page_name`.
    fn open_page(&self, page_name: &str);
}

/// Resolver that refuses every asset; images degrade to their alt text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetResolver for NoAssets {
    fn resolve_asset(&self, _relative: &str) -> Option<String> {
        None
    }
}

/// One piece of a rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSegment {
    /// Literal text.
    Text(String),
    /// Internal page link; `target` is already canonical.
    PageLink {
        /// Page name handed to the navigator.
        target: String,
        /// Visible label.
        label: String,
    },
    /// Link that opens outside the browser.
    ExternalLink {
        /// Destination URL.
        url: String,
        /// Visible label.
        label: String,
    },
    /// Displayable image.
    Image {
        /// Resolved locator.
        src: String,
        /// Alt text.
        alt: String,
    },
    /// Non-image asset (PDF) offered as a download.
    Download {
        /// Resolved locator.
        href: String,
        /// Caption used as the label.
        label: String,
    },
    /// Inline `((uuid))` block reference.
    BlockRef(String),
}

/// What activating a segment should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// The navigator was invoked with this page name.
    Navigated(String),
    /// The host should open this URL externally.
    OpenExternal(String),
    /// Not a link.
    Ignored,
}

fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    EXTERNAL_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

fn is_asset_path(target: &str) -> bool {
    ASSET_DIR_MARKERS
        .iter()
        .any(|marker| target.starts_with(marker))
}

/// Canonical page name for a link target: journal dates map to their
/// `YYYY_MM_DD` page, everything else is decoded and stripped of anchors.
#[must_use]
pub fn canonical_link_target(raw: &str) -> String {
    let stripped = strip_anchor_and_extension(raw);
    let decoded = percent_decode_lossless(&stripped);
    canonical_journal_name(&decoded).unwrap_or(decoded)
}

fn image_segment(alt: &str, src: &str, assets: &dyn AssetResolver) -> InlineSegment {
    if is_external(src) {
        return InlineSegment::Image {
            src: src.to_string(),
            alt: alt.to_string(),
        };
    }
    if !is_asset_path(src) {
        return InlineSegment::Text(alt.to_string());
    }
    let Some(locator) = assets.resolve_asset(src) else {
        return InlineSegment::Text(alt.to_string());
    };
    if src.to_ascii_lowercase().ends_with(".pdf") {
        InlineSegment::Download {
            href: locator,
            label: if alt.is_empty() {
                src.rsplit('/').next().unwrap_or(src).to_string()
            } else {
                alt.to_string()
            },
        }
    } else {
        InlineSegment::Image {
            src: locator,
            alt: alt.to_string(),
        }
    }
}

fn push_text(out: &mut Vec<InlineSegment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(InlineSegment::Text(previous)) = out.last_mut() {
        previous.push_str(text);
    } else {
        out.push(InlineSegment::Text(text.to_string()));
    }
}

/// Split a surviving line into inline segments.
#[must_use]
pub fn segment_line(
    line: &str,
    options: &FilterOptions,
    assets: &dyn AssetResolver,
) -> Vec<InlineSegment> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for caps in INLINE_TOKEN_REGEX.captures_iter(line) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_text(&mut out, &line[cursor..whole.start()]);
        cursor = whole.end();

        if let (Some(alt), Some(src)) = (caps.name("alt"), caps.name("src")) {
            match image_segment(alt.as_str(), src.as_str(), assets) {
                InlineSegment::Text(text) => push_text(&mut out, &text),
                segment => out.push(segment),
            }
        } else if let Some(page) = caps.name("page") {
            let page = page.as_str();
            if options.strip_page_brackets {
                push_text(&mut out, page);
            } else {
                out.push(InlineSegment::PageLink {
                    target: canonical_link_target(page),
                    label: page.to_string(),
                });
            }
        } else if let (Some(label), Some(href)) = (caps.name("label"), caps.name("href")) {
            let href = href.as_str();
            if is_external(href) {
                out.push(InlineSegment::ExternalLink {
                    url: href.to_string(),
                    label: label.as_str().to_string(),
                });
            } else {
                out.push(InlineSegment::PageLink {
                    target: canonical_link_target(href),
                    label: label.as_str().to_string(),
                });
            }
        } else if let Some(block) = caps.name("block") {
            out.push(InlineSegment::BlockRef(block.as_str().to_string()));
        }
    }
    push_text(&mut out, &line[cursor..]);
    out
}

/// Activate a segment: internal links go to the navigator, external links
/// are handed back to the host.
pub fn activate_link(segment: &InlineSegment, navigator: &dyn Navigator) -> LinkAction {
    match segment {
        InlineSegment::PageLink { target, .. } => {
            navigator.open_page(target);
            LinkAction::Navigated(target.clone())
        }
        InlineSegment::ExternalLink { url, .. } => LinkAction::OpenExternal(url.clone()),
        InlineSegment::Download { href, .. } => LinkAction::OpenExternal(href.clone()),
        _ => LinkAction::Ignored,
    }
}

/// Resolve markdown / org / wiki link syntax to display text.
#[must_use]
pub fn link_display_text(line: &str) -> String {
    static ORG_LINK_REGEX: LazyLock<Regex> =
        LazyLock::new(|| compile_regex(r"\[\[([^\[\]]+)\]\[([^\[\]]+)\]\]"));
    let without_org = ORG_LINK_REGEX.replace_all(line, "$2");
    let mut out = String::with_capacity(without_org.len());
    for segment in segment_line(&without_org, &FilterOptions::default(), &NoAssets) {
        match segment {
            InlineSegment::Text(text) => out.push_str(&text),
            InlineSegment::PageLink { label, .. } | InlineSegment::ExternalLink { label, .. } => {
                out.push_str(&label);
            }
            InlineSegment::Image { alt, .. } => out.push_str(&alt),
            InlineSegment::Download { label, .. } => out.push_str(&label),
            InlineSegment::BlockRef(uuid) => {
                out.push_str("((");
                out.push_str(&uuid);
                out.push_str("))");
            }
        }
    }
    out
}
