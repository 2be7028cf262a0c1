//! Rule-based render pipeline over parsed block trees.
//!
//! [`walk`] applies the line rules lazily; [`render`] linearizes the walk
//! into outline, plain or summary text. [`inline`] splits surviving lines
//! into link segments for interactive hosts.

pub mod inline;
mod modes;
mod options;
mod rules;
mod walk;

pub use self::inline::{
    AssetResolver, InlineSegment, LinkAction, Navigator, NoAssets, activate_link,
    canonical_link_target, link_display_text, segment_line,
};
pub use self::modes::{
    RenderMode, render, render_lines, render_outline, render_plain, render_summary, strip_markup,
};
pub use self::options::{FilterOptions, RefPolicy};
pub use self::rules::{LineContext, LineOutcome, apply_rules, normalize_task, property_key};
pub use self::walk::{LineContent, RenderedLine, Walk, walk};
