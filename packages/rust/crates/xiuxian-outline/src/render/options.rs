use serde::{Deserialize, Serialize};

/// How block references and embeds are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefPolicy {
    /// References cannot be resolved to live content; tokens are stripped.
    Folder,
    /// References become placeholders carrying the referenced id.
    Linked,
}

/// Render toggles. Every omitted field is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Drop every `key:: value` property line.
    pub hide_properties: bool,
    /// Drop pure block-reference / embed lines.
    pub hide_references: bool,
    /// Property keys that are always hidden, in addition to `id` and
    /// `collapsed`. Matched case-insensitively.
    pub always_hide_keys: Vec<String>,
    /// Remove `[[Page]]` and `#[[Page]]` tokens from lines.
    pub hide_page_refs: bool,
    /// Drop query lines and query macros.
    pub hide_queries: bool,
    /// Remove `{{renderer ...}}` macros.
    pub hide_renderers: bool,
    /// Remove `{{ ... }}` macros (queries are kept unless `hide_queries`).
    pub remove_macros: bool,
    /// Render `[[Page]]` as `Page`.
    pub strip_page_brackets: bool,
    /// Turn task keywords into checkboxes.
    pub normalize_tasks: bool,
    /// Literal substrings deleted from every surviving line.
    pub remove_strings: Vec<String>,
    /// Drop `:LOGBOOK:` drawers that survive inside block text.
    pub hide_logbook: bool,
    /// Folder rendering policy (see [`RefPolicy::Folder`]).
    pub folder_mode: bool,
}

impl FilterOptions {
    /// Reference rendering policy implied by `folder_mode`.
    #[must_use]
    pub fn ref_policy(&self) -> RefPolicy {
        if self.folder_mode {
            RefPolicy::Folder
        } else {
            RefPolicy::Linked
        }
    }

    /// Whether `key` is hidden regardless of `hide_properties`.
    #[must_use]
    pub fn is_always_hidden_key(&self, key: &str) -> bool {
        const FORCED: &[&str] = &["id", "collapsed"];
        let key = key.trim();
        FORCED.iter().any(|forced| forced.eq_ignore_ascii_case(key))
            || self
                .always_hide_keys
                .iter()
                .any(|hidden| hidden.trim().eq_ignore_ascii_case(key))
    }
}
