use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use super::options::{FilterOptions, RefPolicy};
use crate::compile_regex;
use crate::parser::split_list_marker;

static LINE_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"^\s*(?:(?:[-*+]|\d+[.)])(?:\s+|$))?(?:\[[ xX-]\](?:\s+|$))?")
});
static PROPERTY_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^([A-Za-z0-9_.\-]+)::(?:\s|$)"));
static PROPERTY_ANYWHERE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?:^|\s)[A-Za-z0-9_.\-]+::(?:\s|$)"));
static QUERY_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?i)(?:\{\{\s*query\b|^\s*#\+(?:begin|end)_query\b)")
});
static PURE_REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"^(?:\(\((?P<block>[^()\s]+)\)\)|\{\{\s*embed\s+\(\((?P<embed_block>[^()\s]+)\)\)\s*\}\}|\{\{\s*embed\s+\[\[(?P<embed_page>[^\[\]]+)\]\]\s*\}\})$",
    )
});
static MACRO_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\{\{.*?\}\}"));
static QUERY_MACRO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)^\{\{\s*query\b"));
static RENDERER_MACRO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)\{\{\s*renderer\b.*?\}\}"));
static CHECKBOX_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"^\[[ xX-]\]"));
static TASK_KEYWORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"^(?P<kw>TODO|DOING|NOW|LATER|WAITING|IN-PROGRESS|HABIT|STARTED|START|DONE|CANCEL[A-Z]*)(?:\s+|$)",
    )
});
static PAGE_REF_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"#?\[\[[^\[\]]*\]\]"));
static PAGE_BRACKETS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[\[([^\[\]]+)\]\]"));

/// Result of running one source line through the rule chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line is suppressed.
    Dropped,
    /// The line survives with this display text (list marker removed).
    Text(String),
    /// Linked-policy placeholder for a pure reference/embed line.
    Reference {
        /// Referenced block uuid or embedded page name.
        id: String,
        /// `{{embed ...}}` rather than a bare `((uuid))`.
        embed: bool,
    },
}

/// Per-line state supplied by the walker.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineContext {
    /// The line is inside (or delimits) a fenced code block.
    pub in_fence: bool,
}

fn prefix_len(line: &str) -> usize {
    LINE_PREFIX_REGEX.find(line).map_or(0, |found| found.end())
}

/// Property key of a `key:: value` line, tolerating a bullet and checkbox.
#[must_use]
pub fn property_key(line: &str) -> Option<&str> {
    let rest = &line[prefix_len(line)..];
    PROPERTY_KEY_REGEX
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .map(|key| key.as_str())
}

fn pure_reference(line: &str) -> Option<(usize, String, bool)> {
    let start = prefix_len(line);
    let caps = PURE_REFERENCE_REGEX.captures(line[start..].trim_end())?;
    if let Some(block) = caps.name("block") {
        return Some((start, block.as_str().to_string(), false));
    }
    caps.name("embed_block")
        .or_else(|| caps.name("embed_page"))
        .map(|target| (start, target.as_str().trim().to_string(), true))
}

fn strip_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    split_list_marker(trimmed).map_or(trimmed, |(_, rest)| rest)
}

fn remove_macros<'a>(line: &'a str, options: &FilterOptions) -> Cow<'a, str> {
    MACRO_REGEX.replace_all(line, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        if !options.hide_queries && QUERY_MACRO_REGEX.is_match(token) {
            token.to_string()
        } else {
            String::new()
        }
    })
}

/// Rewrite a leading task keyword to a checkbox unless one is present.
#[must_use]
pub fn normalize_task(line: &str) -> Cow<'_, str> {
    if CHECKBOX_REGEX.is_match(line) {
        return Cow::Borrowed(line);
    }
    let Some(caps) = TASK_KEYWORD_REGEX.captures(line) else {
        return Cow::Borrowed(line);
    };
    let (Some(whole), Some(keyword)) = (caps.get(0), caps.name("kw")) else {
        return Cow::Borrowed(line);
    };
    let checkbox = match keyword.as_str() {
        "DONE" => "[x]",
        kw if kw.starts_with("CANCEL") => "[-]",
        _ => "[ ]",
    };
    let rest = &line[whole.end()..];
    if rest.is_empty() {
        Cow::Owned(checkbox.to_string())
    } else {
        Cow::Owned(format!("{checkbox} {rest}"))
    }
}

fn apply_substitutions(line: &str, options: &FilterOptions, ctx: LineContext) -> String {
    let mut out = line.to_string();
    for needle in options.remove_strings.iter().filter(|s| !s.is_empty()) {
        out = out.replace(needle.as_str(), "");
    }
    if options.hide_renderers {
        out = RENDERER_MACRO_REGEX.replace_all(&out, "").into_owned();
    }
    if options.remove_macros {
        out = remove_macros(&out, options).into_owned();
    }
    if options.normalize_tasks && !ctx.in_fence {
        out = normalize_task(&out).into_owned();
    }
    if options.hide_page_refs {
        out = PAGE_REF_TOKEN_REGEX.replace_all(&out, "").into_owned();
    }
    if options.strip_page_brackets {
        out = PAGE_BRACKETS_REGEX.replace_all(&out, "$1").into_owned();
    }
    out
}

/// Run the ordered rule chain over one line.
///
/// 1. forced-hidden properties, 2. `hide_properties`, 3. `hide_queries`,
/// 4. pure reference/embed lines, 5. list-marker strip, 6. bare dash in
/// folder policy, 7. substitutions.
#[must_use]
pub fn apply_rules(line: &str, options: &FilterOptions, ctx: LineContext) -> LineOutcome {
    if property_key(line).is_some_and(|key| options.is_always_hidden_key(key)) {
        return LineOutcome::Dropped;
    }
    if options.hide_properties && PROPERTY_ANYWHERE_REGEX.is_match(line) {
        return LineOutcome::Dropped;
    }
    if options.hide_queries && QUERY_LINE_REGEX.is_match(line) {
        return LineOutcome::Dropped;
    }

    let mut working = Cow::Borrowed(line);
    if let Some((start, id, embed)) = pure_reference(line) {
        if options.hide_references {
            return LineOutcome::Dropped;
        }
        match options.ref_policy() {
            RefPolicy::Linked => return LineOutcome::Reference { id, embed },
            RefPolicy::Folder => working = Cow::Owned(line[..start].to_string()),
        }
    }

    let display = if ctx.in_fence {
        working.as_ref()
    } else {
        strip_marker(&working)
    };
    if options.folder_mode {
        let bare = display.trim();
        if bare.is_empty() || bare == "-" {
            return LineOutcome::Dropped;
        }
    }

    let substituted = apply_substitutions(display, options, ctx);
    let substituted = substituted.trim_end();
    if substituted.trim().is_empty() && !display.trim().is_empty() {
        return LineOutcome::Dropped;
    }
    LineOutcome::Text(substituted.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &str, options: &FilterOptions) -> LineOutcome {
        apply_rules(line, options, LineContext::default())
    }

    fn kept(value: &str) -> LineOutcome {
        LineOutcome::Text(value.to_string())
    }

    #[test]
    fn test_forced_hidden_properties_tolerate_prefixes() {
        let options = FilterOptions::default();
        assert_eq!(text("id:: 6650c1f2", &options), LineOutcome::Dropped);
        assert_eq!(text("- [ ] COLLAPSED:: true", &options), LineOutcome::Dropped);
        assert_eq!(text("tags:: rust", &options), kept("tags:: rust"));

        let custom = FilterOptions {
            always_hide_keys: vec!["tags".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(text("1. tags:: rust", &custom), LineOutcome::Dropped);
    }

    #[test]
    fn test_hide_properties_only_touches_property_lines() {
        let options = FilterOptions {
            hide_properties: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("status:: open", &options), LineOutcome::Dropped);
        assert_eq!(text("plain words: here", &options), kept("plain words: here"));
        assert_eq!(
            text("plain words: here", &FilterOptions::default()),
            text("plain words: here", &options)
        );
    }

    #[test]
    fn test_query_lines() {
        let options = FilterOptions {
            hide_queries: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("{{query (todo now)}}", &options), LineOutcome::Dropped);
        assert_eq!(text("#+BEGIN_QUERY", &options), LineOutcome::Dropped);
        assert_eq!(
            text("{{query (todo now)}}", &FilterOptions::default()),
            kept("{{query (todo now)}}")
        );
    }

    #[test]
    fn test_reference_policies() {
        let linked = FilterOptions::default();
        assert_eq!(
            text("((65a0-11))", &linked),
            LineOutcome::Reference {
                id: "65a0-11".to_string(),
                embed: false
            }
        );
        assert_eq!(
            text("- {{embed [[Design Notes]]}}", &linked),
            LineOutcome::Reference {
                id: "Design Notes".to_string(),
                embed: true
            }
        );

        let hidden = FilterOptions {
            hide_references: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("{{embed ((65a0-11))}}", &hidden), LineOutcome::Dropped);

        let folder = FilterOptions {
            folder_mode: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("- ((65a0-11))", &folder), LineOutcome::Dropped);
        assert_eq!(text("[ ] ((65a0-11))", &folder), kept("[ ]"));
        assert_eq!(text("see ((65a0-11))", &folder), kept("see ((65a0-11))"));
    }

    #[test]
    fn test_task_normalization() {
        let options = FilterOptions {
            normalize_tasks: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("TODO write report", &options), kept("[ ] write report"));
        assert_eq!(text("DONE write report", &options), kept("[x] write report"));
        assert_eq!(text("CANCELED trip", &options), kept("[-] trip"));
        assert_eq!(text("[x] already checked", &options), kept("[x] already checked"));
        assert_eq!(text("TODOS are words", &options), kept("TODOS are words"));
        assert_eq!(
            apply_rules("TODO in code", &options, LineContext { in_fence: true }),
            kept("TODO in code")
        );
    }

    #[test]
    fn test_macro_removal_keeps_queries_unless_hidden() {
        let options = FilterOptions {
            remove_macros: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("a {{cloze b}} c", &options), kept("a  c"));
        assert_eq!(text("{{query x}} tail", &options), kept("{{query x}} tail"));
        assert_eq!(text("{{youtube abc}}", &options), LineOutcome::Dropped);
    }

    #[test]
    fn test_page_brackets_and_removed_strings() {
        let options = FilterOptions {
            strip_page_brackets: true,
            remove_strings: vec!["#draft".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(text("see [[Rust Book]] #draft", &options), kept("see Rust Book"));
        assert_eq!(text("no links here", &options), kept("no links here"));

        let hide_refs = FilterOptions {
            hide_page_refs: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("[[Only Ref]]", &hide_refs), LineOutcome::Dropped);
        assert_eq!(text("tagged #[[x y]]", &hide_refs), kept("tagged"));
    }

    #[test]
    fn test_folder_mode_drops_bare_dash() {
        let folder = FilterOptions {
            folder_mode: true,
            ..FilterOptions::default()
        };
        assert_eq!(text("-", &folder), LineOutcome::Dropped);
        assert_eq!(text("", &folder), LineOutcome::Dropped);
        assert_eq!(text("", &FilterOptions::default()), kept(""));
    }
}
