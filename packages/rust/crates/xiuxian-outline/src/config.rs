//! YAML configuration with typed defaults and environment overrides.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::OutlineError;
use crate::render::FilterOptions;
use crate::resolver::{CandidateOptions, DEFAULT_MAX_CANDIDATES, ResolveOptions};

/// Overrides `index.batch_size`.
pub const BATCH_SIZE_ENV: &str = "XIUXIAN_OUTLINE_BATCH_SIZE";
/// Overrides `index.batch_sleep_ms`.
pub const BATCH_SLEEP_MS_ENV: &str = "XIUXIAN_OUTLINE_BATCH_SLEEP_MS";
/// Overrides `index.summary_char_cap`.
pub const SUMMARY_CHAR_CAP_ENV: &str = "XIUXIAN_OUTLINE_SUMMARY_CHAR_CAP";

const DEFAULT_EXCLUDED_DIR_NAMES: &[&str] = &[".git", "logseq", "bak", ".recycle", "node_modules"];

/// Graph directory layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Primary pages directory.
    pub pages_dir: PathBuf,
    /// Optional sibling journals root.
    pub journals_dir: Option<PathBuf>,
    /// Extra lookup directories, searched last.
    pub extra_dirs: Vec<PathBuf>,
    /// Directory names skipped while crawling.
    pub excluded_dirs: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("pages"),
            journals_dir: None,
            extra_dirs: Vec::new(),
            excluded_dirs: DEFAULT_EXCLUDED_DIR_NAMES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Index builder knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Records per batch for outliner-sourced rebuilds.
    pub batch_size: usize,
    /// Cooperative sleep between batches, milliseconds.
    pub batch_sleep_ms: u64,
    /// Character cap per summary line.
    pub summary_char_cap: usize,
    /// Maximum number of summary lines per page.
    pub summary_max_lines: usize,
    /// Files larger than this are indexed without a summary.
    pub max_file_bytes: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_sleep_ms: 300,
            summary_char_cap: 100,
            summary_max_lines: 8,
            max_file_bytes: 2 * 1024 * 1024,
        }
    }
}

impl IndexConfig {
    /// Sleep between outliner batches.
    #[must_use]
    pub fn batch_sleep(&self) -> Duration {
        Duration::from_millis(self.batch_sleep_ms)
    }
}

/// Name resolver knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidate list cap.
    pub max_candidates: usize,
    /// Enable the O(entries) directory scan fallback.
    pub scan_fallback: bool,
    /// Put journal date forms first.
    pub prefer_journal: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            scan_fallback: false,
            prefer_journal: false,
        }
    }
}

impl ResolverConfig {
    /// Candidate generation options.
    #[must_use]
    pub fn candidate_options(&self) -> CandidateOptions {
        CandidateOptions {
            prefer_journal: self.prefer_journal,
            max_candidates: self.max_candidates,
        }
    }

    /// Directory probing options.
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            scan_fallback: self.scan_fallback,
        }
    }
}

/// Hover preview timing and cache bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    /// Delay before a hovered preview becomes visible.
    pub show_delay_ms: u64,
    /// Minimum time a visible preview stays up.
    pub min_visible_ms: u64,
    /// Extension applied on pointer activity over the popover.
    pub popover_extend_ms: u64,
    /// Preview cache entry cap.
    pub cache_capacity: usize,
    /// Preview cache entry lifetime.
    pub cache_ttl_ms: u64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            show_delay_ms: 1500,
            min_visible_ms: 2000,
            popover_extend_ms: 500,
            cache_capacity: 16,
            cache_ttl_ms: 60_000,
        }
    }
}

impl HoverConfig {
    /// `show_delay_ms` as a duration.
    #[must_use]
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay_ms)
    }

    /// `min_visible_ms` as a duration.
    #[must_use]
    pub fn min_visible(&self) -> Duration {
        Duration::from_millis(self.min_visible_ms)
    }

    /// `popover_extend_ms` as a duration.
    #[must_use]
    pub fn popover_extend(&self) -> Duration {
        Duration::from_millis(self.popover_extend_ms)
    }

    /// `cache_ttl_ms` as a duration.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// Complete configuration; every section and field is optional in YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Directory layout.
    pub graph: GraphConfig,
    /// Index builder.
    pub index: IndexConfig,
    /// Name resolver.
    pub resolver: ResolverConfig,
    /// Hover preview.
    pub hover: HoverConfig,
    /// Default render filters.
    pub filters: FilterOptions,
}

fn parse_positive<T: std::str::FromStr + PartialOrd + Default>(raw: &str) -> Option<T> {
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value > T::default())
}

impl OutlineConfig {
    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`OutlineError::Config`] when the YAML is malformed.
    pub fn from_yaml_str(raw: &str) -> Result<Self, OutlineError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|err| OutlineError::Config(err.to_string()))
    }

    /// Load `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self, OutlineError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!("loaded outline config {}", path.display());
                Self::from_yaml_str(&raw)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "outline config {} not found; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Apply `XIUXIAN_OUTLINE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; invalid or non-positive
    /// values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(BATCH_SIZE_ENV).and_then(|raw| parse_positive(&raw)) {
            self.index.batch_size = value;
        }
        if let Some(value) = lookup(BATCH_SLEEP_MS_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        {
            self.index.batch_sleep_ms = value;
        }
        if let Some(value) = lookup(SUMMARY_CHAR_CAP_ENV).and_then(|raw| parse_positive(&raw)) {
            self.index.summary_char_cap = value;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = OutlineConfig::from_yaml_str(
            "graph:\n  pages_dir: /notes/pages\nhover:\n  show_delay_ms: 800\nfilters:\n  hide_properties: true\n",
        )
        .unwrap();
        assert_eq!(config.graph.pages_dir, PathBuf::from("/notes/pages"));
        assert!(config.graph.excluded_dirs.contains(&"logseq".to_string()));
        assert_eq!(config.hover.show_delay_ms, 800);
        assert_eq!(config.hover.min_visible_ms, 2000);
        assert_eq!(config.index.batch_size, 100);
        assert!(config.filters.hide_properties);
        assert!(!config.filters.folder_mode);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        assert!(matches!(
            OutlineConfig::from_yaml_str("index: [1, 2"),
            Err(OutlineError::Config(_))
        ));
        assert_eq!(OutlineConfig::from_yaml_str("").unwrap(), OutlineConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = OutlineConfig::load(&tmp.path().join("absent.yaml")).unwrap();
        assert_eq!(config, OutlineConfig::default());
    }

    #[test]
    fn test_overrides_ignore_invalid_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (BATCH_SIZE_ENV, "25"),
            (BATCH_SLEEP_MS_ENV, "0"),
            (SUMMARY_CHAR_CAP_ENV, "not-a-number"),
        ]);
        let config = OutlineConfig::default()
            .with_overrides_from(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.index.batch_size, 25);
        assert_eq!(config.index.batch_sleep_ms, 0);
        assert_eq!(config.index.summary_char_cap, 100);
    }
}
