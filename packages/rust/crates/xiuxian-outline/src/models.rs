//! Shared data model: index records, parsed blocks and load states.

use serde::{Deserialize, Serialize};

/// One page entry in the metadata index, keyed by `(graph_id, name)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRecord {
    /// Graph this page belongs to.
    pub graph_id: String,
    /// Canonical page name (decoded from the file name).
    pub name: String,
    /// Page uuid when known; empty otherwise.
    pub uuid: String,
    /// Last modification time, unix milliseconds.
    pub last_modified: i64,
    /// Short summary lines shown in listings.
    pub summary_lines: Vec<String>,
    /// First image reference found in the page, or empty.
    pub image_ref: String,
    /// Archived flag (owned by the host bookkeeping).
    pub archived: bool,
    /// Favorite flag (owned by the host bookkeeping).
    pub favorite: bool,
    /// Whether this page is a dated journal entry.
    pub journal: bool,
}

impl PageRecord {
    /// Create an empty record for `(graph_id, name)`.
    #[must_use]
    pub fn new(graph_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store key of this record.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.graph_id.clone(), self.name.clone())
    }

    /// Copy host-owned flags from a previous version of the same page.
    pub fn carry_flags_from(&mut self, previous: &Self) {
        self.archived = previous.archived;
        self.favorite = previous.favorite;
    }
}

/// Boolean flags the store can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFlag {
    /// `archived == true`
    Archived,
    /// `favorite == true`
    Favorite,
}

impl PageFlag {
    /// Whether `record` carries this flag.
    #[must_use]
    pub fn is_set(self, record: &PageRecord) -> bool {
        match self {
            Self::Archived => record.archived,
            Self::Favorite => record.favorite,
        }
    }
}

/// One block of a parsed outline document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Block text; continuation lines are joined with `\n`.
    pub text: String,
    /// Nested child blocks.
    #[serde(default)]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    /// Create a leaf node.
    #[must_use]
    pub fn leaf(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children.
    #[must_use]
    pub fn with_children(text: impl Into<String>, children: Vec<ContentNode>) -> Self {
        Self {
            text: text.into(),
            children,
        }
    }

    /// First line of the block text.
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }
}

/// Load state of a page body as seen by a renderer.
///
/// "Not loaded yet", "resolved but empty" and "resolved with content" are
/// distinct; an unresolvable page is `NotFound`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageContent {
    /// Nothing requested or still in flight.
    #[default]
    NotLoaded,
    /// No backing file could be resolved or read.
    NotFound,
    /// Loaded; the file has no visible blocks.
    Empty,
    /// Loaded blocks.
    Blocks(Vec<ContentNode>),
}

impl PageContent {
    /// Wrap parsed blocks, distinguishing empty from non-empty.
    #[must_use]
    pub fn from_blocks(blocks: Vec<ContentNode>) -> Self {
        if blocks.is_empty() {
            Self::Empty
        } else {
            Self::Blocks(blocks)
        }
    }

    /// Whether a load attempt finished (found or not).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }

    /// Parsed blocks, empty for every state without content.
    #[must_use]
    pub fn blocks(&self) -> &[ContentNode] {
        match self {
            Self::Blocks(blocks) => blocks,
            _ => &[],
        }
    }
}
