use crate::models::ContentNode;

const TAB_WIDTH: usize = 2;

/// Split a leading list marker (`-`, `*`, `+`, `N.`, `N)`, org `**`) from a
/// line that has already been trimmed at the start.
///
/// Returns `(marker_len, rest)`; `rest` excludes the single separating space.
#[must_use]
pub fn split_list_marker(line: &str) -> Option<(usize, &str)> {
    let bytes = line.as_bytes();
    let first = *bytes.first()?;
    let marker_len = match first {
        b'-' | b'+' => 1,
        b'*' => bytes.iter().take_while(|b| **b == b'*').count(),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(b'.' | b')') => digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    match bytes.get(marker_len) {
        None => Some((marker_len, "")),
        Some(b' ' | b'\t') => Some((marker_len, &line[marker_len + 1..])),
        _ => None,
    }
}

pub(crate) fn is_fence_line(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Leading whitespace width with tabs counted as two spaces, plus the rest.
fn measure_indent(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (idx, ch) in line.char_indices() {
        match ch {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => return (width, &line[idx..]),
        }
    }
    (width, "")
}

/// Drop up to `width` columns of leading whitespace, keeping the remainder.
fn strip_columns(line: &str, width: usize) -> &str {
    let mut consumed = 0;
    for (idx, ch) in line.char_indices() {
        if consumed >= width {
            return &line[idx..];
        }
        match ch {
            ' ' => consumed += 1,
            '\t' => consumed += TAB_WIDTH,
            _ => return &line[idx..],
        }
    }
    ""
}

#[derive(Debug)]
struct PendingNode {
    indent: usize,
    content_col: usize,
    lines: Vec<String>,
    children: Vec<usize>,
    in_fence: bool,
}

impl PendingNode {
    fn new(indent: usize, content_col: usize, first_line: &str) -> Self {
        Self {
            indent,
            content_col,
            lines: vec![first_line.to_string()],
            children: Vec::new(),
            in_fence: is_fence_line(first_line),
        }
    }

    fn append(&mut self, text: &str) {
        if is_fence_line(text) {
            self.in_fence = !self.in_fence;
        }
        self.lines.push(text.to_string());
    }
}

#[derive(Debug, Default)]
struct TreeBuilder {
    nodes: Vec<PendingNode>,
    roots: Vec<usize>,
    stack: Vec<usize>,
}

impl TreeBuilder {
    fn attach(&mut self, node: PendingNode) {
        let idx = self.nodes.len();
        self.nodes.push(node);
        match self.stack.last() {
            Some(parent) => self.nodes[*parent].children.push(idx),
            None => self.roots.push(idx),
        }
        self.stack.push(idx);
    }

    fn pop_until_shallower(&mut self, indent: usize, inclusive: bool) {
        while let Some(top) = self.stack.last() {
            let top_indent = self.nodes[*top].indent;
            let pop = if inclusive {
                top_indent >= indent
            } else {
                top_indent > indent
            };
            if !pop {
                break;
            }
            self.stack.pop();
        }
    }

    fn open_fence_node(&mut self) -> Option<usize> {
        self.stack
            .last()
            .copied()
            .filter(|idx| self.nodes[*idx].in_fence)
    }

    fn push_line(&mut self, raw: &str) {
        if let Some(idx) = self.open_fence_node() {
            let width = self.nodes[idx].content_col;
            self.nodes[idx].append(strip_columns(raw, width));
            return;
        }
        let (indent, rest) = measure_indent(raw);
        if rest.is_empty() {
            return;
        }
        if let Some((marker_len, text)) = split_list_marker(rest) {
            let org_depth = if rest.starts_with("**") {
                (marker_len - 1) * TAB_WIDTH
            } else {
                0
            };
            let indent = indent + org_depth;
            self.pop_until_shallower(indent, true);
            self.attach(PendingNode::new(indent, indent + marker_len + 1, text));
            return;
        }
        let depth = self.stack.len();
        self.pop_until_shallower(indent, false);
        // A dedent back to an ancestor starts a sibling of that ancestor.
        let dedented = self.stack.len() < depth;
        match self.stack.last().copied() {
            Some(top) if !dedented && indent <= self.nodes[top].content_col => {
                self.nodes[top].append(rest);
            }
            _ => {
                if dedented {
                    self.pop_until_shallower(indent, true);
                }
                self.attach(PendingNode::new(indent, indent, rest));
            }
        }
    }

    fn finish(mut self) -> Vec<ContentNode> {
        let roots = std::mem::take(&mut self.roots);
        roots.iter().map(|idx| self.materialize(*idx)).collect()
    }

    fn materialize(&self, idx: usize) -> ContentNode {
        let node = &self.nodes[idx];
        let text = node.lines.join("\n").trim_end().to_string();
        let children = node
            .children
            .iter()
            .map(|child| self.materialize(*child))
            .collect();
        ContentNode { text, children }
    }
}

/// Build the block tree from body lines (front matter and logbooks removed).
#[must_use]
pub fn build_tree(lines: &[&str]) -> Vec<ContentNode> {
    let mut builder = TreeBuilder::default();
    for line in lines {
        builder.push_line(line.trim_end_matches('\r'));
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_markers() {
        assert_eq!(split_list_marker("- item"), Some((1, "item")));
        assert_eq!(split_list_marker("-"), Some((1, "")));
        assert_eq!(split_list_marker("12. step"), Some((3, "step")));
        assert_eq!(split_list_marker("** org"), Some((2, "org")));
        assert_eq!(split_list_marker("---"), None);
        assert_eq!(split_list_marker("**bold**"), None);
        assert_eq!(split_list_marker("2025 plan"), None);
    }

    #[test]
    fn test_plain_indented_text() {
        let lines = vec!["root", "  child", "    grandchild", "sibling"];
        let tree = build_tree(&lines);
        assert_eq!(
            tree,
            vec![
                ContentNode::with_children(
                    "root",
                    vec![ContentNode::with_children(
                        "child",
                        vec![ContentNode::leaf("grandchild")]
                    )]
                ),
                ContentNode::leaf("sibling"),
            ]
        );
    }

    #[test]
    fn test_dedented_plain_line_becomes_sibling() {
        let lines = vec!["- A", "  - B", "    - C", "  tail", "top"];
        let tree = build_tree(&lines);
        assert_eq!(
            tree,
            vec![
                ContentNode::with_children(
                    "A",
                    vec![
                        ContentNode::with_children("B", vec![ContentNode::leaf("C")]),
                        ContentNode::leaf("tail"),
                    ]
                ),
                ContentNode::leaf("top"),
            ]
        );
    }

    #[test]
    fn test_continuation_lines_and_properties() {
        let lines = vec!["- A", "  id:: 123", "  more text", "  - B"];
        let tree = build_tree(&lines);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].text, "A\nid:: 123\nmore text");
        assert_eq!(tree[0].children, vec![ContentNode::leaf("B")]);
    }

    #[test]
    fn test_tabs_count_as_two_spaces() {
        let lines = vec!["- A", "\t- B", "\t\t- C", "  - D"];
        let tree = build_tree(&lines);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children, vec![ContentNode::leaf("C")]);
        assert_eq!(tree[0].children[1].text, "D");
    }

    #[test]
    fn test_fenced_code_stays_in_block() {
        let lines = vec!["- code:", "  ```", "  - not a bullet", "      indented", "  ```", "- next"];
        let tree = build_tree(&lines);
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree[0].text,
            "code:\n```\n- not a bullet\n    indented\n```"
        );
    }

    #[test]
    fn test_org_headings_nest_by_stars() {
        let lines = vec!["* Top", "body", "** Sub", "* Next"];
        let tree = build_tree(&lines);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].text, "Top\nbody");
        assert_eq!(tree[0].children, vec![ContentNode::leaf("Sub")]);
    }
}
