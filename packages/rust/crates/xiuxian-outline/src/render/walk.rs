use std::str::Lines;

use super::options::FilterOptions;
use super::rules::{LineContext, LineOutcome, apply_rules};
use crate::models::ContentNode;
use crate::parser::{is_drawer_end, is_fence_line, is_logbook_start};

/// Payload of one rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineContent {
    /// Display text with the list marker removed.
    Text(String),
    /// Placeholder for a block reference or embed.
    Reference {
        /// Referenced block uuid or embedded page name.
        id: String,
        /// Whether the source was an `{{embed ...}}`.
        embed: bool,
    },
}

/// One visible line produced by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    /// Hierarchy depth (0 for top-level blocks).
    pub depth: usize,
    /// First source line of its block.
    pub first_in_node: bool,
    /// Line payload.
    pub content: LineContent,
}

struct NodeLines<'a> {
    lines: Lines<'a>,
    children: &'a [ContentNode],
    depth: usize,
    index: usize,
    in_fence: bool,
    in_logbook: bool,
}

impl<'a> NodeLines<'a> {
    fn new(node: &'a ContentNode, depth: usize) -> Self {
        Self {
            lines: node.text.lines(),
            children: &node.children,
            depth,
            index: 0,
            in_fence: false,
            in_logbook: false,
        }
    }
}

/// Lazy pre-order walk over a block tree with the rule chain applied.
///
/// The tree is borrowed, so the same parse can be walked any number of
/// times under different options.
pub struct Walk<'a> {
    options: &'a FilterOptions,
    stack: Vec<(std::slice::Iter<'a, ContentNode>, usize)>,
    current: Option<NodeLines<'a>>,
    first_lines_only: bool,
}

impl<'a> Walk<'a> {
    /// Only consider the first line of every block.
    #[must_use]
    pub fn first_lines_only(mut self) -> Self {
        self.first_lines_only = true;
        self
    }

    fn next_line_of_current(&mut self) -> Option<RenderedLine> {
        let first_only = self.first_lines_only;
        let options = self.options;
        let node = self.current.as_mut()?;
        loop {
            if first_only && node.index > 0 {
                return None;
            }
            let line = node.lines.next()?;
            let index = node.index;
            node.index += 1;

            if options.hide_logbook && !node.in_fence {
                if node.in_logbook {
                    node.in_logbook = !is_drawer_end(line);
                    continue;
                }
                if is_logbook_start(line) {
                    node.in_logbook = true;
                    continue;
                }
            }
            let fence_line = is_fence_line(line);
            let ctx = LineContext {
                in_fence: node.in_fence || fence_line,
            };
            if fence_line {
                node.in_fence = !node.in_fence;
            }
            let content = match apply_rules(line, options, ctx) {
                LineOutcome::Dropped => continue,
                LineOutcome::Text(text) => LineContent::Text(text),
                LineOutcome::Reference { id, embed } => LineContent::Reference { id, embed },
            };
            return Some(RenderedLine {
                depth: node.depth,
                first_in_node: index == 0,
                content,
            });
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = RenderedLine;

    fn next(&mut self) -> Option<RenderedLine> {
        loop {
            if let Some(line) = self.next_line_of_current() {
                return Some(line);
            }
            if let Some(done) = self.current.take()
                && !done.children.is_empty()
            {
                self.stack.push((done.children.iter(), done.depth + 1));
            }
            let (siblings, depth) = self.stack.last_mut()?;
            let depth = *depth;
            match siblings.next() {
                Some(node) => self.current = Some(NodeLines::new(node, depth)),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Walk `nodes` starting at `depth`, yielding every visible line.
#[must_use]
pub fn walk<'a>(nodes: &'a [ContentNode], options: &'a FilterOptions, depth: usize) -> Walk<'a> {
    Walk {
        options,
        stack: vec![(nodes.iter(), depth)],
        current: None,
        first_lines_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<ContentNode> {
        vec![
            ContentNode::with_children(
                "A\nid:: 1\nsecond line",
                vec![ContentNode::with_children(
                    "B",
                    vec![ContentNode::leaf("C")],
                )],
            ),
            ContentNode::leaf("D"),
        ]
    }

    fn texts(lines: impl Iterator<Item = RenderedLine>) -> Vec<(usize, String)> {
        lines
            .filter_map(|line| match line.content {
                LineContent::Text(text) => Some((line.depth, text)),
                LineContent::Reference { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_pre_order_with_depths() {
        let nodes = tree();
        let options = FilterOptions::default();
        assert_eq!(
            texts(walk(&nodes, &options, 0)),
            vec![
                (0, "A".to_string()),
                (0, "second line".to_string()),
                (1, "B".to_string()),
                (2, "C".to_string()),
                (0, "D".to_string()),
            ]
        );
    }

    #[test]
    fn test_walk_is_restartable_and_first_lines_only() {
        let nodes = tree();
        let options = FilterOptions::default();
        let first: Vec<_> = walk(&nodes, &options, 0).collect();
        let second: Vec<_> = walk(&nodes, &options, 0).collect();
        assert_eq!(first, second);

        let heads = texts(walk(&nodes, &options, 1).first_lines_only());
        assert_eq!(
            heads,
            vec![
                (1, "A".to_string()),
                (2, "B".to_string()),
                (3, "C".to_string()),
                (1, "D".to_string()),
            ]
        );
    }

    #[test]
    fn test_hidden_block_keeps_children() {
        let nodes = vec![ContentNode::with_children(
            "collapsed:: true",
            vec![ContentNode::leaf("child")],
        )];
        let options = FilterOptions::default();
        assert_eq!(texts(walk(&nodes, &options, 0)), vec![(1, "child".to_string())]);
    }

    #[test]
    fn test_logbook_inside_block_text() {
        let nodes = vec![ContentNode::leaf(
            "task\n:LOGBOOK:\nCLOCK: [2024-01-01]\n:END:\nafter",
        )];
        let hide = FilterOptions {
            hide_logbook: true,
            ..FilterOptions::default()
        };
        assert_eq!(
            texts(walk(&nodes, &hide, 0)),
            vec![(0, "task".to_string()), (0, "after".to_string())]
        );
        assert_eq!(texts(walk(&nodes, &FilterOptions::default(), 0)).len(), 5);
    }

    #[test]
    fn test_fenced_lines_keep_markers() {
        let nodes = vec![ContentNode::leaf("code\n```\n- TODO keep\n```")];
        let options = FilterOptions {
            normalize_tasks: true,
            ..FilterOptions::default()
        };
        let lines = texts(walk(&nodes, &options, 0));
        assert_eq!(lines[2], (0, "- TODO keep".to_string()));
    }
}
