use std::ops::Range;

use crate::line::Line;

/// A node in the indentation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Line(Line),
    /// A sub-block: lines indented under the preceding sibling.
    Block(Block),
}

impl Node {
    pub fn span(&self) -> Range<usize> {
        match self {
            Node::Line(line) => line.span.clone(),
            Node::Block(block) => block.span.clone(),
        }
    }
}

/// Lines sharing one indentation level, with their nested sub-blocks,
/// in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub nodes: Vec<Node>,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
}

impl Block {
    pub fn new(nodes: Vec<Node>) -> Self {
        let span = match (nodes.first(), nodes.last()) {
            (Some(first), Some(last)) => first.span().start..last.span().end,
            _ => 0..0,
        };
        Block { nodes, span }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All lines of the block and its sub-blocks, depth-first, in source order.
    pub fn lines(&self) -> Vec<&Line> {
        let mut lines = Vec::new();
        collect_lines(self, &mut lines);
        lines
    }

    /// Nesting depth: 1 for a block without sub-blocks.
    pub fn depth(&self) -> usize {
        1 + self
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Block(block) => Some(block.depth()),
                Node::Line(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

fn collect_lines<'a>(block: &'a Block, out: &mut Vec<&'a Line>) {
    for node in &block.nodes {
        match node {
            Node::Line(line) => out.push(line),
            Node::Block(child) => collect_lines(child, out),
        }
    }
}
