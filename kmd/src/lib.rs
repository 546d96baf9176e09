pub mod block;
pub mod line;
pub mod parser;

use crate::block::Block;

/// A parsed kmd script.
#[derive(Debug, Clone)]
pub struct Script {
    /// The root block. Its nodes are the lines at the script's first indentation level.
    pub root: Block,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Script {
    /// Number of source lines in the script, comments included.
    pub fn line_count(&self) -> usize {
        self.root.lines().len()
    }
}
