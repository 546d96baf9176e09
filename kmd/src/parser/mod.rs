pub mod error;
mod structural;

pub use error::ParseError;

use crate::Script;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the script source into its indentation tree.
    pub fn parse(&self) -> Result<Script, Vec<ParseError>> {
        let root = structural::parse_tree(&self.source, self.file_id)?;
        Ok(Script {
            root,
            source_id: self.file_id,
        })
    }
}
