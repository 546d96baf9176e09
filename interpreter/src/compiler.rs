use kmd::Script;
use kmd::block::{Block, Node};
use kmd::line::Line;
use tracing::debug;

use crate::combinator::{map_each, pipe};
use crate::error::CompileError;
use crate::registry::{ArgumentDecoding, CommandRegistry};
use crate::step::StepRef;

/// Turns an indentation tree into one composed step.
pub struct Compiler<'r> {
    registry: &'r CommandRegistry,
    source_id: usize,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r CommandRegistry, source_id: usize) -> Self {
        Compiler {
            registry,
            source_id,
        }
    }

    /// Compile a whole script. The root block is never mapped.
    pub fn compile_script(&self, script: &Script) -> Result<StepRef, Vec<CompileError>> {
        self.compile_block(&script.root, false)
    }

    /// Compile a block into a pipe of its lines and sub-blocks.
    ///
    /// Comment lines are dropped here. Sub-blocks are compiled with `map`
    /// set, so each runs once per element of the list it receives. Errors
    /// from every line are collected; any error means no step is produced.
    pub fn compile_block(&self, block: &Block, map: bool) -> Result<StepRef, Vec<CompileError>> {
        let mut steps = Vec::new();
        let mut errors = Vec::new();

        for node in &block.nodes {
            let compiled = match node {
                Node::Line(line) if line.is_comment() => continue,
                Node::Line(line) => self.compile_line(line).map_err(|e| vec![e]),
                Node::Block(child) => self.compile_block(child, true),
            };
            match compiled {
                Ok(step) => steps.push(step),
                Err(mut errs) => errors.append(&mut errs),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let composed = pipe(steps);
        Ok(if map { map_each(composed) } else { composed })
    }

    /// Compile one line into the step its command's factory builds.
    pub fn compile_line(&self, line: &Line) -> Result<StepRef, CompileError> {
        let name = line.command();
        let entry = self.registry.get(name).ok_or_else(|| {
            CompileError::new(
                format!("unknown command '{}'", name),
                line.command_span(),
                self.source_id,
            )
            .with_note(format!(
                "available commands: {}",
                self.registry.names().join(", ")
            ))
        })?;

        let argument = line.argument().map(|raw| match entry.decoding {
            ArgumentDecoding::Raw => raw,
            ArgumentDecoding::Escaped => unescape(&raw),
        });
        debug!(command = name, argument = ?argument, "compiling line");

        entry
            .build(argument)
            .map_err(|e| CompileError::new(e.to_string(), line.span.clone(), self.source_id))
    }
}

/// Decode an argument as the body of a double-quoted string literal.
/// Malformed escapes leave the argument as written.
pub fn unescape(raw: &str) -> String {
    match serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        Ok(decoded) => decoded,
        Err(error) => {
            debug!(argument = raw, %error, "argument kept raw");
            raw.to_string()
        }
    }
}
