use kmd::parser::Parser;
use tracing::debug;

use crate::compiler::Compiler;
use crate::context::Context;
use crate::error::{RuntimeError, ScriptError};
use crate::registry::CommandRegistry;
use crate::runtime_value::RuntimeValue;
use crate::step::StepRef;

/// A compiled script, ready to run any number of times.
#[derive(Clone)]
pub struct Pipeline {
    root: StepRef,
}

impl Pipeline {
    pub fn new(root: StepRef) -> Self {
        Pipeline { root }
    }

    /// Run the pipeline once with the given initial input.
    pub async fn run(&self, input: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
        debug!(input = input.type_name(), "running pipeline");
        // The root pipe builds its own context; this one is never written.
        let mut ctx = Context::new();
        let result = self.root.call(&mut ctx, input).await;
        debug!(ok = result.is_ok(), "pipeline finished");
        result
    }
}

/// Parse and compile a script.
pub fn compile(source: &str, registry: &CommandRegistry) -> Result<Pipeline, ScriptError> {
    compile_with_id(source, 0, registry)
}

/// Parse and compile a script, tagging diagnostics with a codespan file ID.
pub fn compile_with_id(
    source: &str,
    file_id: usize,
    registry: &CommandRegistry,
) -> Result<Pipeline, ScriptError> {
    let script = Parser::new(source.to_string(), file_id)
        .parse()
        .map_err(ScriptError::Parse)?;
    let root = Compiler::new(registry, file_id)
        .compile_script(&script)
        .map_err(ScriptError::Compile)?;
    debug!(lines = script.line_count(), "compiled script");
    Ok(Pipeline::new(root))
}

/// Run a compiled pipeline once.
pub async fn run(pipeline: &Pipeline, input: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    pipeline.run(input).await
}

/// Compile a script and run it once.
pub async fn run_script(
    source: &str,
    registry: &CommandRegistry,
    input: RuntimeValue,
) -> Result<RuntimeValue, ScriptError> {
    let pipeline = compile(source, registry)?;
    Ok(pipeline.run(input).await?)
}
