pub mod combinator;
pub mod commands;
pub mod compiler;
pub mod context;
pub mod error;
pub mod executor;
pub mod registry;
pub mod runtime_value;
pub mod step;

pub use context::Context;
pub use error::{CommandError, CompileError, RuntimeError, ScriptError};
pub use executor::{Pipeline, compile, compile_with_id, run, run_script};
pub use registry::{ArgumentDecoding, CommandRegistry};
pub use runtime_value::RuntimeValue;
pub use step::{Step, StepRef, step_fn};
