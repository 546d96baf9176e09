//! Built-in commands.
//!
//! Every command is a factory turning the line's argument into a step. A
//! factory rejects a bad argument up front, so the script fails to compile
//! rather than failing when the line runs.

mod data;
mod date;
mod extract;
mod text;

use crate::error::{CommandError, RuntimeError};
use crate::registry::{ArgumentDecoding, CommandRegistry};
use crate::runtime_value::RuntimeValue;

pub use data::{load, save};
pub use date::parse_date;
pub use extract::extract;
pub use text::{echo, join, split, template, trim};

pub fn register_builtins(registry: &mut CommandRegistry) {
    use ArgumentDecoding::{Escaped, Raw};

    registry
        .register("echo", Escaped, echo)
        .register("split", Escaped, split)
        .register("join", Escaped, join)
        .register("trim", Escaped, trim)
        .register("template", Escaped, template)
        .register("save", Escaped, save)
        .register("load", Escaped, load)
        .register("extract", Raw, extract)
        .register("parseDate", Escaped, parse_date);
}

fn require_argument(command: &str, argument: Option<String>) -> Result<String, CommandError> {
    argument.ok_or_else(|| CommandError::MissingArgument {
        command: command.to_string(),
    })
}

fn expect_string(command: &str, value: RuntimeValue) -> Result<String, RuntimeError> {
    match value {
        RuntimeValue::String(s) => Ok(s),
        other => Err(RuntimeError::type_error(command, "String", other.type_name())),
    }
}

fn expect_list(command: &str, value: RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match value {
        RuntimeValue::List(items) => Ok(items),
        other => Err(RuntimeError::type_error(command, "List", other.type_name())),
    }
}
