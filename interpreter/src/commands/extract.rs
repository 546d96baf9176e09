use regex::Regex;

use crate::commands::{expect_string, require_argument};
use crate::error::CommandError;
use crate::runtime_value::RuntimeValue;
use crate::step::{StepRef, step_fn};

/// `extract <regex>`: pulls the first match out of a string.
///
/// No match yields Unit. Named groups yield a map keyed by group name, a
/// single unnamed group yields its text, several unnamed groups yield a list,
/// and a pattern without groups yields the whole match. Groups that did not
/// participate in the match are Unit.
pub fn extract(argument: Option<String>) -> Result<StepRef, CommandError> {
    let source = require_argument("extract", argument)?;
    let regex = Regex::new(&source).map_err(|e| CommandError::InvalidArgument {
        command: "extract".to_string(),
        message: e.to_string(),
    })?;
    let names: Vec<String> = regex.capture_names().flatten().map(String::from).collect();

    Ok(step_fn(move |_ctx, input| {
        let text = expect_string("extract", input)?;
        let Some(caps) = regex.captures(&text) else {
            return Ok(RuntimeValue::Unit);
        };

        let group = |m: Option<regex::Match<'_>>| match m {
            Some(m) => RuntimeValue::from(m.as_str()),
            None => RuntimeValue::Unit,
        };

        let value = if !names.is_empty() {
            RuntimeValue::map(names.iter().map(|name| (name.clone(), group(caps.name(name)))))
        } else {
            match caps.len() {
                1 => group(caps.get(0)),
                2 => group(caps.get(1)),
                n => RuntimeValue::List((1..n).map(|i| group(caps.get(i))).collect()),
            }
        };
        Ok(value)
    }))
}
