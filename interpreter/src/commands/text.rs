use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::commands::{expect_list, expect_string, require_argument};
use crate::error::CommandError;
use crate::runtime_value::RuntimeValue;
use crate::step::{StepRef, step_fn};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is valid"));

/// `echo [text]`: yields its trimmed argument, ignoring the input.
pub fn echo(argument: Option<String>) -> Result<StepRef, CommandError> {
    let text = argument.map(|a| a.trim().to_string());
    Ok(step_fn(move |_ctx, _input| {
        Ok(match &text {
            Some(text) => RuntimeValue::String(text.clone()),
            None => RuntimeValue::Unit,
        })
    }))
}

/// `split [separator]`: splits a string into a list, on newlines by default.
pub fn split(argument: Option<String>) -> Result<StepRef, CommandError> {
    Ok(step_fn(move |_ctx, input| {
        let text = expect_string("split", input)?;
        let parts: Vec<RuntimeValue> = match &argument {
            Some(separator) => text.split(separator.as_str()).map(RuntimeValue::from).collect(),
            None => text
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .map(RuntimeValue::from)
                .collect(),
        };
        Ok(RuntimeValue::List(parts))
    }))
}

/// `join [separator]`: joins a list into one string, with newlines by default.
pub fn join(argument: Option<String>) -> Result<StepRef, CommandError> {
    let separator = argument.unwrap_or_else(|| "\n".to_string());
    Ok(step_fn(move |_ctx, input| {
        let items = expect_list("join", input)?;
        let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
        Ok(RuntimeValue::String(parts.join(&separator)))
    }))
}

/// `trim`: strips surrounding whitespace from a string.
pub fn trim(_argument: Option<String>) -> Result<StepRef, CommandError> {
    Ok(step_fn(|_ctx, input| {
        let text = expect_string("trim", input)?;
        Ok(RuntimeValue::String(text.trim().to_string()))
    }))
}

/// `template <text>`: fills `{key}` from the context and `{.}` with the input.
pub fn template(argument: Option<String>) -> Result<StepRef, CommandError> {
    let text = require_argument("template", argument)?;
    Ok(step_fn(move |ctx, input| {
        let filled = PLACEHOLDER.replace_all(&text, |caps: &Captures<'_>| match &caps[1] {
            "." => input.to_string(),
            key => ctx.get(key).map(|v| v.to_string()).unwrap_or_default(),
        });
        Ok(RuntimeValue::String(filled.into_owned()))
    }))
}
