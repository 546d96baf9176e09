use crate::commands::require_argument;
use crate::error::CommandError;
use crate::step::{StepRef, step_fn};

/// `save <key>`: stores the input in the context and passes it on.
pub fn save(argument: Option<String>) -> Result<StepRef, CommandError> {
    let key = require_argument("save", argument)?;
    Ok(step_fn(move |ctx, input| {
        ctx.insert(key.clone(), input.clone());
        Ok(input)
    }))
}

/// `load <key>`: yields a previously saved value, or Unit.
pub fn load(argument: Option<String>) -> Result<StepRef, CommandError> {
    let key = require_argument("load", argument)?;
    Ok(step_fn(move |ctx, _input| Ok(ctx.get(&key).cloned().into())))
}
