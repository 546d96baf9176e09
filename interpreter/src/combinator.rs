use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::trace;

use crate::context::Context;
use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;
use crate::step::{Step, StepRef};

/// Runs steps strictly in sequence, each receiving the previous output.
///
/// Every invocation gets a fresh context shared by all of its steps; the
/// caller's context is not visible inside. If any step wrote into the
/// context, the context is the result instead of the last step's output.
pub struct Pipe {
    steps: Vec<StepRef>,
}

impl Pipe {
    pub fn new(steps: Vec<StepRef>) -> Self {
        Pipe { steps }
    }
}

#[async_trait]
impl Step for Pipe {
    async fn call(
        &self,
        _ctx: &mut Context,
        input: RuntimeValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        let mut ctx = Context::new();
        let mut value = input;

        for (index, step) in self.steps.iter().enumerate() {
            trace!(step = index, input = value.type_name(), "running pipe step");
            value = step.call(&mut ctx, value).await?;
        }

        if ctx.is_empty() {
            Ok(value)
        } else {
            trace!(keys = ctx.len(), "pipe returns its context");
            Ok(ctx.into_value())
        }
    }
}

/// Applies a step to every element of a list input, concurrently.
///
/// Results keep the input order. The first failing element aborts the
/// remaining ones and its error is returned as is.
pub struct MapEach {
    step: StepRef,
}

impl MapEach {
    pub fn new(step: StepRef) -> Self {
        MapEach { step }
    }
}

#[async_trait]
impl Step for MapEach {
    async fn call(
        &self,
        _ctx: &mut Context,
        input: RuntimeValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        let items = match input {
            RuntimeValue::List(items) => items,
            other => {
                return Err(RuntimeError::ExpectedList {
                    got: other.type_name().to_string(),
                });
            }
        };

        let mut results: Vec<Option<RuntimeValue>> = vec![None; items.len()];
        // Dropping the set on an early return aborts the branches still running.
        let mut branches = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let step = Arc::clone(&self.step);
            branches.spawn(async move {
                let mut ctx = Context::new();
                (index, step.call(&mut ctx, item).await)
            });
        }

        while let Some(joined) = branches.join_next().await {
            let (index, result) = joined.map_err(|e| RuntimeError::Task(e.to_string()))?;
            trace!(branch = index, ok = result.is_ok(), "map branch finished");
            results[index] = Some(result?);
        }

        Ok(RuntimeValue::List(results.into_iter().flatten().collect()))
    }
}

/// Compose steps into one sequential step.
pub fn pipe(steps: Vec<StepRef>) -> StepRef {
    Arc::new(Pipe::new(steps))
}

/// Lift a step to run element-wise over a list.
pub fn map_each(step: StepRef) -> StepRef {
    Arc::new(MapEach::new(step))
}
