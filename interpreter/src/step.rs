use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;

/// One unit of pipeline work.
///
/// A step receives the context of the pipe it runs in and the previous
/// step's output, and produces the next value.
#[async_trait]
pub trait Step: Send + Sync {
    async fn call(&self, ctx: &mut Context, input: RuntimeValue)
    -> Result<RuntimeValue, RuntimeError>;
}

pub type StepRef = Arc<dyn Step>;

/// A step backed by a synchronous closure.
pub struct FnStep<F>(F);

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&mut Context, RuntimeValue) -> Result<RuntimeValue, RuntimeError> + Send + Sync,
{
    async fn call(
        &self,
        ctx: &mut Context,
        input: RuntimeValue,
    ) -> Result<RuntimeValue, RuntimeError> {
        (self.0)(ctx, input)
    }
}

/// Wrap a synchronous closure as a step.
pub fn step_fn<F>(f: F) -> StepRef
where
    F: Fn(&mut Context, RuntimeValue) -> Result<RuntimeValue, RuntimeError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnStep(f))
}
