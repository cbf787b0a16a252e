use crate::call::Call;
use crate::response::CallResponse;
use async_trait::async_trait;
use std::sync::Arc;

/// Executes one sub-request against the live route table.
///
/// The implementation runs the call in the caller-supplied context, with
/// the same backend scoping and role checks a direct top-level request
/// would get. Expected HTTP-level failures (400, 401, 403, 404, 405, 409, ...)
/// MUST come back as `Ok` responses carrying that status; `Err` is reserved
/// for faults the router did not anticipate, which the dispatcher maps to a
/// generic 500 in that call's slot.
#[async_trait]
pub trait CallRouter: Send + Sync {
    /// The ambient credential context threaded into every sub-request.
    type Context: Send + Sync;

    /// Unexpected internal faults only.
    type Error: std::error::Error + Send + Sync;

    async fn execute(&self, call: &Call, ctx: &Self::Context)
    -> Result<CallResponse, Self::Error>;
}

#[async_trait]
impl<R: CallRouter> CallRouter for Arc<R> {
    type Context = R::Context;
    type Error = R::Error;

    async fn execute(
        &self,
        call: &Call,
        ctx: &Self::Context,
    ) -> Result<CallResponse, Self::Error> {
        (**self).execute(call, ctx).await
    }
}

#[async_trait]
impl<'a, R: CallRouter> CallRouter for &'a R {
    type Context = R::Context;
    type Error = R::Error;

    async fn execute(
        &self,
        call: &Call,
        ctx: &Self::Context,
    ) -> Result<CallResponse, Self::Error> {
        (**self).execute(call, ctx).await
    }
}
