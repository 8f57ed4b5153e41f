use async_trait::async_trait;

use crate::pipeline::authorization::Authorization;
use crate::pipeline::context::DispatchContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::outcome::Outcome;

/// A unit of work dispatched through the pipeline.
///
/// The concrete type is the request's identity: exactly one handler may be
/// registered for it. `Response` is the success value carried by the
/// `Outcome` the handler returns.
///
/// Every request must set `AUTHORIZATION`; the default `None` is rejected
/// when the handler is registered.
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;

    const AUTHORIZATION: Option<Authorization> = None;

    /// Short type name used in logs and configuration errors
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Business logic bound to one request type.
///
/// The outer `Result` is reserved for fatal errors (cancellation, unmapped
/// store errors); expected failures are returned as `Ok(Err(..))`.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R, ctx: &DispatchContext) -> Result<Outcome<R::Response>, PipelineError>;
}
