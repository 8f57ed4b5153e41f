// Role-based gate, outermost layer of every pipeline
use async_trait::async_trait;
use std::sync::Arc;

use crate::pipeline::context::{CurrentUser, DispatchContext};
use crate::pipeline::error::PipelineError;
use crate::pipeline::outcome::{Error, Outcome};
use crate::pipeline::request::{Handler, Request};

/// Roles allowed to invoke a request type. An empty set admits any
/// authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    roles: &'static [&'static str],
}

impl Authorization {
    pub const fn authenticated() -> Self {
        Self { roles: &[] }
    }

    pub const fn roles(roles: &'static [&'static str]) -> Self {
        Self { roles }
    }

    pub fn required_roles(&self) -> &'static [&'static str] {
        self.roles
    }

    /// Check a caller against this policy
    pub fn evaluate(&self, user: &CurrentUser) -> Outcome {
        if !user.is_authenticated() {
            return Err(Error::unauthenticated());
        }
        if self.roles.is_empty() || self.roles.iter().any(|role| user.is_in_role(role)) {
            Ok(())
        } else {
            Err(Error::forbidden(self.roles))
        }
    }
}

/// Wraps a handler with the authorization policy declared by `R`
pub struct AuthorizationBehavior<R: Request> {
    policy: Authorization,
    inner: Arc<dyn Handler<R>>,
}

impl<R: Request> AuthorizationBehavior<R> {
    /// Reads the request type's policy once. Fails when `R` declares none.
    pub fn new(inner: Arc<dyn Handler<R>>) -> Result<Self, PipelineError> {
        let policy = R::AUTHORIZATION.ok_or(PipelineError::MissingAuthorizationMetadata {
            request: R::type_name(),
        })?;
        Ok(Self { policy, inner })
    }

    pub fn policy(&self) -> Authorization {
        self.policy
    }
}

#[async_trait]
impl<R: Request> Handler<R> for AuthorizationBehavior<R> {
    async fn handle(&self, request: R, ctx: &DispatchContext) -> Result<Outcome<R::Response>, PipelineError> {
        let user = ctx.cancellation.run(ctx.user.current_user()).await?;

        if let Err(error) = self.policy.evaluate(&user) {
            tracing::warn!(
                "Authorization denied for {}: user={:?} code={}",
                R::type_name(),
                user.name,
                error.code
            );
            return Ok(Err(error));
        }

        self.inner.handle(request, ctx).await
    }
}
