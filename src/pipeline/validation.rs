// Structural validation, runs after authorization and before the handler
use async_trait::async_trait;
use std::sync::Arc;

use crate::pipeline::context::DispatchContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::outcome::{Error, Outcome, ValidationErrors};
use crate::pipeline::request::{Handler, Request};

/// Field-level rules for one request type
pub trait Validator<R>: Send + Sync {
    fn validate(&self, request: &R, errors: &mut FieldErrors);
}

/// Collects messages per field while a validator runs
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: ValidationErrors,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    /// Record `message` against `field` unless `condition` holds
    pub fn ensure(&mut self, condition: bool, field: &str, message: impl Into<String>) {
        if !condition {
            self.add(field, message);
        }
    }

    /// Non-blank with a character limit
    pub fn required_text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.add(field, format!("'{}' must not be empty.", field));
        } else if value.chars().count() > max_len {
            self.add(field, format!("'{}' must be {} characters or fewer.", field, max_len));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value {
            if value.chars().count() > max_len {
                self.add(field, format!("'{}' must be {} characters or fewer.", field, max_len));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_inner(self) -> ValidationErrors {
        self.errors
    }
}

/// Wraps a handler with the optional validator registered for `R`.
/// No validator means the request is always structurally valid.
pub struct ValidationBehavior<R: Request> {
    validator: Option<Arc<dyn Validator<R>>>,
    inner: Arc<dyn Handler<R>>,
}

impl<R: Request> ValidationBehavior<R> {
    pub fn new(inner: Arc<dyn Handler<R>>, validator: Option<Arc<dyn Validator<R>>>) -> Self {
        Self { validator, inner }
    }

    fn check(&self, request: &R) -> Outcome {
        let Some(validator) = &self.validator else {
            return Ok(());
        };

        let mut errors = FieldErrors::new();
        validator.validate(request, &mut errors);
        if errors.is_empty() {
            return Ok(());
        }

        Err(Error::validation(
            "Request.Invalid",
            "One or more validation errors occurred.",
            errors.into_inner(),
        ))
    }
}

#[async_trait]
impl<R: Request> Handler<R> for ValidationBehavior<R> {
    async fn handle(&self, request: R, ctx: &DispatchContext) -> Result<Outcome<R::Response>, PipelineError> {
        if let Err(error) = self.check(&request) {
            tracing::debug!(
                "Validation failed for {}: fields={:?}",
                R::type_name(),
                error.validation_errors.as_ref().map(|e| e.keys().collect::<Vec<_>>())
            );
            return Ok(Err(error));
        }

        self.inner.handle(request, ctx).await
    }
}
