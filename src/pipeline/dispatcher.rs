// Request dispatch over a registry frozen at startup
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::authorization::AuthorizationBehavior;
use crate::pipeline::context::DispatchContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::outcome::Outcome;
use crate::pipeline::request::{Handler, Request};
use crate::pipeline::validation::{ValidationBehavior, Validator};

/// Type-erased pipeline. Always holds an `Arc<dyn Handler<R>>` for the `R`
/// whose `TypeId` keys it.
struct RegisteredPipeline {
    request: &'static str,
    pipeline: Box<dyn Any + Send + Sync>,
}

/// Startup-time registration of request handlers.
///
/// Each handler is wrapped Authorization -> Validation -> Handler when it is
/// registered. Registration is the only place pipelines are constructed; the
/// resulting [`Dispatcher`] never resolves anything at runtime.
#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<TypeId, RegisteredPipeline>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a request type that has no validator
    pub fn register<R, H>(self, handler: H) -> Result<Self, PipelineError>
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        self.insert::<R>(Arc::new(handler), None)
    }

    /// Register a handler together with the validator for its request type
    pub fn register_validated<R, H, V>(self, handler: H, validator: V) -> Result<Self, PipelineError>
    where
        R: Request,
        H: Handler<R> + 'static,
        V: Validator<R> + 'static,
    {
        self.insert::<R>(Arc::new(handler), Some(Arc::new(validator)))
    }

    fn insert<R: Request>(
        mut self,
        handler: Arc<dyn Handler<R>>,
        validator: Option<Arc<dyn Validator<R>>>,
    ) -> Result<Self, PipelineError> {
        let key = TypeId::of::<R>();
        if self.pipelines.contains_key(&key) {
            return Err(PipelineError::DuplicateHandler {
                request: R::type_name(),
            });
        }

        let validated: Arc<dyn Handler<R>> = Arc::new(ValidationBehavior::new(handler, validator));
        let authorized: Arc<dyn Handler<R>> = Arc::new(AuthorizationBehavior::new(validated)?);

        self.pipelines.insert(
            key,
            RegisteredPipeline {
                request: R::type_name(),
                pipeline: Box::new(authorized),
            },
        );

        tracing::debug!("Registered pipeline for request {}", R::type_name());
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Freeze the registry. No registration is possible afterwards.
    pub fn build(self) -> Dispatcher {
        let mut requests: Vec<&'static str> = self.pipelines.values().map(|p| p.request).collect();
        requests.sort_unstable();
        tracing::info!("Dispatcher ready with {} pipelines: {:?}", requests.len(), requests);

        Dispatcher {
            pipelines: Arc::new(self.pipelines),
        }
    }
}

/// Sends requests to their registered pipeline.
///
/// Cheap to clone; all clones share one read-only table, so concurrent
/// dispatch needs no locking.
#[derive(Clone)]
pub struct Dispatcher {
    pipelines: Arc<HashMap<TypeId, RegisteredPipeline>>,
}

impl Dispatcher {
    /// Dispatch `request` through its decorated handler chain.
    ///
    /// Returns `PipelineError::HandlerNotFound` when `R` was never
    /// registered; any other error comes from inside the pipeline unchanged.
    pub async fn send<R: Request>(
        &self,
        request: R,
        ctx: &DispatchContext,
    ) -> Result<Outcome<R::Response>, PipelineError> {
        let pipeline = self.pipeline::<R>()?;

        let start = Instant::now();
        let result = pipeline.handle(request, ctx).await;

        match &result {
            Ok(Ok(_)) => tracing::debug!("{} succeeded in {:?}", R::type_name(), start.elapsed()),
            Ok(Err(error)) => tracing::debug!(
                "{} failed in {:?}: {}",
                R::type_name(),
                start.elapsed(),
                error
            ),
            Err(error) => tracing::error!(
                "{} aborted in {:?}: {}",
                R::type_name(),
                start.elapsed(),
                error
            ),
        }

        result
    }

    fn pipeline<R: Request>(&self) -> Result<&Arc<dyn Handler<R>>, PipelineError> {
        self.pipelines
            .get(&TypeId::of::<R>())
            .and_then(|registered| registered.pipeline.downcast_ref::<Arc<dyn Handler<R>>>())
            .ok_or(PipelineError::HandlerNotFound {
                request: R::type_name(),
            })
    }

    pub fn is_registered<R: Request>(&self) -> bool {
        self.pipelines.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
