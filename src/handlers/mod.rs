// handlers/mod.rs - HTTP adapter over the request dispatcher
//
// Every route authenticates through the JWT middleware, turns the HTTP call
// into a pipeline request and sends it through the shared Dispatcher. Access
// rules live on the request types, not on the routes.

pub mod categories;
pub mod departments;
pub mod purchase_requests;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, FromRequestParts, State,
    },
    http::{request::Parts, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::jwt_auth_middleware;
use crate::pipeline::{CurrentUser, DispatchContext, Dispatcher};

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub config: Arc<AppConfig>,
    /// Present when running against Postgres
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, config: AppConfig, pool: Option<PgPool>) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
            pool,
        }
    }
}

/// Dispatch context for one HTTP call.
///
/// axum drops the handler future when the client goes away; dropping the
/// caller then cancels whatever the pipeline is still awaiting.
pub struct Caller {
    ctx: DispatchContext,
}

impl Caller {
    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }
}

impl Drop for Caller {
    fn drop(&mut self) {
        self.ctx.cancellation.cancel();
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_else(CurrentUser::anonymous);

        Ok(Self {
            ctx: DispatchContext::for_user(user),
        })
    }
}

/// Body of a 201 response
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: Uuid,
}

pub(crate) fn invalid_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Request.InvalidJson", rejection.body_text())
}

pub(crate) fn invalid_path(rejection: PathRejection) -> ApiError {
    ApiError::bad_request("Request.InvalidPath", rejection.body_text())
}

pub(crate) fn invalid_query(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request("Request.InvalidQuery", rejection.body_text())
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(categories::routes())
        .merge(departments::routes())
        .merge(purchase_requests::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /health - liveness plus database connectivity when one is configured
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let database = match &state.pool {
        Some(pool) => DatabaseManager::health_check(pool).await.map(|_| "ok"),
        None => Ok("memory"),
    };

    match database {
        Ok(database) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": database,
                    "handlers": state.dispatcher.len(),
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
