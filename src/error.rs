// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::pipeline::{self, ErrorType, PipelineError, ValidationErrors};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { code: String, message: String },
    ValidationError {
        code: String,
        message: String,
        field_errors: ValidationErrors,
    },

    // 401 Unauthorized
    Unauthorized { code: String, message: String },

    // 403 Forbidden
    Forbidden {
        code: String,
        message: String,
        required_roles: Vec<String>,
    },

    // 404 Not Found
    NotFound {
        code: String,
        message: String,
        field_errors: Option<ValidationErrors>,
    },

    // 409 Conflict
    Conflict {
        code: String,
        message: String,
        field_errors: Option<ValidationErrors>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            other => other.error_type().status_code(),
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. }
            | ApiError::ValidationError { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::NotFound { message, .. }
            | ApiError::Conflict { message, .. } => message,
            ApiError::InternalServerError(msg) | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::ValidationError { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. } => code,
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Kind of failure as reported to clients
    pub fn error_type(&self) -> ErrorType {
        match self {
            ApiError::BadRequest { .. } | ApiError::ValidationError { .. } => ErrorType::Validation,
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. } => ErrorType::Unauthorized,
            ApiError::NotFound { .. } => ErrorType::NotFound,
            ApiError::Conflict { .. } => ErrorType::Conflict,
            ApiError::InternalServerError(_) | ApiError::ServiceUnavailable(_) => ErrorType::Failure,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": self.error_type().as_str(),
            "code": self.error_code(),
            "message": self.message(),
        });

        match self {
            ApiError::ValidationError { field_errors, .. } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::NotFound {
                field_errors: Some(field_errors),
                ..
            }
            | ApiError::Conflict {
                field_errors: Some(field_errors),
                ..
            } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::Forbidden { required_roles, .. } => {
                response["required_roles"] = json!(required_roles);
            }
            _ => {}
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code: pipeline::Error::UNAUTHENTICATED.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code: code.into(),
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Business failures carry their own code and type
impl From<pipeline::Error> for ApiError {
    fn from(err: pipeline::Error) -> Self {
        match err.error_type {
            ErrorType::Validation => ApiError::ValidationError {
                code: err.code,
                message: err.message,
                field_errors: err.validation_errors.unwrap_or_default(),
            },
            ErrorType::NotFound => ApiError::NotFound {
                code: err.code,
                message: err.message,
                field_errors: err.validation_errors,
            },
            ErrorType::Conflict => ApiError::Conflict {
                code: err.code,
                message: err.message,
                field_errors: err.validation_errors,
            },
            ErrorType::Unauthorized if err.is_unauthenticated() => ApiError::Unauthorized {
                code: err.code,
                message: err.message,
            },
            ErrorType::Unauthorized => ApiError::Forbidden {
                code: err.code,
                message: err.message,
                required_roles: err.required_roles,
            },
            ErrorType::Failure => {
                tracing::error!("Request failed: {} ({})", err.message, err.code);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Anything that aborted the pipeline is not the client's fault
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Cancelled => {
                tracing::debug!("Request cancelled before completion");
                ApiError::service_unavailable("Request was cancelled")
            }
            PipelineError::Store(store_err) => {
                // Log the real error but return generic message
                tracing::error!("Store error: {}", store_err);
                ApiError::internal_server_error("Database error occurred")
            }
            other => {
                tracing::error!("Pipeline configuration error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
