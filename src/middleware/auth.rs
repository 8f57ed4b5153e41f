use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::pipeline::CurrentUser;

/// JWT authentication middleware.
///
/// Inserts a [`CurrentUser`] into the request extensions. Requests without an
/// Authorization header continue as anonymous and are turned away by the
/// pipeline's authorization step; a header that is present but invalid is
/// rejected here with 401.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)? {
        Some(token) => {
            let claims = validate_jwt(&token, &state.config.security.jwt_secret).map_err(|e| {
                tracing::warn!("Rejected bearer token: {}", e);
                ApiError::unauthorized(e.to_string())
            })?;
            CurrentUser::from(claims)
        }
        None => CurrentUser::anonymous(),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header, if one was sent
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
