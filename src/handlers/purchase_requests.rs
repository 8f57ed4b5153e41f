use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::{invalid_json, invalid_path, invalid_query, AppState, Caller, Created};
use crate::database::models::PurchaseRequest;
use crate::error::ApiError;
use crate::features::purchase_requests::{
    ApprovePurchaseRequest, CreatePurchaseRequest, GetPurchaseRequest, ListPurchaseRequests,
    RejectPurchaseRequest, SubmitPurchaseRequest, UpdatePurchaseRequest,
};
use crate::middleware::{respond, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/purchase-requests", get(request_list).post(request_create))
        .route("/api/purchase-requests/:id", get(request_get).put(request_update))
        .route("/api/purchase-requests/:id/submit", post(request_submit))
        .route("/api/purchase-requests/:id/approve", post(request_approve))
        .route("/api/purchase-requests/:id/reject", post(request_reject))
}

/// GET /api/purchase-requests?status=Pending&mine=true
pub async fn request_list(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ListPurchaseRequests>, QueryRejection>,
) -> ApiResult<Vec<PurchaseRequest>> {
    let Query(request) = query.map_err(invalid_query)?;
    let result = state.dispatcher.send(request, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// POST /api/purchase-requests - creates a draft owned by the caller
pub async fn request_create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreatePurchaseRequest>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(request) = body.map_err(invalid_json)?;
    let result = state.dispatcher.send(request, caller.context()).await;
    respond(result.map(|outcome| outcome.map(|id| Created { id })), StatusCode::CREATED)
}

/// GET /api/purchase-requests/:id
pub async fn request_get(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<PurchaseRequest> {
    let Path(id) = id.map_err(invalid_path)?;
    let result = state.dispatcher.send(GetPurchaseRequest { id }, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// PUT /api/purchase-requests/:id - drafts only
pub async fn request_update(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdatePurchaseRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let Json(request) = body.map_err(invalid_json)?;
    let result = state
        .dispatcher
        .send(UpdatePurchaseRequest { id, ..request }, caller.context())
        .await;
    respond(result, StatusCode::OK)
}

/// POST /api/purchase-requests/:id/submit
pub async fn request_submit(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let result = state.dispatcher.send(SubmitPurchaseRequest { id }, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// POST /api/purchase-requests/:id/approve - body `{ "note": "..." }` is optional
pub async fn request_approve(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let request: ApprovePurchaseRequest = if body.is_empty() {
        ApprovePurchaseRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request("Request.InvalidJson", e.to_string()))?
    };

    let result = state
        .dispatcher
        .send(ApprovePurchaseRequest { id, ..request }, caller.context())
        .await;
    respond(result, StatusCode::OK)
}

/// POST /api/purchase-requests/:id/reject - body `{ "reason": "..." }`
pub async fn request_reject(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<RejectPurchaseRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let Json(request) = body.map_err(invalid_json)?;
    let result = state
        .dispatcher
        .send(RejectPurchaseRequest { id, ..request }, caller.context())
        .await;
    respond(result, StatusCode::OK)
}
