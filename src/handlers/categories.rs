use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::{invalid_json, invalid_path, AppState, Caller, Created};
use crate::database::models::Category;
use crate::features::categories::{
    CreateCategory, DeleteCategory, GetCategory, ListCategories, UpdateCategory,
};
use crate::middleware::{respond, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(category_list).post(category_create))
        .route(
            "/api/categories/:id",
            get(category_get).put(category_update).delete(category_delete),
        )
}

/// GET /api/categories
pub async fn category_list(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<Category>> {
    let result = state.dispatcher.send(ListCategories, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// POST /api/categories - admin only
pub async fn category_create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateCategory>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(request) = body.map_err(invalid_json)?;
    let result = state.dispatcher.send(request, caller.context()).await;
    respond(result.map(|outcome| outcome.map(|id| Created { id })), StatusCode::CREATED)
}

/// GET /api/categories/:id
pub async fn category_get(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Category> {
    let Path(id) = id.map_err(invalid_path)?;
    let result = state.dispatcher.send(GetCategory { id }, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// PUT /api/categories/:id - the path id wins over any id in the body
pub async fn category_update(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateCategory>, JsonRejection>,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let Json(request) = body.map_err(invalid_json)?;
    let result = state
        .dispatcher
        .send(UpdateCategory { id, ..request }, caller.context())
        .await;
    respond(result, StatusCode::OK)
}

/// DELETE /api/categories/:id
pub async fn category_delete(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id.map_err(invalid_path)?;
    let result = state.dispatcher.send(DeleteCategory { id }, caller.context()).await;
    respond(result, StatusCode::OK)
}
