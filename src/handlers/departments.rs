use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::{invalid_json, invalid_path, AppState, Caller, Created};
use crate::database::models::Department;
use crate::features::departments::{CreateDepartment, GetDepartment, ListDepartments};
use crate::middleware::{respond, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/departments", get(department_list).post(department_create))
        .route("/api/departments/:id", get(department_get))
}

/// GET /api/departments
pub async fn department_list(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<Department>> {
    let result = state.dispatcher.send(ListDepartments, caller.context()).await;
    respond(result, StatusCode::OK)
}

/// POST /api/departments - admin only
pub async fn department_create(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateDepartment>, JsonRejection>,
) -> ApiResult<Created> {
    let Json(request) = body.map_err(invalid_json)?;
    let result = state.dispatcher.send(request, caller.context()).await;
    respond(result.map(|outcome| outcome.map(|id| Created { id })), StatusCode::CREATED)
}

/// GET /api/departments/:id
pub async fn department_get(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Department> {
    let Path(id) = id.map_err(invalid_path)?;
    let result = state.dispatcher.send(GetDepartment { id }, caller.context()).await;
    respond(result, StatusCode::OK)
}
