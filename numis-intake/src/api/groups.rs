//! Group API handlers
//!
//! GET/POST /api/groups, PUT/DELETE /api/groups/:id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{error::ApiResult, models::Group, AppState};

/// POST /api/groups and PUT /api/groups/:id request
#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(state.service.list_groups().await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(request): Json<GroupRequest>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let group = state
        .service
        .create_group(&request.name, &request.description)
        .await?;
    tracing::info!(group_id = group.id, name = %group.name, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<GroupRequest>,
) -> ApiResult<Json<Group>> {
    Ok(Json(
        state
            .service
            .update_group(id, &request.name, &request.description)
            .await?,
    ))
}

pub async fn delete_group(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.service.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build group routes
pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/:id", put(update_group).delete(delete_group))
}
