use axum::{extract::State, http::StatusCode, Json};
use domains::{NewNotification, Notification};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::message;
use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiJson, ApiQuery, AuthUser, PathParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, alias = "unreadOnly")]
    pub unread_only: bool,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.notifications.list(&user, params.unread_only).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(input): ApiJson<NewNotification>,
) -> ApiResult<(StatusCode, Json<Notification>)> {
    let notification = state.notifications.create(input).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn unread_count(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let count = state.notifications.unread_count(&user).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(state.notifications.mark_read(&user, id).await?))
}

pub async fn mark_all_read(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let updated = state.notifications.mark_all_read(&user).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    state.notifications.delete(&user, id).await?;
    Ok(message("notification deleted"))
}

pub async fn clear_all(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    let deleted = state.notifications.clear_all(&user).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
