use axum::{extract::State, http::StatusCode, Json};
use domains::{Comment, RecipeComment};
use serde_json::Value;
use services::CommentInput;
use uuid::Uuid;

use super::message;
use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser, OptionalUser, PathParams};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    PathParams(recipe_id): PathParams<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(state.comments.list(recipe_id, viewer.as_ref()).await?))
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(recipe_id): PathParams<Uuid>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state.comments.add(&user, recipe_id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams((recipe_id, comment_id)): PathParams<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(state.comments.update(&user, recipe_id, comment_id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams((recipe_id, comment_id)): PathParams<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    state.comments.delete(&user, recipe_id, comment_id).await?;
    Ok(message("comment deleted"))
}

pub async fn by_email(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    PathParams(email): PathParams<String>,
) -> ApiResult<Json<Vec<RecipeComment>>> {
    Ok(Json(state.comments.by_email(&email).await?))
}
