use axum::{extract::State, http::StatusCode, Json};
use domains::Review;
use serde_json::Value;
use services::ReviewInput;
use uuid::Uuid;

use super::message;
use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser, OptionalUser, PathParams};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    PathParams(recipe_id): PathParams<Uuid>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_reviews(recipe_id, viewer.as_ref()).await?))
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(recipe_id): PathParams<Uuid>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = state.reviews.add_review(&user, recipe_id, input).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(input): ApiJson<ReviewInput>,
) -> ApiResult<Json<Review>> {
    Ok(Json(state.reviews.update_review(&user, id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    state.reviews.delete_review(&user, id).await?;
    Ok(message("review deleted"))
}
