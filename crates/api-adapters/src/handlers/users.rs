use axum::{extract::State, Json};
use domains::{Recipe, User};
use serde_json::Value;
use services::{PasswordChange, ProfileUpdate, SecurityQuestionUpdate};

use super::message;
use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

pub async fn profile(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.users.profile(&user).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.update_profile(&user, update).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(change): ApiJson<PasswordChange>,
) -> ApiResult<Json<Value>> {
    state.users.change_password(&user, change).await?;
    Ok(message("password updated"))
}

pub async fn set_security_question(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(update): ApiJson<SecurityQuestionUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.set_security_question(&user, update).await?))
}

pub async fn delete_account(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Value>> {
    state.users.delete_account(&user).await?;
    Ok(message("account deleted"))
}

pub async fn bookmarks(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.users.bookmarks(&user).await?))
}
