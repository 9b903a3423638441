use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use domains::User;
use serde_json::Value;
use services::{
    AuthSession, ForgotPasswordInput, LoginInput, PasswordReset, RegisterInput, ResetGrant, SecurityAnswerInput,
    SecurityChallenge,
};

use super::message;
use crate::error::ApiResult;
use crate::extract::{bearer_token, ApiJson, AuthUser};
use crate::state::AppState;

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    let session = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn signin(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<AuthSession>> {
    Ok(Json(state.auth.login(input).await?))
}

pub async fn admin_signin(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<AuthSession>> {
    Ok(Json(state.auth.admin_login(input).await?))
}

/// Always succeeds for the client; unusable tokens are simply dropped.
pub async fn signout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    state.auth.logout(bearer_token(&headers)).await?;
    Ok(message("signed out"))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ForgotPasswordInput>,
) -> ApiResult<Json<SecurityChallenge>> {
    Ok(Json(state.auth.forgot_password(input).await?))
}

pub async fn verify_security_answer(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SecurityAnswerInput>,
) -> ApiResult<Json<ResetGrant>> {
    Ok(Json(state.auth.verify_security_answer(input).await?))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<PasswordReset>,
) -> ApiResult<Json<Value>> {
    state.auth.reset_password(input).await?;
    Ok(message("password reset"))
}
