use axum::{extract::State, http::StatusCode, Json};
use domains::Report;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser, PathParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct NewReportBody {
    #[serde(alias = "recipeId")]
    pub recipe_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

pub async fn report_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(recipe_id): PathParams<Uuid>,
    ApiJson(body): ApiJson<ReasonBody>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.reports.create(&user, recipe_id, &body.reason).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(body): ApiJson<NewReportBody>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state.reports.create(&user, body.recipe_id, &body.reason).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn mine(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<Vec<Report>>> {
    Ok(Json(state.reports.mine(&user).await?))
}
