use axum::{body::Bytes, extract::State, Json};
use domains::{DomainError, Page, Recipe, RecipeStatus, Report, ResolutionStatus, Review, Role, UserQuery, UserSummary};
use serde::Deserialize;
use serde_json::Value;
use services::Overview;
use uuid::Uuid;

use super::{message, parse_status, PageParams};
use crate::error::ApiResult;
use crate::extract::{AdminUser, ApiJson, ApiQuery, PathParams};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub q: Option<String>,
    pub role: Option<String>,
    pub suspended: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserListParams {
    pub fn into_query(self) -> Result<UserQuery, DomainError> {
        Ok(UserQuery {
            q: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            role: parse_status::<Role>(self.role.as_deref())?,
            suspended: self.suspended,
            page: PageParams { page: self.page, limit: self.limit }.request(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SuspendBody {
    pub suspended: Option<bool>,
}

/// `{ "role": "admin" }`, or the `{ "admin": true }` shorthand.
#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Option<String>,
    pub admin: Option<bool>,
}

impl RoleBody {
    fn role(&self) -> Result<Role, DomainError> {
        match (self.role.as_deref(), self.admin) {
            (Some(role), _) => role.parse(),
            (None, Some(true)) => Ok(Role::Admin),
            (None, Some(false)) => Ok(Role::User),
            (None, None) => Err(DomainError::validation("role is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    #[serde(default)]
    pub password: String,
}

/// An absent or empty body means "toggle".
fn suspend_flag(body: &[u8]) -> Result<Option<bool>, DomainError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<SuspendBody>(body)
        .map(|b| b.suspended)
        .map_err(|err| DomainError::validation(format!("invalid body: {err}")))
}

fn required_status<T>(body: &StatusBody) -> Result<T, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    body.status.parse()
}

pub async fn overview(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> ApiResult<Json<Overview>> {
    Ok(Json(state.admin.overview().await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> ApiResult<Json<Page<UserSummary>>> {
    Ok(Json(state.admin.list_users(&params.into_query()?).await?))
}

pub async fn suspend_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    body: Bytes,
) -> ApiResult<Json<UserSummary>> {
    let flag = suspend_flag(&body)?;
    Ok(Json(state.admin.set_suspended(id, flag).await?))
}

pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<Json<UserSummary>> {
    Ok(Json(state.admin.set_role(&admin, id, body.role()?).await?))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(body): ApiJson<PasswordBody>,
) -> ApiResult<Json<UserSummary>> {
    Ok(Json(state.admin.reset_password(id, &body.password).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    state.admin.delete_user(id).await?;
    Ok(message("user deleted"))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(params): ApiQuery<StatusParams>,
) -> ApiResult<Json<Page<Recipe>>> {
    let status = parse_status::<RecipeStatus>(params.status.as_deref())?;
    let page = PageParams { page: params.page, limit: params.limit }.request();
    Ok(Json(state.recipes.list_all(status, page).await?))
}

pub async fn set_recipe_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Recipe>> {
    let status = required_status::<RecipeStatus>(&body)?;
    Ok(Json(state.recipes.set_status(&admin, id, status).await?))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    state.recipes.delete(&admin, id).await?;
    Ok(message("recipe deleted"))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(params): ApiQuery<StatusParams>,
) -> ApiResult<Json<Vec<Review>>> {
    let status = parse_status::<ResolutionStatus>(params.status.as_deref())?;
    Ok(Json(state.reviews.list_all(status).await?))
}

pub async fn set_review_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Review>> {
    let status = required_status::<ResolutionStatus>(&body)?;
    Ok(Json(state.reviews.set_status(id, status).await?))
}

pub async fn list_reports(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(params): ApiQuery<StatusParams>,
) -> ApiResult<Json<Vec<Report>>> {
    let status = parse_status::<ResolutionStatus>(params.status.as_deref())?;
    Ok(Json(state.reports.list(status).await?))
}

pub async fn set_report_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Report>> {
    let status = required_status::<ResolutionStatus>(&body)?;
    Ok(Json(state.reports.set_status(id, status).await?))
}
