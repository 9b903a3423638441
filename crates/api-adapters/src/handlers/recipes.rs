use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use domains::{Category, Chef, DomainError, Page, Recipe, RecipePatch, RecipeQuery};
use serde::Deserialize;
use serde_json::{json, Value};
use services::ImageContent;
use uuid::Uuid;

use super::{csv, message, PageParams};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, AuthUser, OptionalUser, PathParams};
use crate::multipart::read_recipe_form;
use crate::state::AppState;

/// Query string of `GET /api/recipes`. Snake and camel case are both accepted.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub q: Option<String>,
    pub ingredients: Option<String>,
    pub tags: Option<String>,
    #[serde(alias = "dietaryTags")]
    pub dietary_tags: Option<String>,
    #[serde(alias = "mealType")]
    pub meal_type: Option<String>,
    #[serde(alias = "cuisineType")]
    pub cuisine_type: Option<String>,
    pub difficulty: Option<String>,
    #[serde(alias = "maxPrepTime")]
    pub max_prep_time: Option<u32>,
    #[serde(alias = "maxCookTime")]
    pub max_cook_time: Option<u32>,
    #[serde(alias = "minRating")]
    pub min_rating: Option<f64>,
    pub author: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl RecipeListParams {
    pub fn into_query(self) -> Result<RecipeQuery, DomainError> {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(RecipeQuery {
            ingredients: csv(self.ingredients.as_deref()),
            tags: csv(self.tags.as_deref()),
            dietary_tags: csv(self.dietary_tags.as_deref()),
            meal_type: csv(self.meal_type.as_deref()),
            difficulty: text(self.difficulty).map(|d| d.parse()).transpose()?,
            sort: text(self.sort).map(|s| s.parse()).transpose()?.unwrap_or_default(),
            order: text(self.order).map(|o| o.parse()).transpose()?.unwrap_or_default(),
            q: text(self.q),
            cuisine_type: text(self.cuisine_type),
            author: text(self.author),
            max_prep_time: self.max_prep_time,
            max_cook_time: self.max_cook_time,
            min_rating: self.min_rating,
            page: PageParams { page: self.page, limit: self.limit }.request(),
            ..RecipeQuery::approved()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct QuickSearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    pub q: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RecipeListParams>,
) -> ApiResult<Json<Page<Recipe>>> {
    Ok(Json(state.recipes.list(params.into_query()?).await?))
}

pub async fn quick_search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<QuickSearchParams>,
) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.recipes.quick_search(&params.q).await?))
}

pub async fn by_ingredient(
    State(state): State<AppState>,
    PathParams(ingredient): PathParams<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Recipe>>> {
    Ok(Json(state.recipes.search_by_ingredient(&ingredient, params.request()).await?))
}

pub async fn featured(State(state): State<AppState>) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.recipes.featured().await?))
}

pub async fn popular(State(state): State<AppState>) -> ApiResult<Json<Vec<Recipe>>> {
    Ok(Json(state.recipes.popular().await?))
}

pub async fn categories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CategoryParams>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.recipes.categories(params.q.as_deref()).await?))
}

pub async fn popular_chefs(State(state): State<AppState>) -> ApiResult<Json<Vec<Chef>>> {
    Ok(Json(state.recipes.popular_chefs().await?))
}

pub async fn mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Recipe>>> {
    Ok(Json(state.recipes.mine(&user, params.request()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Recipe>)> {
    let form = read_recipe_form(multipart).await?;
    let recipe = state.recipes.create(&user, form.draft, form.image).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn get(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Recipe>> {
    Ok(Json(state.recipes.view(id, viewer.as_ref()).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
    ApiJson(patch): ApiJson<RecipePatch>,
) -> ApiResult<Json<Recipe>> {
    Ok(Json(state.recipes.update(&user, id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    state.recipes.delete(&user, id).await?;
    Ok(message("recipe deleted"))
}

/// Serves the stored picture, or redirects to a remote one.
pub async fn image(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Response> {
    let response = match state.recipes.image(id, viewer.as_ref()).await? {
        ImageContent::Remote(url) => Redirect::temporary(&url).into_response(),
        ImageContent::Stored(media) => (
            [
                (header::CONTENT_TYPE, media.content_type),
                (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
            ],
            media.data,
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn replace_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<Recipe>> {
    let image = read_recipe_form(multipart)
        .await?
        .image
        .ok_or_else(|| DomainError::validation("image is required"))?;
    Ok(Json(state.recipes.replace_image(&user, id, image).await?))
}

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Value>> {
    let bookmarks = state.users.toggle_bookmark(&user, id).await?;
    Ok(Json(json!({ "bookmarks": bookmarks })))
}
