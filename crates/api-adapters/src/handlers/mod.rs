//! # Handlers
//!
//! One module per resource. Handlers stay thin: extract, call the service,
//! wrap the result.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod notifications;
pub mod recipes;
pub mod reports;
pub mod reviews;
pub mod users;

use axum::Json;
use domains::{DomainError, PageRequest, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;
use serde_json::{json, Value};

/// `{ "message": ... }` acknowledgement body.
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, DEFAULT_PAGE_LIMIT)
    }
}

/// Parses an optional `status` filter with the target enum's `FromStr`.
pub(crate) fn parse_status<T>(value: Option<&str>) -> Result<Option<T>, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty() && *v != "all") {
        Some(v) => v.parse().map(Some),
        None => Ok(None),
    }
}

/// Splits a comma separated query value.
pub(crate) fn csv(value: Option<&str>) -> Vec<String> {
    value.map(|v| domains::split_list(v, ',')).unwrap_or_default()
}
