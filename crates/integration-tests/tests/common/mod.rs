//! Shared harness: the real router over in-memory adapters.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use api_adapters::{router, Adapters, AppState, HttpOptions};
use auth_adapters::{Argon2PasswordHasher, JwtTokenService};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use storage_adapters::{ImageMediaProcessor, InMemoryMediaStorage, InMemoryRepository, InMemoryTokenBlacklist};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
const BOUNDARY: &str = "lunchbox-test-boundary";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A signed-in account.
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(HttpOptions::default())
    }

    pub fn with_options(options: HttpOptions) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let adapters = Adapters {
            users: repo.clone(),
            recipes: repo.clone(),
            comments: repo.clone(),
            reviews: repo.clone(),
            reports: repo.clone(),
            notifications: repo,
            hasher: Arc::new(Argon2PasswordHasher::default()),
            tokens: Arc::new(JwtTokenService::new(SECRET, chrono::Duration::hours(1), "lunchbox")),
            blacklist: Arc::new(InMemoryTokenBlacklist::new()),
            media: Arc::new(InMemoryMediaStorage::new()),
            processor: Arc::new(ImageMediaProcessor::new(1024 * 1024, false)),
        };
        let state = AppState::new(adapters, false);
        let router = router(state.clone(), &options);
        Self { state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, body)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(json_request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::DELETE, uri, token, None)).await
    }

    /// Registers a user with generated details.
    pub async fn signup(&self) -> Account {
        let name: String = Name().fake();
        let email = format!("{}.{}", Uuid::new_v4().simple(), SafeEmail().fake::<String>());
        let (status, body) = self
            .post("/api/auth/signup", None, json!({ "name": name, "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        account(&body)
    }

    /// Seeds an admin account and signs it in through the admin endpoint.
    pub async fn admin(&self) -> Account {
        let email = format!("admin.{}@lunchbox.test", Uuid::new_v4().simple());
        assert!(self.state.auth.ensure_admin("Admin", &email, PASSWORD).await.unwrap());
        let (status, body) = self
            .post("/api/admin/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        account(&body)
    }

    /// Creates a recipe with an uploaded PNG and returns its JSON.
    pub async fn create_recipe(&self, token: &str, title: &str) -> Value {
        let form = Multipart::new()
            .text("title", title)
            .text("ingredients", "flour, water, salt")
            .text("steps", "Mix\nKnead\nBake")
            .text("tags", "bread")
            .file("image", "image/png", &png());
        let (status, body) = self.send(form.request(Method::POST, "/api/recipes", Some(token))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    /// Creates a recipe and has a fresh admin approve it.
    pub async fn approved_recipe(&self, token: &str, title: &str) -> Uuid {
        let recipe = self.create_recipe(token, title).await;
        let id = recipe_id(&recipe);
        let admin = self.admin().await;
        let (status, body) = self
            .patch(&format!("/api/admin/recipes/{id}/status"), Some(&admin.token), json!({ "status": "approved" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        id
    }
}

fn account(body: &Value) -> Account {
    Account {
        id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        email: body["user"]["email"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub fn recipe_id(recipe: &Value) -> Uuid {
    recipe["id"].as_str().unwrap().parse().unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A small valid PNG.
pub fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 120, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
        self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, self.body.len());
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}
