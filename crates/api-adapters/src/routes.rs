use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{admin, auth, comments, health, notifications, recipes, reports, reviews, users};
use crate::metrics;
use crate::state::AppState;

/// Transport settings that do not belong to any service.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub max_body_bytes: usize,
    /// Empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self { max_body_bytes: 12 * 1024 * 1024, cors_origins: Vec::new() }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/signout", post(auth::signout))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-security-answer", post(auth::verify_security_answer))
        .route("/auth/reset-password", post(auth::reset_password))
        // profile
        .route("/users", delete(users::delete_account))
        .route("/users/me", get(users::profile))
        .route("/users/me/bookmarks", get(users::bookmarks))
        .route("/users/profile", patch(users::update_profile))
        .route("/users/password", patch(users::change_password))
        .route("/users/security-question", put(users::set_security_question))
        // recipes
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route("/recipes/mine", get(recipes::mine))
        .route("/recipes/featured", get(recipes::featured))
        .route("/recipes/popular", get(recipes::popular))
        .route("/recipes/categories", get(recipes::categories))
        .route("/chefs/popular", get(recipes::popular_chefs))
        .route("/recipes/search/quick", get(recipes::quick_search))
        .route("/recipes/search/ingredient/{ingredient}", get(recipes::by_ingredient))
        .route("/recipes/{id}", get(recipes::get).put(recipes::update).delete(recipes::delete))
        .route("/recipes/{id}/image", get(recipes::image).put(recipes::replace_image))
        .route("/recipes/{id}/bookmark", post(recipes::toggle_bookmark))
        .route("/recipes/{id}/reviews", get(reviews::list).post(reviews::add))
        .route("/recipes/{id}/comments", get(comments::list).post(comments::add))
        .route("/recipes/{id}/comments/{comment_id}", put(comments::update).delete(comments::delete))
        .route("/recipes/{id}/reports", post(reports::report_recipe))
        .route("/reviews/{id}", put(reviews::update).delete(reviews::delete))
        .route("/comments/by/{email}", get(comments::by_email))
        .route("/reports", post(reports::create))
        .route("/reports/mine", get(reports::mine))
        // notifications
        .route("/notifications", get(notifications::list).post(notifications::create))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read/all", put(notifications::mark_all_read))
        .route("/notifications/clear/all", delete(notifications::clear_all))
        .route("/notifications/{id}", delete(notifications::delete))
        .route("/notifications/{id}/read", put(notifications::mark_read))
        // admin
        .route("/admin/login", post(auth::admin_signin))
        .route("/admin/overview", get(admin::overview))
        .route("/admin/dashboard", get(admin::overview))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/users/{id}/suspend", patch(admin::suspend_user))
        .route("/admin/users/{id}/password", patch(admin::reset_password))
        .route("/admin/users/{id}/role", patch(admin::set_role))
        .route("/admin/recipes", get(admin::list_recipes))
        .route("/admin/recipes/{id}", delete(admin::delete_recipe))
        .route("/admin/recipes/{id}/status", patch(admin::set_recipe_status))
        .route("/admin/reviews", get(admin::list_reviews))
        .route("/admin/reviews/{id}/status", patch(admin::set_review_status))
        .route("/admin/reports", get(admin::list_reports))
        .route("/admin/reports/{id}/status", patch(admin::set_report_status))
}

/// The complete application with its middleware stack.
pub fn router(state: AppState, options: &HttpOptions) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::render))
        .nest("/api", api_routes())
        .layer(middleware::from_fn_with_state(state.metrics.clone(), metrics::track))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(options.max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(cors(&options.cors_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
