mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{recipe_id, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = TestApp::new();
    let user = app.signup().await;
    for uri in ["/api/admin/overview", "/api/admin/users", "/api/admin/recipes", "/api/admin/reports"] {
        let (status, _) = app.get(uri, Some(&user.token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        let (status, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn explicit_suspension_is_idempotent() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.signup().await;
    let uri = format!("/api/admin/users/{}/suspend", user.id);

    for _ in 0..2 {
        let (status, body) = app.patch(&uri, Some(&admin.token), json!({ "suspended": true })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSuspended"], true);
    }
    let (_, body) = app.patch(&uri, Some(&admin.token), json!({ "suspended": false })).await;
    assert_eq!(body["isSuspended"], false);
}

#[tokio::test]
async fn empty_suspend_body_toggles() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.signup().await;

    let toggle = || {
        Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/admin/users/{}/suspend", user.id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin.token))
            .body(Body::empty())
            .unwrap()
    };
    let (_, body) = app.send(toggle()).await;
    assert_eq!(body["isSuspended"], true);
    let (_, body) = app.send(toggle()).await;
    assert_eq!(body["isSuspended"], false);
}

#[tokio::test]
async fn admins_cannot_be_suspended_or_deleted() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let other = app.admin().await;

    let (status, _) = app
        .patch(&format!("/api/admin/users/{}/suspend", other.id), Some(&admin.token), json!({ "suspended": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.delete(&format!("/api/admin/users/{}", other.id), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_listing_filters() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.signup().await;
    app.signup().await;

    let (status, page) = app.get("/api/admin/users", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);

    let (_, admins) = app.get("/api/admin/users?role=admin", Some(&admin.token)).await;
    assert_eq!(admins["total"], 1);

    let (_, found) = app
        .get(&format!("/api/admin/users?q={}", user.email.split('@').next().unwrap()), Some(&admin.token))
        .await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["data"][0]["id"], user.id.to_string());

    let (status, _) = app.get("/api/admin/users?role=chef", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_password_lets_the_user_sign_in_again() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.signup().await;

    let (status, _) = app
        .patch(&format!("/api/admin/users/{}/password", user.id), Some(&admin.token), json!({ "password": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            &format!("/api/admin/users/{}/password", user.id),
            Some(&admin.token),
            json!({ "password": "reset by admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": user.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": user.email, "password": "reset by admin" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn moderation_flow_and_overview() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let cook = app.signup().await;
    let id = recipe_id(&app.create_recipe(&cook.token, "Kimchi").await);

    let (_, overview) = app.get("/api/admin/dashboard", Some(&admin.token)).await;
    assert_eq!(overview["users"], 2);
    assert_eq!(overview["recipes"], 1);
    assert_eq!(overview["pendingRecipes"], 1);

    let (_, pending) = app.get("/api/admin/recipes?status=pending", Some(&admin.token)).await;
    assert_eq!(pending["total"], 1);

    let (status, _) = app
        .patch(&format!("/api/admin/recipes/{id}/status"), Some(&admin.token), json!({ "status": "published" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, recipe) = app
        .patch(&format!("/api/admin/recipes/{id}/status"), Some(&admin.token), json!({ "status": "rejected" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recipe["status"], "rejected");

    let (_, inbox) = app.get("/api/notifications", Some(&cook.token)).await;
    assert_eq!(inbox[0]["type"], "update");

    let (_, overview) = app.get("/api/admin/overview", Some(&admin.token)).await;
    assert_eq!(overview["pendingRecipes"], 0);

    let (status, _) = app.delete(&format!("/api/admin/recipes/{id}"), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, all) = app.get("/api/admin/recipes?status=all", Some(&admin.token)).await;
    assert_eq!(all["total"], 0);
}

#[tokio::test]
async fn review_moderation_removes_dismissed_ratings() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let cook = app.signup().await;
    let critic = app.signup().await;
    let id = app.approved_recipe(&cook.token, "Paella").await;

    let (_, review) = app
        .post(&format!("/api/recipes/{id}/reviews"), Some(&critic.token), json!({ "rating": 1 }))
        .await;
    let (_, listed) = app.get("/api/admin/reviews?status=pending", Some(&admin.token)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .patch(
            &format!("/api/admin/reviews/{}/status", review["id"].as_str().unwrap()),
            Some(&admin.token),
            json!({ "status": "dismissed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, recipe) = app.get(&format!("/api/recipes/{id}"), None).await;
    assert_eq!(recipe["ratingCount"], 0);
}

#[tokio::test]
async fn deleting_a_user_keeps_their_recipes() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let cook = app.signup().await;
    let id = app.approved_recipe(&cook.token, "Borscht").await;

    let (status, _) = app.delete(&format!("/api/admin/users/{}", cook.id), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, recipe) = app.get(&format!("/api/recipes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(recipe["author"]["userId"].is_null());
    assert!(!recipe["author"]["username"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn promoted_users_can_use_the_admin_login() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let user = app.signup().await;
    let role_uri = format!("/api/admin/users/{}/role", user.id);

    let (status, _) = app.patch(&role_uri, Some(&user.token), json!({ "role": "admin" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&role_uri, Some(&admin.token), json!({ "role": "admin" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "admin");
    let (status, _) = app
        .post("/api/admin/login", None, json!({ "email": user.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.patch(&role_uri, Some(&admin.token), json!({ "admin": false })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
    let (status, _) = app
        .post("/api/admin/login", None, json!({ "email": user.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_cannot_change_their_own_role() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (status, body) = app
        .patch(&format!("/api/admin/users/{}/role", admin.id), Some(&admin.token), json!({ "role": "user" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "cannot change your own role");
}
