mod common;

use axum::http::{Method, StatusCode};
use common::{json_request, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let response = app.send_raw(json_request(Method::GET, "/metrics", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("lunchbox_http_requests_total"), "{text}");
}

#[tokio::test]
async fn signup_returns_a_session_without_the_hash() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/auth/signup", None, json!({ "name": "  Ada ", "email": "ADA@Example.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert!(me.get("passwordHash").is_none());
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = TestApp::new();
    let account = app.signup().await;
    let (status, body) = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "name": "Copy", "email": account.email.to_uppercase(), "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn signup_validation_collapses_into_one_message() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/auth/signup", None, json!({ "email": "a@b.co" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name, email, password required");

    let (status, _) = app
        .post("/api/auth/signup", None, json!({ "name": "Short", "email": "s@b.co", "password": "12345" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new();
    let account = app.signup().await;
    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": account.email, "password": "not the password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/api/auth/signin", None, json!({ "email": account.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], account.id.to_string());
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_out_token_is_rejected() {
    let app = TestApp::new();
    let account = app.signup().await;

    let (status, body) = app.post("/api/auth/signout", Some(&account.token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "signed out");

    let (status, _) = app.get("/api/auth/me", Some(&account.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signout_without_token_still_succeeds() {
    let app = TestApp::new();
    let (status, _) = app.send(json_request(Method::POST, "/api/auth/signout", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn suspended_users_cannot_sign_in() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let account = app.signup().await;

    let (status, _) = app
        .patch(&format!("/api/admin/users/{}/suspend", account.id), Some(&admin.token), json!({ "suspended": true }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": account.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // existing tokens stop working too
    let (status, _) = app.get("/api/auth/me", Some(&account.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_login_rejects_regular_users() {
    let app = TestApp::new();
    let account = app.signup().await;
    let (status, _) = app
        .post("/api/admin/login", None, json!({ "email": account.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_updates_and_password_change() {
    let app = TestApp::new();
    let account = app.signup().await;
    let other = app.signup().await;

    let (status, _) = app
        .patch("/api/users/profile", Some(&account.token), json!({ "email": other.email }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .patch("/api/users/profile", Some(&account.token), json!({ "name": "Renamed" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Renamed");

    let (status, _) = app
        .patch(
            "/api/users/password",
            Some(&account.token),
            json!({ "currentPassword": "wrong password", "password": "brand new secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            "/api/users/password",
            Some(&account.token),
            json!({ "currentPassword": PASSWORD, "password": "brand new secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": account.email, "password": "brand new secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_accounts_lose_access() {
    let app = TestApp::new();
    let account = app.signup().await;
    let (status, _) = app.delete("/api/users", Some(&account.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/users/me", Some(&account.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": account.email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgotten_password_is_recovered_through_the_security_question() {
    let app = TestApp::new();
    let email = "recover@example.com";
    let (status, body) = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Rae",
                "email": email,
                "password": PASSWORD,
                "securityQuestion": "Name of your first pet?",
                "securityAnswer": "Biscuit"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"].get("securityAnswerHash"), None);

    let (status, challenge) = app.post("/api/auth/forgot-password", None, json!({ "email": email })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(challenge["securityQuestion"], "Name of your first pet?");

    let (status, body) = app
        .post("/api/auth/verify-security-answer", None, json!({ "email": email, "securityAnswer": "Muffin" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "incorrect security answer");

    let (status, grant) = app
        .post("/api/auth/verify-security-answer", None, json!({ "email": email, "securityAnswer": " biscuit " }))
        .await;
    assert_eq!(status, StatusCode::OK, "{grant}");
    let reset_token = grant["resetToken"].as_str().unwrap().to_string();

    // A reset token is not a session.
    let (status, _) = app.get("/api/auth/me", Some(&reset_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reset = json!({ "resetToken": reset_token, "password": "a brand new secret" });
    let (status, _) = app.post("/api/auth/reset-password", None, reset.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/auth/reset-password", None, reset).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/api/auth/signin", None, json!({ "email": email, "password": PASSWORD })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/api/auth/signin", None, json!({ "email": email, "password": "a brand new secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn access_tokens_cannot_reset_passwords() {
    let app = TestApp::new();
    let user = app.signup().await;
    let (status, _) = app
        .post("/api/auth/reset-password", None, json!({ "resetToken": user.token, "password": "a brand new secret" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn security_question_can_be_set_later() {
    let app = TestApp::new();
    let user = app.signup().await;

    let (status, body) = app.post("/api/auth/forgot-password", None, json!({ "email": user.email })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = app.post("/api/auth/forgot-password", None, json!({ "email": "nobody@example.com" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let update = |password: &str| {
        json!({ "currentPassword": password, "securityQuestion": "Favourite dish?", "securityAnswer": "Paella" })
    };
    let (status, _) = app.put("/api/users/security-question", Some(&user.token), update("wrong password")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, me) = app.put("/api/users/security-question", Some(&user.token), update(PASSWORD)).await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["securityQuestion"], "Favourite dish?");

    let (status, challenge) = app.post("/api/auth/forgot-password", None, json!({ "email": user.email })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(challenge["securityQuestion"], "Favourite dish?");
}
