//! Admin session lifecycle over HTTP: credential checks, token and cookie
//! delivery, role enforcement, and the misconfiguration responses.

mod common {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use surveyor_registry::auth::{auth_router, AdminAuthenticator, AdminGate, TokenSigner};
    use surveyor_registry::config::SessionDelivery;

    pub(super) const SECRET: &str = "session-secret";
    pub(super) const PASSWORD: &str = "s3cure-harbour";

    pub(super) fn router(delivery: SessionDelivery, secret: Option<&str>, hashed: bool) -> Router {
        let signer = secret.map(TokenSigner::new);
        let hash = hashed.then(|| bcrypt::hash(PASSWORD, 4).expect("hash builds"));
        let authenticator = Arc::new(AdminAuthenticator::new(
            "admin",
            hash,
            signer.clone(),
            delivery,
            "admin_token",
        ));
        auth_router(authenticator, AdminGate::new(signer, "admin_token"))
    }

    pub(super) fn login_request(username: &str, password: &str, remember: Option<bool>) -> Request<Body> {
        let mut body = json!({ "username": username, "password": password });
        if let Some(remember) = remember {
            body["remember"] = json!(remember);
        }
        Request::post("/api/admin/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    pub(super) fn me_request(header_name: header::HeaderName, value: String) -> Request<Body> {
        Request::get("/api/admin/me")
            .header(header_name, value)
            .body(Body::empty())
            .expect("request builds")
    }

    pub(super) async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response: Response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        (status, cookie, serde_json::from_slice(&bytes).expect("json body"))
    }
}

use std::time::Duration;

use axum::http::{header, StatusCode};
use common::*;
use surveyor_registry::auth::{AdminClaims, TokenSigner};
use surveyor_registry::config::SessionDelivery;

#[tokio::test]
async fn body_login_issues_a_token_accepted_by_me() {
    let app = router(SessionDelivery::Body, Some(SECRET), true);

    let (status, cookie, body) = call(&app, login_request("admin", PASSWORD, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_none());
    assert_eq!(body["data"]["username"], "admin");
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let claims = TokenSigner::new(SECRET).verify(&token).expect("token verifies");
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);

    let (status, _, body) = call(&app, me_request(header::AUTHORIZATION, format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn wrong_password_yields_no_token() {
    let app = router(SessionDelivery::Body, Some(SECRET), true);

    let (status, cookie, body) = call(&app, login_request("admin", "guess", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials");
    assert!(body.get("data").is_none());

    let (status, _, _) = call(&app, login_request("root", PASSWORD, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = call(&app, login_request("", "", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username and password required");
}

#[tokio::test]
async fn cookie_login_sets_the_session_cookie() {
    let app = router(SessionDelivery::Cookie, Some(SECRET), true);

    let (status, cookie, body) = call(&app, login_request("admin", PASSWORD, Some(false))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("token").is_none());
    let cookie = cookie.expect("set-cookie header");
    assert!(cookie.starts_with("admin_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=7200"));

    let pair = cookie.split(';').next().expect("name=value").to_string();
    let (status, _, body) = call(&app, me_request(header::COOKIE, pair)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
}

#[tokio::test]
async fn non_admin_roles_are_forbidden() {
    let app = router(SessionDelivery::Body, Some(SECRET), false);
    let mut claims = AdminClaims::admin("viewer", Duration::from_secs(600));
    claims.role = "viewer".to_string();
    let token = TokenSigner::new(SECRET).sign(&claims).expect("token signs");

    let (status, _, body) = call(&app, me_request(header::AUTHORIZATION, format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");

    let foreign = TokenSigner::new("other-secret")
        .issue("admin", Duration::from_secs(600))
        .expect("token signs");
    let (status, _, body) = call(&app, me_request(header::AUTHORIZATION, format!("Bearer {foreign}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn missing_secrets_surface_as_server_misconfiguration() {
    let app = router(SessionDelivery::Body, None, true);
    let (status, _, body) = call(&app, login_request("admin", PASSWORD, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server misconfigured: JWT_SECRET missing");

    let app = router(SessionDelivery::Body, Some(SECRET), false);
    let (status, _, body) = call(&app, login_request("admin", PASSWORD, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server misconfigured: ADMIN_PASSWORD_HASH missing");
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let app = router(SessionDelivery::Cookie, Some(SECRET), true);
    let request = axum::http::Request::post("/api/admin/logout")
        .body(axum::body::Body::empty())
        .expect("request builds");
    let (status, cookie, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");
    assert!(cookie.expect("set-cookie header").contains("Max-Age=0"));
}
