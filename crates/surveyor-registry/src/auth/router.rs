use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;

use super::gate::{require_admin, AdminGate, AdminSession};
use super::login::{AdminAuthenticator, LoginRequest};
use crate::config::SessionDelivery;
use crate::error::AppError;

/// Login, logout, and session introspection under `/api/admin`.
pub fn auth_router(authenticator: Arc<AdminAuthenticator>, gate: AdminGate) -> Router {
    let session_routes = Router::new()
        .route("/api/admin/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(gate, require_admin));

    Router::new()
        .route("/api/admin/login", post(login_handler))
        .route("/api/admin/logout", post(logout_handler))
        .with_state(authenticator)
        .merge(session_routes)
}

pub(crate) async fn login_handler(
    State(authenticator): State<Arc<AdminAuthenticator>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let session = authenticator.login(request).await?;

    let response = match authenticator.delivery() {
        SessionDelivery::Body => Json(json!({
            "success": true,
            "data": { "token": session.token, "username": session.username },
        }))
        .into_response(),
        SessionDelivery::Cookie => (
            [(header::SET_COOKIE, authenticator.session_cookie(&session))],
            Json(json!({
                "success": true,
                "data": { "username": session.username },
            })),
        )
            .into_response(),
    };
    Ok(response)
}

pub(crate) async fn logout_handler(
    State(authenticator): State<Arc<AdminAuthenticator>>,
) -> Response {
    (
        [(header::SET_COOKIE, authenticator.clear_cookie())],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

pub(crate) async fn me_handler(Extension(session): Extension<AdminSession>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": { "username": session.0.username, "role": session.0.role },
    }))
}
