use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{object_key_for, SharedStorage};
use crate::auth::{require_admin, AdminGate};
use crate::error::AppError;
use crate::forms::files::FileSlot;

#[derive(Debug, Clone)]
struct FileAccess {
    storage: SharedStorage,
    ttl: Duration,
}

/// Signed upload/download URLs and an admin-only byte proxy under `/api/files`.
pub fn file_router(storage: SharedStorage, gate: AdminGate, ttl: Duration) -> Router {
    let access = FileAccess { storage, ttl };

    let stream_routes = Router::new()
        .route("/api/files/stream", get(stream_handler))
        .route_layer(middleware::from_fn_with_state(gate, require_admin));

    Router::new()
        .route("/api/files/presign", post(presign_handler))
        .route("/api/files/view", get(view_handler))
        .merge(stream_routes)
        .with_state(access)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresignRequest {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresignResponse {
    key: String,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    #[serde(default)]
    key: Option<String>,
}

impl KeyQuery {
    fn require(self) -> Result<String, AppError> {
        self.key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::bad_request("key required"))
    }
}

async fn presign_handler(
    State(access): State<FileAccess>,
    payload: Result<Json<PresignRequest>, JsonRejection>,
) -> Result<Json<PresignResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let (kind, content_type) = match (request.kind, request.content_type) {
        (Some(kind), Some(content_type)) if !kind.is_empty() && !content_type.is_empty() => {
            (kind, content_type)
        }
        _ => return Err(AppError::bad_request("kind and contentType required")),
    };

    let slot = FileSlot::from_kind(&kind)
        .ok_or_else(|| AppError::bad_request("kind must be photo or cv"))?;
    let accepted = content_type
        .parse::<mime::Mime>()
        .map(|mime| slot.accepts(&mime))
        .unwrap_or(false);
    if !accepted {
        return Err(AppError::bad_request(match slot {
            FileSlot::Photo => "Photo must be an image/*".to_string(),
            FileSlot::Cv => format!("CV must be {}", slot.expected_types()),
        }));
    }

    let key = object_key_for(slot, &content_type);
    let upload_url = access
        .storage
        .presign_put(&key, &content_type, access.ttl)
        .await?;
    debug!(%key, "issued upload url");

    Ok(Json(PresignResponse { key, upload_url }))
}

async fn view_handler(
    State(access): State<FileAccess>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = query.require()?;
    let url = access.storage.presign_get(&key, access.ttl).await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

async fn stream_handler(
    State(access): State<FileAccess>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, AppError> {
    let key = query.require()?;
    let object = access.storage.get_object(&key).await?;
    let content_type = object.content_type.unwrap_or_else(|| {
        mime_guess::from_path(&key)
            .first_or_octet_stream()
            .to_string()
    });

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}
