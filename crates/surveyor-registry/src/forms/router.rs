use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::FormId;
use super::intake::SubmissionInput;
use super::repository::FormRepository;
use super::service::FormService;
use crate::auth::{require_admin, AdminGate};
use crate::error::AppError;

/// Public submission endpoint plus the admin-only review workflow.
pub fn form_router<R>(service: Arc<FormService<R>>, gate: AdminGate) -> Router
where
    R: FormRepository + 'static,
{
    let body_limit = service.resolver().policy().max_request_bytes();

    let admin_routes = Router::new()
        .route("/api/form/records", get(list_handler::<R>))
        .route("/api/form/stats", get(stats_handler::<R>))
        .route("/api/form/:id/review", patch(review_handler::<R>))
        .route("/api/form/:id/approve", patch(approve_handler::<R>))
        .route("/api/form/:id", delete(delete_handler::<R>))
        .route_layer(middleware::from_fn_with_state(gate, require_admin));

    Router::new()
        .route(
            "/api/form/submit",
            post(submit_handler::<R>).layer(DefaultBodyLimit::max(body_limit)),
        )
        .merge(admin_routes)
        .with_state(service)
}

/// Query values stay textual so a malformed number falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<String>,
    offset: Option<String>,
}

fn lenient_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

fn parse_id(raw: &str) -> Result<FormId, AppError> {
    FormId::parse(raw).ok_or_else(|| AppError::bad_request("Invalid id"))
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<FormService<R>>>,
    request: Request,
) -> Result<Response, AppError>
where
    R: FormRepository + 'static,
{
    let input = SubmissionInput::read(request).await?;
    let id = service.submit(input).await?;
    let payload = json!({
        "success": true,
        "message": "Form submitted",
        "data": { "id": id },
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<FormService<R>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: FormRepository + 'static,
{
    let forms = service
        .list(
            lenient_number(query.limit.as_deref()),
            lenient_number(query.offset.as_deref()),
        )
        .await?;
    Ok(Json(json!({ "success": true, "data": forms })))
}

pub(crate) async fn stats_handler<R>(
    State(service): State<Arc<FormService<R>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: FormRepository + 'static,
{
    let stats = service.stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

pub(crate) async fn review_handler<R>(
    State(service): State<Arc<FormService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: FormRepository + 'static,
{
    let stamp = service.mark_reviewed(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": stamp })))
}

pub(crate) async fn approve_handler<R>(
    State(service): State<Arc<FormService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: FormRepository + 'static,
{
    let stamp = service.approve(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": stamp })))
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<FormService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: FormRepository + 'static,
{
    let id = service.delete(parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Form deleted",
        "id": id,
    })))
}
