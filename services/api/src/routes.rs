use crate::infra::{AppParts, AppState};
use axum::http::{header, request, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use surveyor_registry::auth::{auth_router, require_admin};
use surveyor_registry::config::CorsConfig;
use surveyor_registry::forms::{form_router, FormRepository, FormService, UPLOAD_MOUNT};
use surveyor_registry::storage::file_router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Full HTTP surface: form, auth, and file routers plus the operational endpoints.
pub(crate) fn build_app<R>(repository: Arc<R>, parts: AppParts) -> Router
where
    R: FormRepository + 'static,
{
    let AppParts {
        state,
        storage,
        gate,
        authenticator,
        resolver,
        forms,
        presign_ttl,
        cors,
    } = parts;

    let uploads = Router::new()
        .nest_service(&format!("/{UPLOAD_MOUNT}"), ServeDir::new(resolver.upload_dir()))
        .route_layer(middleware::from_fn_with_state(gate.clone(), require_admin));

    let service = Arc::new(FormService::new(repository, storage.clone(), resolver, forms));

    Router::new()
        .route("/", get(banner))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .merge(form_router(service, gate.clone()))
        .merge(auth_router(authenticator, gate.clone()))
        .merge(file_router(storage, gate, presign_ttl))
        .merge(uploads)
        .layer(Extension(state))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

fn cors_layer(config: CorsConfig) -> CorsLayer {
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _: &request::Parts| {
        origin
            .to_str()
            .map(|origin| config.allows(origin))
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(%detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Internal Server Error" })),
    )
        .into_response()
}

pub(crate) async fn banner() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "message": "Backend running ✅" }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use surveyor_registry::auth::{AdminAuthenticator, AdminGate, TokenSigner};
    use surveyor_registry::config::{FormConfig, SessionDelivery};
    use surveyor_registry::forms::{FilePolicy, FileReferenceResolver, InMemoryFormRepository};
    use surveyor_registry::storage::InMemoryObjectStorage;
    use tower::ServiceExt;

    const SECRET: &str = "routes-secret";

    fn app(upload_dir: &std::path::Path, readiness: Arc<AtomicBool>) -> Router {
        let signer = TokenSigner::new(SECRET);
        let parts = AppParts {
            state: AppState {
                readiness,
                metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            },
            storage: Arc::new(InMemoryObjectStorage::default()),
            gate: AdminGate::new(Some(signer.clone()), "admin_token"),
            authenticator: Arc::new(AdminAuthenticator::new(
                "admin",
                None,
                Some(signer),
                SessionDelivery::Body,
                "admin_token",
            )),
            resolver: FileReferenceResolver::new(
                upload_dir,
                FilePolicy {
                    max_file_bytes: 1024 * 1024,
                },
            ),
            forms: FormConfig::default(),
            presign_ttl: Duration::from_secs(60),
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
                allowed_origin_suffixes: vec![".vercel.app".to_string()],
            },
        };
        build_app(Arc::new(InMemoryFormRepository::default()), parts)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn banner_and_health_respond() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = app(dir.path(), Arc::new(AtomicBool::new(true)));

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Backend running ✅");

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let flag = Arc::new(AtomicBool::new(false));
        let app = app(dir.path(), flag.clone());

        let response = app
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        flag.store(true, Ordering::Release);
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn uploads_are_served_to_admins_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("cvFile-1.pdf"), b"%PDF-1.4").expect("fixture written");
        let app = app(dir.path(), Arc::new(AtomicBool::new(true)));
        let stored = FileReferenceResolver::mounted_reference("cvFile-1.pdf");

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/{stored}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = TokenSigner::new(SECRET)
            .issue("admin", Duration::from_secs(60))
            .expect("token signs");
        let response = app
            .oneshot(
                Request::get(format!("/{stored}"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        assert_eq!(&bytes[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn cors_allows_listed_origins_and_suffixes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = app(dir.path(), Arc::new(AtomicBool::new(true)));

        for (origin, allowed) in [
            ("http://localhost:5173", true),
            ("https://surveyor-admin.vercel.app", true),
            ("https://evil.example.com", false),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::OPTIONS)
                        .uri("/api/form/submit")
                        .header(header::ORIGIN, origin)
                        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("router responds");
            let echoed = response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok());
            if allowed {
                assert_eq!(echoed, Some(origin));
                assert_eq!(
                    response
                        .headers()
                        .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                        .and_then(|value| value.to_str().ok()),
                    Some("true")
                );
            } else {
                assert_eq!(echoed, None, "{origin}");
            }
        }
    }

    #[tokio::test]
    async fn panics_become_generic_json_errors() {
        let response = panic_response(Box::new("boom".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn missing_login_hash_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = app(dir.path(), Arc::new(AtomicBool::new(true)));
        let response = app
            .oneshot(
                Request::post("/api/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username":"admin","password":"x"}"#))
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["message"],
            "Server misconfigured: ADMIN_PASSWORD_HASH missing"
        );
    }
}
