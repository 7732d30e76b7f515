use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use surveyor_registry::auth::{AdminAuthenticator, AdminGate};
use surveyor_registry::config::{AppConfig, ConfigError, CorsConfig, FormConfig, StorageConfig};
use surveyor_registry::error::AppError;
use surveyor_registry::forms::{
    FilePolicy, FileReferenceResolver, InMemoryFormRepository, PgFormRepository,
};
use surveyor_registry::storage::{S3ObjectStorage, SharedStorage, UnconfiguredStorage};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Repository backing the form routes for this process.
pub(crate) enum FormStore {
    Postgres(PgFormRepository),
    Memory(InMemoryFormRepository),
}

impl FormStore {
    /// Connects and migrates when `DATABASE_URL` is set. Production refuses to
    /// start without it; other environments fall back to process memory.
    pub(crate) async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        match config.database.url.as_deref() {
            Some(url) => {
                let repository =
                    PgFormRepository::connect(url, config.database.max_connections).await?;
                repository.migrate().await?;
                info!("postgres repository ready");
                Ok(Self::Postgres(repository))
            }
            None if config.environment.is_production() => {
                Err(ConfigError::MissingVar("DATABASE_URL").into())
            }
            None => {
                warn!("DATABASE_URL not set; submissions are held in memory only");
                Ok(Self::Memory(InMemoryFormRepository::default()))
            }
        }
    }
}

pub(crate) async fn object_storage(config: &StorageConfig) -> SharedStorage {
    match S3ObjectStorage::from_config(config).await {
        Some(storage) => {
            info!(bucket = storage.bucket(), "object storage configured");
            Arc::new(storage)
        }
        None => {
            warn!("AWS_S3_BUCKET not set; file routes will report misconfiguration");
            Arc::new(UnconfiguredStorage)
        }
    }
}

/// Everything the router needs apart from the form repository.
#[derive(Clone)]
pub(crate) struct AppParts {
    pub(crate) state: AppState,
    pub(crate) storage: SharedStorage,
    pub(crate) gate: AdminGate,
    pub(crate) authenticator: Arc<AdminAuthenticator>,
    pub(crate) resolver: FileReferenceResolver,
    pub(crate) forms: FormConfig,
    pub(crate) presign_ttl: Duration,
    pub(crate) cors: CorsConfig,
}

impl AppParts {
    pub(crate) fn from_config(config: &AppConfig, state: AppState, storage: SharedStorage) -> Self {
        if config.auth.jwt_secret.is_none() {
            warn!("JWT_SECRET not set; admin routes will answer with a misconfiguration error");
        }
        if config.auth.admin_password_hash.is_none() {
            warn!("ADMIN_PASSWORD_HASH not set; admin login is unavailable");
        }

        Self {
            state,
            storage,
            gate: AdminGate::from_config(&config.auth),
            authenticator: Arc::new(AdminAuthenticator::from_config(&config.auth)),
            resolver: FileReferenceResolver::new(
                config.storage.upload_dir.clone(),
                FilePolicy {
                    max_file_bytes: config.storage.max_file_bytes,
                },
            ),
            forms: config.forms,
            presign_ttl: config.storage.presign_ttl,
            cors: config.cors.clone(),
        }
    }
}
