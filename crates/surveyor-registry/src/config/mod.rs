use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_PRESIGN_TTL_SECS: u64 = 300;
const DEFAULT_LIST_MAX_LIMIT: i64 = 100;
const DEFAULT_DEV_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,http://localhost:5174";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub forms: FormConfig,
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match optional_var("APP_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidValue {
                name: "APP_LOG_FORMAT",
                value: raw,
            })?,
            None => LogFormat::Compact,
        };

        let database = DatabaseConfig {
            url: optional_var("DATABASE_URL"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 8)?,
        };

        let session_delivery = match optional_var("ADMIN_SESSION_DELIVERY") {
            Some(raw) => SessionDelivery::parse(&raw).ok_or(ConfigError::InvalidValue {
                name: "ADMIN_SESSION_DELIVERY",
                value: raw,
            })?,
            None => SessionDelivery::Body,
        };

        let auth = AuthConfig {
            jwt_secret: optional_var("JWT_SECRET"),
            admin_username: optional_var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password_hash: optional_var("ADMIN_PASSWORD_HASH"),
            session_delivery,
            cookie_name: optional_var("ADMIN_COOKIE_NAME")
                .unwrap_or_else(|| "admin_token".to_string()),
        };

        let storage = StorageConfig {
            bucket: optional_var("AWS_S3_BUCKET"),
            region: optional_var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: optional_var("S3_ENDPOINT"),
            presign_ttl: Duration::from_secs(parse_var(
                "PRESIGN_TTL_SECS",
                DEFAULT_PRESIGN_TTL_SECS,
            )?),
            upload_dir: PathBuf::from(
                optional_var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            max_file_bytes: parse_var("UPLOAD_MAX_FILE_BYTES", DEFAULT_MAX_FILE_BYTES)?,
        };

        let forms = FormConfig {
            strict_phone: parse_var("FORM_STRICT_PHONE", false)?,
            list_max_limit: parse_var("FORM_LIST_MAX_LIMIT", DEFAULT_LIST_MAX_LIMIT)?,
        };

        let cors = CorsConfig {
            allowed_origins: split_list(
                &optional_var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_DEV_ORIGINS.into()),
            ),
            allowed_origin_suffixes: split_list(
                &optional_var("CORS_ALLOWED_ORIGIN_SUFFIXES").unwrap_or_default(),
            ),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            database,
            auth,
            storage,
            forms,
            cors,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Relational store connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .ok_or(ConfigError::MissingVar("DATABASE_URL"))
    }
}

/// How a successful admin login hands the session token back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDelivery {
    /// Token returned in the JSON body for `Authorization: Bearer` use.
    Body,
    /// Token set as an HTTP-only cookie.
    Cookie,
}

impl SessionDelivery {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "body" | "bearer" | "header" => Some(Self::Body),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// Admin account and token signing settings. Secrets stay optional so a missing
/// value surfaces as an explicit misconfiguration response instead of a crash.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub admin_username: String,
    pub admin_password_hash: Option<String>,
    pub session_delivery: SessionDelivery,
    pub cookie_name: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password_hash",
                &self.admin_password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("session_delivery", &self.session_delivery)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

/// Object storage and direct-upload settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub presign_ttl: Duration,
    pub upload_dir: PathBuf,
    pub max_file_bytes: usize,
}

/// Submission validation and listing policy.
#[derive(Debug, Clone, Copy)]
pub struct FormConfig {
    pub strict_phone: bool,
    pub list_max_limit: i64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            strict_phone: false,
            list_max_limit: DEFAULT_LIST_MAX_LIMIT,
        }
    }
}

/// Cross-origin policy for the browser front-ends.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_origin_suffixes: Vec<String>,
}

impl CorsConfig {
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
            || self
                .allowed_origin_suffixes
                .iter()
                .any(|suffix| origin.ends_with(suffix.as_str()))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an unsupported value '{value}'")
            }
            ConfigError::MissingVar(name) => write!(f, "{name} is missing"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingVar(_) => None,
        }
    }
}
