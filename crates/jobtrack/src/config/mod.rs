use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub board: BoardConfig,
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

        let order_step = match env::var("BOARD_ORDER_STEP") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|step| *step > 0)
                .ok_or(ConfigError::InvalidOrderStep)?,
            Err(_) => BoardConfig::DEFAULT_ORDER_STEP,
        };

        let move_retry_limit = match env::var("BOARD_MOVE_RETRY_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|limit| *limit >= 1)
                .ok_or(ConfigError::InvalidRetryLimit)?,
            Err(_) => BoardConfig::DEFAULT_MOVE_RETRY_LIMIT,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            board: BoardConfig {
                order_step,
                move_retry_limit,
            },
        })
    }
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
}

/// Ordering engine knobs.
///
/// `order_step` is the gap left between neighbours when a card is placed by
/// index; `move_retry_limit` bounds how many fresh snapshots a mutation takes
/// before a version conflict is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub order_step: i64,
    pub move_retry_limit: u32,
}

impl BoardConfig {
    pub const DEFAULT_ORDER_STEP: i64 = 100;
    pub const DEFAULT_MOVE_RETRY_LIMIT: u32 = 3;
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            order_step: Self::DEFAULT_ORDER_STEP,
            move_retry_limit: Self::DEFAULT_MOVE_RETRY_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidOrderStep,
    InvalidRetryLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidOrderStep => {
                write!(f, "BOARD_ORDER_STEP must be a positive integer")
            }
            ConfigError::InvalidRetryLimit => {
                write!(f, "BOARD_MOVE_RETRY_LIMIT must be an integer of at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidOrderStep
            | ConfigError::InvalidRetryLimit => None,
        }
    }
}
