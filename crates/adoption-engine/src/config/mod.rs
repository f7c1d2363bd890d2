use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub adoption: AdoptionConfig,
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

        let preparation_delay_secs = env::var("ADOPTION_PREPARATION_DELAY_SECS")
            .unwrap_or_else(|_| AdoptionConfig::DEFAULT_PREPARATION_DELAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPreparationDelay)?;

        let worker_poll_millis = env::var("ADOPTION_WORKER_POLL_MILLIS")
            .unwrap_or_else(|_| AdoptionConfig::DEFAULT_WORKER_POLL_MILLIS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|millis| *millis > 0)
            .ok_or(ConfigError::InvalidPollInterval)?;

        let catalog_path = env::var("ADOPTION_CATALOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            adoption: AdoptionConfig {
                preparation_delay: Duration::from_secs(preparation_delay_secs),
                worker_poll_interval: Duration::from_millis(worker_poll_millis),
                catalog_path,
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

/// Timing and catalog settings for the adoption workflow.
#[derive(Debug, Clone)]
pub struct AdoptionConfig {
    /// Simulated processing period between `preparation` and `success`.
    pub preparation_delay: Duration,
    /// How often the transition worker looks for due jobs.
    pub worker_poll_interval: Duration,
    /// Optional CSV catalog loaded into the store at startup.
    pub catalog_path: Option<PathBuf>,
}

impl AdoptionConfig {
    pub const DEFAULT_PREPARATION_DELAY_SECS: u64 = 60;
    pub const DEFAULT_WORKER_POLL_MILLIS: u64 = 1_000;
}

impl Default for AdoptionConfig {
    fn default() -> Self {
        Self {
            preparation_delay: Duration::from_secs(Self::DEFAULT_PREPARATION_DELAY_SECS),
            worker_poll_interval: Duration::from_millis(Self::DEFAULT_WORKER_POLL_MILLIS),
            catalog_path: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPreparationDelay,
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPreparationDelay => {
                write!(f, "ADOPTION_PREPARATION_DELAY_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidPollInterval => write!(
                f,
                "ADOPTION_WORKER_POLL_MILLIS must be a positive whole number of milliseconds"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPreparationDelay
            | ConfigError::InvalidPollInterval => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("ADOPTION_PREPARATION_DELAY_SECS");
        env::remove_var("ADOPTION_WORKER_POLL_MILLIS");
        env::remove_var("ADOPTION_CATALOG_PATH");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.adoption.preparation_delay, Duration::from_secs(60));
        assert_eq!(
            config.adoption.worker_poll_interval,
            Duration::from_millis(1_000)
        );
        assert!(config.adoption.catalog_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_adoption_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADOPTION_PREPARATION_DELAY_SECS", "5");
        env::set_var("ADOPTION_WORKER_POLL_MILLIS", "250");
        env::set_var("ADOPTION_CATALOG_PATH", "data/catalog.csv");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.adoption.preparation_delay, Duration::from_secs(5));
        assert_eq!(
            config.adoption.worker_poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(
            config.adoption.catalog_path,
            Some(PathBuf::from("data/catalog.csv"))
        );
        reset_env();
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADOPTION_WORKER_POLL_MILLIS", "0");
        let err = AppConfig::load().expect_err("zero interval rejected");
        assert!(matches!(err, ConfigError::InvalidPollInterval));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_delay() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADOPTION_PREPARATION_DELAY_SECS", "soon");
        let err = AppConfig::load().expect_err("bad delay rejected");
        assert!(matches!(err, ConfigError::InvalidPreparationDelay));
        reset_env();
    }
}
