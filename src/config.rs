use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "APP";
const DEVELOPMENT: &str = "development";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

const DEFAULT_DATABASE_URL: &str = "sqlite://fleetmeter.db?mode=rwc";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Service settings, layered from `config/*.toml` and `APP__*` variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[validate(length(min = 1))]
    pub database_url: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `development` relaxes the CORS requirement
    #[validate(length(min = 1))]
    pub environment: String,
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated browser origins allowed to call the API
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default = "pool::max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "pool::min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "pool::connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "pool::idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "pool::acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Capacity of the domain event queue
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_non_zero")]
    pub event_channel_capacity: usize,
    /// Upper bound on data rows in one readings or part-order sheet
    #[serde(default = "default_import_max_rows")]
    #[validate(custom = "validate_non_zero")]
    pub import_max_rows: usize,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: pool::max_connections(),
            db_min_connections: pool::min_connections(),
            db_connect_timeout_secs: pool::connect_timeout_secs(),
            db_idle_timeout_secs: pool::idle_timeout_secs(),
            db_acquire_timeout_secs: pool::acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            import_max_rows: default_import_max_rows(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEVELOPMENT)
    }

    /// Permissive CORS is used only when no origins are listed.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Rules spanning several fields, checked after the derived validation.
    fn validate_deployment(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.cors_origins().is_empty() && !self.should_allow_permissive_cors() {
            errors.add(
                "cors_allowed_origins",
                rule_error(
                    "cors_origins_required",
                    "list origins in APP__CORS_ALLOWED_ORIGINS or set APP__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }
        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                rule_error("pool_bounds", "db_min_connections exceeds db_max_connections"),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

mod pool {
    pub fn max_connections() -> u32 {
        16
    }
    pub fn min_connections() -> u32 {
        2
    }
    pub fn connect_timeout_secs() -> u64 {
        30
    }
    pub fn idle_timeout_secs() -> u64 {
        600
    }
    pub fn acquire_timeout_secs() -> u64 {
        8
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_import_max_rows() -> usize {
    5000
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(rule_error("log_level", "expected trace, debug, info, warn or error"))
    }
}

fn validate_non_zero(value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(rule_error("non_zero", "must be at least 1"));
    }
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG`, when set, replaces the
/// default `fleetmeter_api=<level>` filter.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("fleetmeter_api={},tower_http=debug", level));
    let filter = EnvFilter::new(directive);

    let builder = fmt().with_env_filter(filter);
    // a second init (tests, embedding) keeps the first subscriber
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Later sources win: built-in defaults, `config/default.toml`,
/// `config/<RUN_ENV>.toml`, then `APP__*` environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEVELOPMENT.to_string());
    info!(environment = %run_env, "Loading configuration");

    let app_config: AppConfig = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    app_config
        .validate()
        .and_then(|()| app_config.validate_deployment())
        .map_err(|e| {
            error!(errors = ?e, "Invalid configuration");
            AppConfigError::Validation(e)
        })?;

    info!(
        environment = %app_config.environment,
        port = app_config.port,
        "Configuration loaded"
    );
    Ok(app_config)
}
