use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_WARRANTY_JOB_HOUR: u32 = 0;
const DEFAULT_WARRANTY_JOB_MINUTE: u32 = 10;
/// Europe/Moscow has no DST, so a fixed offset reproduces its wall clock.
const DEFAULT_SCHEDULER_UTC_OFFSET: &str = "+03:00";
const DEFAULT_STORAGE_CALL_TIMEOUT_SECS: u64 = 10;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Export traces over OTLP (also enabled by OTEL_EXPORTER_OTLP_ENDPOINT)
    #[serde(default)]
    pub otel_enabled: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default = "default_false_bool")]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Run the daily expired-warranty suggestion job inside the server
    #[serde(default = "default_true_bool")]
    pub warranty_job_enabled: bool,

    /// Local hour (in `scheduler_utc_offset`) at which the job fires
    #[serde(default = "default_warranty_job_hour")]
    #[validate(range(max = 23))]
    pub warranty_job_hour: u32,

    /// Local minute at which the job fires
    #[serde(default = "default_warranty_job_minute")]
    #[validate(range(max = 59))]
    pub warranty_job_minute: u32,

    /// Fixed UTC offset (`+HH:MM` / `-HH:MM`) that defines "today" for the job
    #[serde(default = "default_scheduler_utc_offset")]
    #[validate(custom = "validate_utc_offset")]
    pub scheduler_utc_offset: String,

    /// Upper bound for a single storage call made by background jobs
    #[serde(default = "default_storage_call_timeout_secs")]
    #[validate(range(min = 1))]
    pub storage_call_timeout_secs: u64,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for every optional setting
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            otel_enabled: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            warranty_job_enabled: default_true_bool(),
            warranty_job_hour: default_warranty_job_hour(),
            warranty_job_minute: default_warranty_job_minute(),
            scheduler_utc_offset: default_scheduler_utc_offset(),
            storage_call_timeout_secs: default_storage_call_timeout_secs(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Parsed scheduler offset. Falls back to the default when the configured
    /// value does not parse; `load_config` rejects such values up front.
    pub fn scheduler_offset(&self) -> FixedOffset {
        parse_utc_offset(&self.scheduler_utc_offset)
            .or_else(|| parse_utc_offset(DEFAULT_SCHEDULER_UTC_OFFSET))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Per-call storage timeout as a Duration
    pub fn storage_call_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_call_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_false_bool() -> bool {
    false
}
fn default_true_bool() -> bool {
    true
}

fn default_warranty_job_hour() -> u32 {
    DEFAULT_WARRANTY_JOB_HOUR
}
fn default_warranty_job_minute() -> u32 {
    DEFAULT_WARRANTY_JOB_MINUTE
}
fn default_scheduler_utc_offset() -> String {
    DEFAULT_SCHEDULER_UTC_OFFSET.to_string()
}
fn default_storage_call_timeout_secs() -> u64 {
    DEFAULT_STORAGE_CALL_TIMEOUT_SECS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_utc_offset(value: &str) -> Result<(), ValidationError> {
    if parse_utc_offset(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("scheduler_utc_offset");
        err.message = Some("Must look like +HH:MM or -HH:MM (e.g. +03:00)".into());
        Err(err)
    }
}

/// Parses `+HH:MM` / `-HH:MM` (also accepts `Z` for UTC).
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool, otel: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("asset_tracker={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    // OTLP export when enabled in config or an exporter endpoint is present
    let otel_enabled = otel || env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();

    if otel_enabled {
        use opentelemetry::KeyValue;
        use opentelemetry_otlp::WithExportConfig;
        use opentelemetry_sdk::{trace as sdktrace, Resource};

        let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4317".to_string());
        let service_name =
            env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "asset-tracker".to_string());

        let resource = Resource::new(vec![KeyValue::new("service.name", service_name)]);
        let tracer = match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(sdktrace::config().with_resource(resource))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
        {
            Ok(tracer) => tracer,
            Err(err) => {
                error!("Failed to install OTLP pipeline: {}", err);
                if json {
                    let _ = fmt().with_env_filter(filter_directive).json().try_init();
                } else {
                    let _ = fmt().with_env_filter(filter_directive).try_init();
                }
                return;
            }
        };

        let base = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(EnvFilter::new(filter_directive));

        if json {
            let _ = base.with(fmt::layer().json()).try_init();
        } else {
            let _ = base.with(fmt::layer()).try_init();
        }
    } else if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://asset_tracker.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    validate_config(&app_config)?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Runs field validation plus the cross-field constraints.
pub fn validate_config(app_config: &AppConfig) -> Result<(), AppConfigError> {
    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://example.com".into());
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn defaults_schedule_job_at_ten_past_midnight_moscow() {
        let cfg = base_config();
        assert!(cfg.warranty_job_enabled);
        assert_eq!((cfg.warranty_job_hour, cfg.warranty_job_minute), (0, 10));
        assert_eq!(cfg.scheduler_offset().local_minus_utc(), 3 * 3600);
        assert_eq!(cfg.storage_call_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn out_of_range_schedule_is_rejected() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.warranty_job_hour = 24;
        let err = validate_config(&cfg).unwrap_err();
        match err {
            AppConfigError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("warranty_job_hour"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_offset_and_log_level_are_rejected() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.scheduler_utc_offset = "Europe/Moscow".into();
        cfg.log_level = "loud".into();
        match validate_config(&cfg).unwrap_err() {
            AppConfigError::Validation(errors) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("scheduler_utc_offset"));
                assert!(fields.contains_key("log_level"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case("+03:00", Some(3 * 3600))]
    #[case("-05:30", Some(-(5 * 3600 + 30 * 60)))]
    #[case("Z", Some(0))]
    #[case("+00:00", Some(0))]
    #[case("03:00", None)]
    #[case("+3:00", None)]
    #[case("+24:00", None)]
    #[case("++3:00", None)]
    #[case("-+3:00", None)]
    #[case("+03:-5", None)]
    #[case("", None)]
    fn utc_offset_parsing(#[case] raw: &str, #[case] expected: Option<i32>) {
        assert_eq!(
            parse_utc_offset(raw).map(|o| o.local_minus_utc()),
            expected
        );
    }
}
