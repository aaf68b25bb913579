use crate::app_config::{AppConfig, Environment};
use crate::cohort::DEFAULT_MIN_SALES;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                Ok(v) => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("expected a non-negative number, got {v}"),
                }),
                Err(e) => Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
            },
        }
    };

    let env = parse_environment(&or_default("TKPRO_ENV", "development"));
    let log_level = or_default("TKPRO_LOG_LEVEL", "info");
    let database_url = or_default("TKPRO_DATABASE_URL", "sqlite://tkpro.db?mode=rwc");
    let system_api_key = lookup("TKPRO_SYSTEM_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let gemini_base_url = or_default(
        "TKPRO_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_model = or_default("TKPRO_GEMINI_MODEL", "gemini-3-flash-preview");
    let connect_timeout_secs = parse_u64("TKPRO_CONNECT_TIMEOUT_SECS", "10")?;
    let min_sales = parse_f64("TKPRO_MIN_SALES", DEFAULT_MIN_SALES)?;

    Ok(AppConfig {
        env,
        log_level,
        database_url,
        system_api_key,
        gemini_base_url,
        gemini_model,
        connect_timeout_secs,
        min_sales,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
