//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MdSyncConfig;
use super::secret::secret_string;
use crate::domain::errors::MdError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into MdSyncConfig
/// 4. Applies environment variable overrides (MDSYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns `MdError::Configuration` if the file is missing or unreadable, a
/// referenced environment variable is unset, the TOML does not parse, or
/// validation fails.
///
/// # Examples
///
/// ```no_run
/// use mdsync::config::loader::load_config;
///
/// let config = load_config("mdsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MdSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MdError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MdError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: MdSyncConfig = toml::from_str(&contents)
        .map_err(|e| MdError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        MdError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| MdError::Configuration(format!("invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(MdError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using the MDSYNC_* prefix
///
/// Environment variables follow the pattern: MDSYNC_<SECTION>_<KEY>
/// For example: MDSYNC_UPSTREAM_BASE_URL, MDSYNC_APPLICATION_DRY_RUN
fn apply_env_overrides(config: &mut MdSyncConfig) {
    // Application
    if let Ok(val) = std::env::var("MDSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_parse("MDSYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_APPLICATION_DEBOUNCE_STATE_PATH") {
        config.application.debounce_state_path = val;
    }

    // Upstream
    if let Ok(val) = std::env::var("MDSYNC_UPSTREAM_BASE_URL") {
        config.upstream.base_url = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_UPSTREAM_USERNAME") {
        config.upstream.username = Some(val);
    }
    if let Ok(val) = std::env::var("MDSYNC_UPSTREAM_PASSWORD") {
        config.upstream.password = Some(secret_string(val));
    }
    if let Some(val) = env_parse("MDSYNC_UPSTREAM_TIMEOUT_SECONDS") {
        config.upstream.timeout_seconds = val;
    }

    // Downstream
    if let Ok(val) = std::env::var("MDSYNC_DOWNSTREAM_HR_NOTIFY_URL") {
        config.downstream.hr_notify.url = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_DOWNSTREAM_HR_NOTIFY_PASSWORD") {
        config.downstream.hr_notify.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("MDSYNC_DOWNSTREAM_ACCOUNT_CREATE_URL") {
        config.downstream.account_create.url = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_DOWNSTREAM_ACCOUNT_CREATE_PASSWORD") {
        config.downstream.account_create.password = Some(secret_string(val));
    }

    // PostgreSQL
    if let Ok(val) = std::env::var("MDSYNC_POSTGRESQL_CONNECTION_STRING") {
        config.postgresql.connection_string = secret_string(val);
    }
    if let Some(val) = env_parse("MDSYNC_POSTGRESQL_MAX_CONNECTIONS") {
        config.postgresql.max_connections = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Directory
    if let Ok(val) = std::env::var("MDSYNC_DIRECTORY_URL") {
        config.directory.url = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_DIRECTORY_BIND_DN") {
        config.directory.bind_dn = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_DIRECTORY_BIND_PASSWORD") {
        config.directory.bind_password = secret_string(val);
    }
    if let Ok(val) = std::env::var("MDSYNC_DIRECTORY_BASE_DN") {
        config.directory.base_dn = val;
    }

    // Mail
    if let Ok(val) = std::env::var("MDSYNC_MAIL_HOST") {
        config.mail.host = val;
    }
    if let Some(val) = env_parse("MDSYNC_MAIL_PORT") {
        config.mail.port = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_MAIL_PASSWORD") {
        config.mail.password = Some(secret_string(val));
    }

    // Birthday
    if let Some(val) = env_parse("MDSYNC_BIRTHDAY_ENABLED") {
        config.birthday.enabled = val;
    }

    // Logging
    if let Some(val) = env_parse("MDSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("MDSYNC_LOGGING_ACCOUNTING_LOG_PATH") {
        config.logging.accounting_log_path = val;
    }
}
