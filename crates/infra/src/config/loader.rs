//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `CONVERGENT_RATE_LIMIT_BUDGET` is set, the environment is the source
//! 2. Otherwise the first config file found by [`probe_config_paths`] is used
//! 3. With neither, the built-in defaults apply
//!
//! Every result is validated before it is returned.
//!
//! ## Environment Variables
//! - `CONVERGENT_RATE_LIMIT_BUDGET`: Calls per interval (required for env
//!   loading)
//! - `CONVERGENT_RATE_LIMIT_INTERVAL_MS`: Refill interval in milliseconds
//! - `CONVERGENT_RATE_LIMIT_MAX_WAIT_MS`: Acquisition watchdog in milliseconds
//! - `CONVERGENT_PAGE_SIZE`: Items requested per page
//! - `CONVERGENT_ENDPOINT_URL`: HTTP endpoint of the remote control plane
//! - `CONVERGENT_ENDPOINT_TIMEOUT_MS`: Per-request HTTP timeout
//! - `CONVERGENT_CLASSIFIER_RECOMMENDED`: Start from the recommended code
//!   tables (true/false)
//! - `CONVERGENT_TRANSIENT_CODES`: Extra transient codes, comma separated
//! - `CONVERGENT_NOT_FOUND_CODES`: Extra not-found codes, comma separated
//!
//! ## File Locations
//! The loader probes `convergent.{toml,json}` then `config.{toml,json}` in the
//! current working directory, then the same names next to the executable.

use std::path::{Path, PathBuf};

use convergent_domain::{ClassifierConfig, ConvergeError, EndpointConfig, EngineConfig, Result};

const ENV_BUDGET: &str = "CONVERGENT_RATE_LIMIT_BUDGET";
const ENV_INTERVAL_MS: &str = "CONVERGENT_RATE_LIMIT_INTERVAL_MS";
const ENV_MAX_WAIT_MS: &str = "CONVERGENT_RATE_LIMIT_MAX_WAIT_MS";
const ENV_PAGE_SIZE: &str = "CONVERGENT_PAGE_SIZE";
const ENV_ENDPOINT_URL: &str = "CONVERGENT_ENDPOINT_URL";
const ENV_ENDPOINT_TIMEOUT_MS: &str = "CONVERGENT_ENDPOINT_TIMEOUT_MS";
const ENV_RECOMMENDED: &str = "CONVERGENT_CLASSIFIER_RECOMMENDED";
const ENV_TRANSIENT_CODES: &str = "CONVERGENT_TRANSIENT_CODES";
const ENV_NOT_FOUND_CODES: &str = "CONVERGENT_NOT_FOUND_CODES";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["convergent.toml", "convergent.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ConvergeError::Config` if the chosen source is unreadable,
/// malformed or fails validation. A missing source is not an error.
pub fn load() -> Result<EngineConfig> {
    if std::env::var_os(ENV_BUDGET).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No configuration source found, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

/// Load configuration from environment variables
///
/// `CONVERGENT_RATE_LIMIT_BUDGET` is required; every other variable falls
/// back to its default.
///
/// # Errors
/// Returns `ConvergeError::Config` if the budget is missing, a number does
/// not parse, or the result fails validation.
pub fn load_from_env() -> Result<EngineConfig> {
    let mut config = EngineConfig::default();

    config.rate_limit.default_budget = parse_u64(ENV_BUDGET, &env_var(ENV_BUDGET)?)?;
    config.rate_limit.interval_ms = env_u64_or(ENV_INTERVAL_MS, config.rate_limit.interval_ms)?;
    config.rate_limit.max_wait_ms = env_u64_or(ENV_MAX_WAIT_MS, config.rate_limit.max_wait_ms)?;
    config.pagination.page_size = env_u64_or(ENV_PAGE_SIZE, config.pagination.page_size)?;

    if let Ok(url) = std::env::var(ENV_ENDPOINT_URL) {
        let mut endpoint = EndpointConfig::new(url);
        endpoint.timeout_ms = env_u64_or(ENV_ENDPOINT_TIMEOUT_MS, endpoint.timeout_ms)?;
        config.endpoint = Some(endpoint);
    }

    if env_bool(ENV_RECOMMENDED, false) {
        config.classifier = ClassifierConfig::recommended();
    }
    config.classifier.transient_codes.extend(env_list(ENV_TRANSIENT_CODES));
    config.classifier.not_found_codes.extend(env_list(ENV_NOT_FOUND_CODES));

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected by
/// extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `ConvergeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The parsed configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConvergeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConvergeError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ConvergeError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<EngineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConvergeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConvergeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ConvergeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ConvergeError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConvergeError::Config(format!("Invalid value for {key}: {e}")))
}

fn env_u64_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(value) => parse_u64(key, &value),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list, blanks dropped
fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
