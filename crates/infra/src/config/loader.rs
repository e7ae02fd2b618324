//! Configuration loader
//!
//! Loads application configuration from a file, with the path taken from
//! the environment when set.
//!
//! ## Loading Strategy
//! 1. `TABLECAT_CONFIG_PATH` points at an explicit file, if set
//! 2. Otherwise probes standard locations for config files
//! 3. Supports TOML and JSON formats (detected by file extension)
//! 4. Validates the result before it is handed to the application
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.toml` or `./config.json` (current working directory)
//! 2. `./tablecat.toml` or `./tablecat.json` (current working directory)
//! 3. The same names one and two directories up

use std::path::{Path, PathBuf};

use tablecat_domain::{Config, Result, TablecatError};

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_ENV: &str = "TABLECAT_CONFIG_PATH";

/// Load configuration.
///
/// # Errors
/// Returns `TablecatError::Config` if no file is found, the format is
/// invalid, or validation fails.
pub fn load() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = load_from_file(explicit)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `TablecatError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TablecatError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TablecatError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TablecatError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.toml` or `.json`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TablecatError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TablecatError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(TablecatError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.toml"),
            cwd.join("config.json"),
            cwd.join("tablecat.toml"),
            cwd.join("tablecat.json"),
            cwd.join("../config.toml"),
            cwd.join("../config.json"),
            cwd.join("../../config.toml"),
            cwd.join("../../config.json"),
        ]);
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Initial configuration verifications.
///
/// # Errors
/// Returns `TablecatError::Config` for combinations the service must not
/// start with.
pub fn validate(config: &Config) -> Result<()> {
    if config.auth.basic.enable && config.auth.basic.password.is_empty() {
        return Err(TablecatError::Config(
            "Missing password value in the configuration file for auth basic".to_string(),
        ));
    }

    if config.database.selected().is_none() && !config.database.dry_run {
        return Err(TablecatError::Config(format!(
            "Missing [database.{}] section for the selected engine",
            config.database.engine
        )));
    }

    Ok(())
}
