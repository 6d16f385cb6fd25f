//! Global configuration loader for MaoFlow.
//!
//! Reads `config.toml` from the data directory (`~/.maoflow/` by default)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use maoflow_types::config::GlobalConfig;

use crate::sqlite::pool::database_url_for;

pub const DATA_DIR_ENV: &str = "MAOFLOW_DATA_DIR";
pub const DATABASE_URL_ENV: &str = "MAOFLOW_DATABASE_URL";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`GlobalConfig::default()`].
/// - Unreadable or unparsable file: logs a warning, returns the default.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// `$MAOFLOW_DATA_DIR`, else `~/.maoflow`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV))
}

/// `$MAOFLOW_DATABASE_URL`, else a file inside the data directory.
pub fn resolve_database_url(data_dir: &Path) -> String {
    database_url_from(std::env::var(DATABASE_URL_ENV).ok(), data_dir)
}

fn data_dir_from(env: Option<OsString>) -> PathBuf {
    match env.filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".maoflow"),
    }
}

fn database_url_from(env: Option<String>, data_dir: &Path) -> String {
    env.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| database_url_for(data_dir))
}
