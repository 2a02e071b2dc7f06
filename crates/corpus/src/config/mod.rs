//! Configuration: the per-run backend configuration and program settings.

mod run;
mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use run::RunConfiguration;
pub use settings::{load_settings, Config, LoadOptions, Settings};

/// Parses a document by file extension: `toml`, `yaml`/`yml`, anything else
/// as JSON.
pub(crate) fn parse_by_extension<T>(
    path: &std::path::Path,
    contents: &str,
) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let parsed = match ext {
        "toml" => toml::from_str(contents)?,
        "yaml" | "yml" => serde_yaml::from_str(contents)?,
        _ => serde_json::from_str(contents)?,
    };
    Ok(parsed)
}

/// Errors from reading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Read a config file, distinguishing a missing file from other I/O errors.
pub(crate) async fn read_config_file(path: &std::path::Path) -> Result<String, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
