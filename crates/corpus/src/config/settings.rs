//! Program settings, layered from a settings file, environment and flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{parse_by_extension, read_config_file, ConfigError};
use crate::collector::{ExecutorConfig, InitFailurePolicy};
use crate::output::OutputFormat;

/// Name used for settings file discovery (`corpus.toml`, `corpus.json`, ...).
const SETTINGS_NAME: &str = "corpus";

/// Default output file stem.
pub const DEFAULT_OUTPUT_BASENAME: &str = "lyrics";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory the output file is written to.
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// Output file stem; the extension follows the format.
    pub output_basename: String,
    /// Maximum backends running at once.
    pub workers: usize,
    /// Per-backend run timeout in seconds (None = wait indefinitely).
    pub backend_timeout_secs: Option<u64>,
    pub on_init_failure: InitFailurePolicy,
    /// Treat unknown backend identifiers as errors.
    pub strict: bool,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Retries for timed-out requests.
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_format: OutputFormat::default(),
            output_basename: DEFAULT_OUTPUT_BASENAME.to_string(),
            workers: ExecutorConfig::default().workers,
            backend_timeout_secs: None,
            on_init_failure: InitFailurePolicy::default(),
            strict: false,
            user_agent: format!("corpus/{} (text collection)", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 5,
            request_delay_ms: 200,
            max_retries: 5,
        }
    }
}

impl Settings {
    /// Apply `CORPUS_*` environment variables.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(std::env::vars())
    }

    /// Apply `CORPUS_*` overrides from an iterator of variables.
    ///
    /// Values that do not parse are logged and ignored.
    pub fn with_overrides_from<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("CORPUS_") else {
                continue;
            };
            let applied = match name {
                "OUTPUT_DIR" => {
                    self.output_dir = expand_path(&value);
                    true
                }
                "OUTPUT_FORMAT" => set_parsed(&mut self.output_format, &value),
                "OUTPUT_BASENAME" => {
                    self.output_basename = value.clone();
                    true
                }
                "WORKERS" => set_parsed(&mut self.workers, &value),
                "BACKEND_TIMEOUT" => match value.parse() {
                    Ok(secs) => {
                        self.backend_timeout_secs = Some(secs);
                        true
                    }
                    Err(_) => false,
                },
                "ON_INIT_FAILURE" => set_parsed(&mut self.on_init_failure, &value),
                "STRICT" => set_parsed(&mut self.strict, &value),
                "USER_AGENT" => {
                    self.user_agent = value.clone();
                    true
                }
                "REQUEST_TIMEOUT" => set_parsed(&mut self.request_timeout_secs, &value),
                "REQUEST_DELAY_MS" => set_parsed(&mut self.request_delay_ms, &value),
                "MAX_RETRIES" => set_parsed(&mut self.max_retries, &value),
                _ => {
                    tracing::debug!("Ignoring unknown setting {}", key);
                    continue;
                }
            };
            if !applied {
                tracing::warn!("Ignoring invalid value for {}: '{}'", key, value);
            }
        }
        self
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers: self.workers.max(1),
            timeout: self.backend_timeout(),
        }
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, value: &str) -> bool {
    match value.parse() {
        Ok(parsed) => {
            *target = parsed;
            true
        }
        Err(_) => false,
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Settings file structure. Every field is optional and only overrides the
/// defaults when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_basename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_init_failure: Option<InitFailurePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// File this config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `corpus.*` settings file with prefer.
    ///
    /// A missing or unreadable discovered file falls back to defaults.
    pub async fn load() -> Self {
        match prefer::load(SETTINGS_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring settings file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load settings from a specific file, parsed by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_config_file(path).await?;
        let mut config: Config = parse_by_extension(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve `~` and paths relative to `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = expand_path(path_str);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref output_dir) = self.output_dir {
            settings.output_dir = self.resolve_path(output_dir, base_dir);
        }
        if let Some(format) = self.output_format {
            settings.output_format = format;
        }
        if let Some(ref basename) = self.output_basename {
            settings.output_basename = basename.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(timeout) = self.backend_timeout_secs {
            settings.backend_timeout_secs = Some(timeout);
        }
        if let Some(policy) = self.on_init_failure {
            settings.on_init_failure = policy;
        }
        if let Some(strict) = self.strict {
            settings.strict = strict;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout_secs {
            settings.request_timeout_secs = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
    }
}

/// Options for [`load_settings`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit settings file (overrides discovery; errors are reported).
    pub settings_path: Option<PathBuf>,
}

/// Resolve settings: defaults, then the settings file, then `CORPUS_*`
/// environment variables. Command-line flags are applied by the caller.
pub async fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let config = match options.settings_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Using settings file {}", path.display());
    }

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    Ok(settings.with_env_overrides())
}
