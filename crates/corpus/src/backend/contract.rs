//! The capability contract every backend implements.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::text::PipelineError;

/// Name reported by a backend that has not been initialised yet.
pub const DEFAULT_BACKEND_NAME: &str = "NO NAME";

/// Errors from backend initialisation and runs.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid backend arguments: {0}")]
    InvalidArguments(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected upstream data: {0}")]
    Upstream(String),

    #[error("Text pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Backend timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Backend panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::InvalidArguments(err.to_string())
    }
}

/// Initialisation pair handed to [`Backend::initialise`].
///
/// `arguments` is the backend-specific configuration blob serialized as a
/// JSON document. The core never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
    /// Display name the backend reports once initialised (its column key).
    pub display_name: String,
    /// Serialized configuration blob.
    pub arguments: String,
}

impl InitArgs {
    pub fn new(display_name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument blob into a backend's typed configuration.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        serde_json::from_str(&self.arguments).map_err(|e| {
            BackendError::InvalidArguments(format!(
                "{} (backend '{}')",
                e, self.display_name
            ))
        })
    }
}

/// A pluggable data source.
///
/// Lifecycle: created by a registry factory, initialised once, run once,
/// then dropped. Calling `initialise` twice with different arguments is not
/// guarded and leaves the backend in whatever state the implementation
/// chooses.
#[async_trait]
pub trait Backend: Send {
    /// Parse the argument blob, store the display name and prepare clients.
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError>;

    /// Gather and post-process text.
    ///
    /// "No results" is an empty vector, never an error.
    async fn run(&mut self) -> Result<Vec<String>, BackendError>;

    /// Display name set during `initialise`.
    fn backend_name(&self) -> &str;
}
