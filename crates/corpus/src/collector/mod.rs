//! Collector pipeline: build backends from a run configuration, run them
//! concurrently, and merge their output into a [`TextContainer`].
//!
//! ```text
//! RunConfiguration -> PipelineBuilder -> BuiltPipeline -> PipelineExecutor -> ExecutionOutcome
//! ```
//!
//! [`TextContainer`]: crate::container::TextContainer

mod builder;
mod events;
mod executor;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendError;

pub use builder::{BuildReport, BuiltPipeline, InitFailure, PipelineBuilder};
pub use events::CollectorEvent;
pub use executor::{BackendFailure, ExecutionOutcome, ExecutorConfig, PipelineExecutor};

/// What the builder does when a backend's `initialise` fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum InitFailurePolicy {
    /// Leave the backend out, record it in the build report and continue.
    #[default]
    Skip,
    /// Stop building and return the error.
    Abort,
}

impl FromStr for InitFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(InitFailurePolicy::Skip),
            "abort" => Ok(InitFailurePolicy::Abort),
            other => Err(format!("Unknown init failure policy '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown backend identifier '{0}'")]
    UnknownBackend(String),

    #[error("Failed to initialise backend '{identifier}': {source}")]
    Initialise {
        identifier: String,
        #[source]
        source: BackendError,
    },
}
