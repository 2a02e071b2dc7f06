//! Text pipeline error types.

use thiserror::Error;

/// Errors raised by a single pass.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("Transform '{transform}' expects {expected} extra argument(s), got {got}")]
    Arity {
        transform: String,
        expected: String,
        got: usize,
    },

    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Unknown regex flag '{0}'")]
    UnknownFlag(char),

    #[error("Unknown language code '{0}'")]
    UnknownLanguage(String),

    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),
}

/// Errors from running a pipeline, tagged with the failing pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pass '{pass}' failed: {source}")]
    Pass {
        pass: String,
        #[source]
        source: PassError,
    },
}
