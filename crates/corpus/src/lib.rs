//! corpus - concurrent text collection and normalization engine.
//!
//! Core library exposing the backend contract, registry, collector pipeline,
//! text passes and tabular output for workspace crates.

pub mod backend;
pub mod collector;
pub mod config;
pub mod container;
pub mod output;
pub mod text;

pub use backend::{Backend, BackendError, BackendFactory, BackendRegistry, InitArgs};
pub use collector::{
    BackendFailure, BuildError, BuildReport, BuiltPipeline, CollectorEvent, ExecutionOutcome,
    ExecutorConfig, InitFailurePolicy, PipelineBuilder, PipelineExecutor,
};
pub use config::{ConfigError, RunConfiguration, Settings};
pub use container::TextContainer;
pub use output::{OutputFormat, WriteError};
pub use text::{PassCatalog, PassSpec, TextPass, TextPipeline};
