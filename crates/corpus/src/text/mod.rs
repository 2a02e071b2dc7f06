//! Text normalization pipeline.
//!
//! A [`TextPipeline`] is an ordered list of named passes. Every pass has the
//! same shape, `(text, extra arguments) -> text`, and each one sweeps the
//! whole batch before the next pass starts.
//!
//! [`passes`] holds the concrete transforms; [`PassCatalog`] exposes them by
//! name so pipelines can be declared in configuration.

mod catalog;
mod error;
pub mod passes;
mod pipeline;

pub use catalog::{CatalogEntry, PassCatalog, PassSpec, PrepareFn};
pub use error::{PassError, PipelineError};
pub use pipeline::{Batch, TextPass, TextPipeline, TransformFn};
