//! Backend abstraction for text collection sources.
//!
//! A backend gathers raw text from one external source (a lyrics API, a
//! story site), normalizes it and hands the result to the collector.
//! Backends are created through a [`BackendRegistry`] so new sources can be
//! added without touching the builder or executor.

mod contract;
mod registry;

pub use contract::{Backend, BackendError, InitArgs, DEFAULT_BACKEND_NAME};
pub use registry::{BackendFactory, BackendRegistry};
