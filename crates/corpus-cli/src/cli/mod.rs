//! Command-line interface for corpus.

mod commands;

pub use commands::{is_verbose, run};
