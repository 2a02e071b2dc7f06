//! corpus-scrape - scraping and lyrics API backends for corpus.
//!
//! Provides the shared HTTP client and the built-in backends:
//! - `genius`: song lyrics through the Genius API
//! - `short_stories`: a paged short story blog
//! - `1001_stories`: a genre-indexed story site
//! - `1001_gedichten`: a genre-indexed poetry site

pub mod backends;
pub mod http_client;

pub use backends::{default_registry, register_builtin_backends, ScrapeOptions};
pub use http_client::{HttpClient, HttpError};
