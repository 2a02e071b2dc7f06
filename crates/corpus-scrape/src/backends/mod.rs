//! Built-in scraping backends.
//!
//! Each backend parses its own typed configuration from the argument blob,
//! builds an [`HttpClient`] and runs what it gathers through a text pipeline.
//! The default pipeline can be replaced with a `passes` array.

mod genius;
mod short_stories;
mod thousand_and_one_gedichten;
mod thousand_and_one_stories;

use std::time::Duration;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use corpus::text::{PassCatalog, PassSpec, TextPipeline};
use corpus::{Backend, BackendError, BackendRegistry, Settings};

use crate::http_client::{HttpClient, USER_AGENT};

pub use genius::{AlbumRef, GeniusBackend, GeniusConfig};
pub use short_stories::{ShortStoriesBackend, ShortStoriesConfig};
pub use thousand_and_one_gedichten::{GedichtenBackend, GedichtenConfig};
pub use thousand_and_one_stories::{ThousandStoriesBackend, ThousandStoriesConfig};

/// Request behaviour shared by every built-in backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub max_retries: u32,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(5),
            request_delay: Duration::from_millis(200),
            max_retries: 5,
        }
    }
}

impl From<&Settings> for ScrapeOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            request_timeout: settings.request_timeout(),
            request_delay: settings.request_delay(),
            max_retries: settings.max_retries,
        }
    }
}

impl ScrapeOptions {
    pub(crate) fn client(&self, service: &str) -> Result<HttpClient, BackendError> {
        Ok(HttpClient::builder(service, self.request_timeout, self.request_delay)
            .user_agent(&self.user_agent)
            .max_retries(self.max_retries)
            .build()?)
    }
}

/// Register the built-in backends under their identifiers.
pub fn register_builtin_backends(registry: &mut BackendRegistry, options: &ScrapeOptions) {
    let opts = options.clone();
    registry.register(genius::IDENTIFIER, move || {
        Box::new(GeniusBackend::new(opts.clone())) as Box<dyn Backend>
    });
    let opts = options.clone();
    registry.register(short_stories::IDENTIFIER, move || {
        Box::new(ShortStoriesBackend::new(opts.clone())) as Box<dyn Backend>
    });
    let opts = options.clone();
    registry.register(thousand_and_one_stories::IDENTIFIER, move || {
        Box::new(ThousandStoriesBackend::new(opts.clone())) as Box<dyn Backend>
    });
    let opts = options.clone();
    registry.register(thousand_and_one_gedichten::IDENTIFIER, move || {
        Box::new(GedichtenBackend::new(opts.clone())) as Box<dyn Backend>
    });
}

/// A registry holding only the built-in backends.
pub fn default_registry(options: &ScrapeOptions) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    register_builtin_backends(&mut registry, options);
    registry
}

/// Build the configured pipeline, or the backend's default one.
pub(crate) fn build_pipeline(
    passes: Option<&[PassSpec]>,
    defaults: fn() -> Vec<PassSpec>,
) -> Result<TextPipeline, BackendError> {
    let catalog = PassCatalog::with_builtins();
    let result = match passes {
        Some(specs) => TextPipeline::from_specs(specs, &catalog),
        None => TextPipeline::from_specs(&defaults(), &catalog),
    };
    result.map_err(|e| BackendError::InvalidArguments(e.to_string()))
}

pub(crate) fn not_initialised(service: &str) -> BackendError {
    BackendError::Other(format!("{} backend used before initialise", service))
}

pub(crate) fn selector(css: &str) -> Result<Selector, BackendError> {
    Selector::parse(css)
        .map_err(|e| BackendError::Other(format!("Failed to parse selector '{}': {:?}", css, e)))
}

/// Text content of an element with `<br>` rendered as a newline.
pub(crate) fn text_with_breaks(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// `href` of every element matching `css`, resolved against `base`.
pub(crate) fn extract_links(
    html: &str,
    css: &str,
    base: &str,
) -> Result<Vec<String>, BackendError> {
    let document = Html::parse_document(html);
    let links = selector(css)?;
    let mut out = Vec::new();
    for element in document.select(&links) {
        if let Some(href) = element.value().attr("href") {
            out.push(resolve_link(base, href)?);
        }
    }
    Ok(out)
}

/// Text of the first `p` inside the first element matching `container`.
pub(crate) fn first_paragraph(html: &str, container: &str) -> Result<Option<String>, BackendError> {
    let document = Html::parse_document(html);
    let container = selector(container)?;
    let paragraph = selector("p")?;
    Ok(document
        .select(&container)
        .next()
        .and_then(|div| div.select(&paragraph).next())
        .map(text_with_breaks))
}

pub(crate) fn resolve_link(base: &str, href: &str) -> Result<String, BackendError> {
    let base = Url::parse(base).map_err(|e| {
        BackendError::InvalidArguments(format!("Invalid base URL '{}': {}", base, e))
    })?;
    base.join(href)
        .map(String::from)
        .map_err(|e| BackendError::Upstream(format!("Invalid link '{}': {}", href, e)))
}

/// Substitute a page number into a `{}` placeholder.
pub(crate) fn page_path(template: &str, page: usize) -> String {
    template.replacen("{}", &page.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_registry(&ScrapeOptions::default());
        assert_eq!(
            registry.identifiers(),
            vec!["1001_gedichten", "1001_stories", "genius", "short_stories"]
        );
    }

    #[test]
    fn test_text_with_breaks() {
        let document = Html::parse_fragment("<div>Een<br>twee <b>drie</b><br/>vier</div>");
        let div = document.select(&selector("div").unwrap()).next().unwrap();
        assert_eq!(text_with_breaks(div), "Een\ntwee drie\nvier");
    }

    #[test]
    fn test_extract_links_resolves_relative() {
        let html = r#"<div class="categoryBox"><ul>
            <li><a href="/verhaal/een/">Een</a></li>
            <li><a href="https://other.example/twee">Twee</a></li>
            <li><a>geen link</a></li>
        </ul></div>"#;
        let links =
            extract_links(html, "div.categoryBox ul a", "https://example.com/genre/").unwrap();
        assert_eq!(
            links,
            vec!["https://example.com/verhaal/een/", "https://other.example/twee"]
        );
    }

    #[test]
    fn test_first_paragraph() {
        let html = r#"<div class="x"><p>Eerste<br>regel</p><p>Tweede</p></div>"#;
        assert_eq!(
            first_paragraph(html, "div.x").unwrap().as_deref(),
            Some("Eerste\nregel")
        );
        assert_eq!(first_paragraph(html, "div.missing").unwrap(), None);
    }

    #[test]
    fn test_page_path() {
        assert_eq!(page_path("page/{}/", 3), "page/3/");
        assert_eq!(page_path("no-placeholder", 3), "no-placeholder");
    }

    #[test]
    fn test_custom_passes_replace_defaults() {
        let specs = vec![PassSpec::new("to_lowercase")];
        let pipeline = build_pipeline(Some(specs.as_slice()), Vec::new).unwrap();
        assert_eq!(pipeline.pass_ids(), vec!["to_lowercase"]);

        let bad = vec![PassSpec::new("nope")];
        assert!(matches!(
            build_pipeline(Some(bad.as_slice()), Vec::new),
            Err(BackendError::InvalidArguments(_))
        ));
    }
}
