//! Poems from a genre-indexed poetry site.

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use corpus::backend::DEFAULT_BACKEND_NAME;
use corpus::text::{PassSpec, TextPipeline};
use corpus::{Backend, BackendError, InitArgs};

use super::{
    build_pipeline, extract_links, first_paragraph, not_initialised, selector, ScrapeOptions,
};
use crate::http_client::HttpClient;

pub(super) const IDENTIFIER: &str = "1001_gedichten";

const PAGER_SELECTOR: &str = "div.pages a";
const LINK_SELECTOR: &str = "div.categoryBox ul a";
const POEM_SELECTOR: &str = r#"div[style="background: #fdfdfd; padding-left: 20px; margin: 10px 0px; border-right: 1px solid #fdfdfd;"]"#;

#[derive(Debug, Clone, Deserialize)]
pub struct GedichtenConfig {
    pub base_url: String,
    /// Accepted for compatibility with existing run configurations; genre
    /// pages always follow `genre/N/`.
    #[serde(default)]
    pub page_url: Option<String>,
    /// Number of pages to visit per genre.
    pub page_amount: usize,
    pub genres: Vec<String>,
    #[serde(default)]
    pub passes: Option<Vec<PassSpec>>,
}

fn default_passes() -> Vec<PassSpec> {
    vec![
        PassSpec::new("check_language_dutch").with_transform("filter_out_non_dutch"),
        PassSpec::new("remove_all_caps")
            .with_transform("replace_regex_pattern")
            .with_args(["[A-Z]{2,}", ""]),
        PassSpec::new("remove_copyright_symbol")
            .with_transform("replace_regex_pattern")
            .with_args(["Â©.*", ""]),
        PassSpec::new("remove_tab_characters"),
        PassSpec::new("remove_quotation_marks"),
        PassSpec::new("remove_special_unicode_character"),
        PassSpec::new("remove_non_alphanumeric"),
        PassSpec::new("remove_multiple_dots"),
        PassSpec::new("remove_text_in_brackets")
            .with_transform("remove_text_between_brackets")
            .with_args([" "]),
        PassSpec::new("remove_punctuation_if_not_preceded_by_text"),
    ]
}

struct Ready {
    config: GedichtenConfig,
    client: HttpClient,
    pipeline: TextPipeline,
}

pub struct GedichtenBackend {
    options: ScrapeOptions,
    name: Option<String>,
    ready: Option<Ready>,
}

impl GedichtenBackend {
    pub fn new(options: ScrapeOptions) -> Self {
        Self {
            options,
            name: None,
            ready: None,
        }
    }
}

impl Default for GedichtenBackend {
    fn default() -> Self {
        Self::new(ScrapeOptions::default())
    }
}

#[async_trait]
impl Backend for GedichtenBackend {
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError> {
        let config: GedichtenConfig = args.parse()?;
        let pipeline = build_pipeline(config.passes.as_deref(), default_passes)?;
        let client = self.options.client(IDENTIFIER)?;
        self.name = Some(args.display_name);
        self.ready = Some(Ready {
            config,
            client,
            pipeline,
        });
        Ok(())
    }

    async fn run(&mut self) -> Result<Vec<String>, BackendError> {
        let ready = self.ready.as_ref().ok_or_else(|| not_initialised(IDENTIFIER))?;
        let mut poems = Vec::new();
        for genre in &ready.config.genres {
            for page in 1..=ready.config.page_amount {
                poems.extend(ready.collect_page(genre, page).await?);
            }
        }
        tracing::info!("[{}] collected {} poems", IDENTIFIER, poems.len());
        Ok(ready.pipeline.run_pipeline(poems)?)
    }

    fn backend_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BACKEND_NAME)
    }
}

impl Ready {
    async fn collect_page(&self, genre: &str, page: usize) -> Result<Vec<String>, BackendError> {
        let url = genre_page_url(&self.config.base_url, genre, page);
        let html = self.client.get_text(&url).await?;

        if page != 1 && pager_reports_first_page(&html)? {
            tracing::warn!("[{}] page {} of '{}' does not exist", IDENTIFIER, page, genre);
            return Ok(Vec::new());
        }

        let links = extract_links(&html, LINK_SELECTOR, &self.config.base_url)?;
        let mut poems = Vec::new();
        for link in &links {
            match self.fetch_poem(link).await {
                Ok(Some(poem)) => poems.push(poem),
                Ok(None) => tracing::debug!("[{}] no poem on {}", IDENTIFIER, link),
                Err(e) => tracing::warn!("[{}] skipping {}: {}", IDENTIFIER, link, e),
            }
        }
        Ok(poems)
    }

    async fn fetch_poem(&self, url: &str) -> Result<Option<String>, BackendError> {
        let html = self.client.get_text(url).await?;
        first_paragraph(&html, POEM_SELECTOR)
    }
}

/// `genre/` for the first page, `genre/N/` after that.
fn genre_page_url(base_url: &str, genre: &str, page: usize) -> String {
    if page > 1 {
        format!("{}{}/{}/", base_url, genre, page)
    } else {
        format!("{}{}/", base_url, genre)
    }
}

/// The site serves page one for out-of-range pages; its pager then
/// highlights "1".
fn pager_reports_first_page(html: &str) -> Result<bool, BackendError> {
    let document = Html::parse_document(html);
    let pager = selector(PAGER_SELECTOR)?;
    let strong = selector("strong")?;
    let current = document
        .select(&pager)
        .next()
        .and_then(|a| a.select(&strong).next())
        .map(|s| s.text().collect::<String>());
    Ok(current.as_deref().map(str::trim) == Some("1"))
}
