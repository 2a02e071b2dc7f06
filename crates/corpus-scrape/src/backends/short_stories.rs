//! Short stories from a paged story blog.

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use corpus::backend::DEFAULT_BACKEND_NAME;
use corpus::text::{PassSpec, TextPipeline};
use corpus::{Backend, BackendError, InitArgs};

use super::{
    build_pipeline, not_initialised, page_path, resolve_link, selector, text_with_breaks,
    ScrapeOptions,
};
use crate::http_client::HttpClient;

pub(super) const IDENTIFIER: &str = "short_stories";

/// A full index page lists this many stories.
const STORIES_PER_PAGE: usize = 6;

const ARTICLE_SELECTOR: &str = "div#content.content.content-home article";
const LINK_SELECTOR: &str = "div.post-inner a";
const STORY_SELECTOR: &str = "div.post-content.single-post-content";

#[derive(Debug, Clone, Deserialize)]
pub struct ShortStoriesConfig {
    /// First index page.
    pub base_url: String,
    /// Path of later index pages, with `{}` for the page number.
    pub page_url: String,
    /// Maximum number of stories to collect.
    pub amount: usize,
    #[serde(default)]
    pub passes: Option<Vec<PassSpec>>,
}

fn default_passes() -> Vec<PassSpec> {
    vec![
        PassSpec::new("filter_out_non_dutch"),
        PassSpec::new("remove_first_sentence"),
        PassSpec::new("remove_quotation_marks"),
        PassSpec::new("remove_special_unicode_character"),
        PassSpec::new("remove_excessive_newlines"),
        PassSpec::new("newline_after_punctuation").with_transform("each_sentence_on_new_line"),
        PassSpec::new("remove_brackets")
            .with_transform("remove_text_between_brackets")
            .with_args([" "]),
        PassSpec::new("remove_multiple_dots"),
        PassSpec::new("remove_special_characters").with_transform("remove_non_alphanumeric"),
        PassSpec::new("remove_punctuation_if_not_preceded_by_text"),
    ]
}

struct Ready {
    config: ShortStoriesConfig,
    client: HttpClient,
    pipeline: TextPipeline,
}

/// Scrapes story pages linked from a paged index.
pub struct ShortStoriesBackend {
    options: ScrapeOptions,
    name: Option<String>,
    ready: Option<Ready>,
}

impl ShortStoriesBackend {
    pub fn new(options: ScrapeOptions) -> Self {
        Self {
            options,
            name: None,
            ready: None,
        }
    }
}

impl Default for ShortStoriesBackend {
    fn default() -> Self {
        Self::new(ScrapeOptions::default())
    }
}

#[async_trait]
impl Backend for ShortStoriesBackend {
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError> {
        let config: ShortStoriesConfig = args.parse()?;
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
        let stories = ready.collect().await?;
        tracing::info!("[{}] collected {} stories", IDENTIFIER, stories.len());
        Ok(ready.pipeline.run_pipeline(stories)?)
    }

    fn backend_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BACKEND_NAME)
    }
}

impl Ready {
    async fn collect(&self) -> Result<Vec<String>, BackendError> {
        let config = &self.config;
        let mut stories = Vec::new();
        let mut url = config.base_url.clone();
        let mut page = 1;

        while stories.len() < config.amount {
            let index = self.client.get_text(&url).await?;
            let links = parse_index(&index, &url)?;
            let wanted = config.amount - stories.len();

            let mut fetched = 0;
            for link in links.iter().take(wanted) {
                fetched += 1;
                match self.fetch_story(link).await {
                    Ok(Some(story)) => stories.push(story),
                    Ok(None) => tracing::warn!("[{}] no story text on {}", IDENTIFIER, link),
                    Err(e) => tracing::warn!("[{}] skipping {}: {}", IDENTIFIER, link, e),
                }
            }
            tracing::debug!("[{}] page {}: {} stories", IDENTIFIER, page, fetched);

            if fetched != STORIES_PER_PAGE {
                break;
            }
            page += 1;
            url = format!("{}{}", config.base_url, page_path(&config.page_url, page));
        }

        Ok(stories)
    }

    async fn fetch_story(&self, url: &str) -> Result<Option<String>, BackendError> {
        let html = self.client.get_text(url).await?;
        parse_story(&html)
    }
}

/// Story links on an index page, one per article.
fn parse_index(html: &str, page_url: &str) -> Result<Vec<String>, BackendError> {
    let document = Html::parse_document(html);
    let articles = selector(ARTICLE_SELECTOR)?;
    let link = selector(LINK_SELECTOR)?;

    let mut links = Vec::new();
    for article in document.select(&articles) {
        let href = article
            .select(&link)
            .next()
            .and_then(|a| a.value().attr("href"));
        if let Some(href) = href {
            links.push(resolve_link(page_url, href)?);
        }
    }
    Ok(links)
}

fn parse_story(html: &str) -> Result<Option<String>, BackendError> {
    let document = Html::parse_document(html);
    let story = selector(STORY_SELECTOR)?;
    Ok(document.select(&story).next().map(text_with_breaks))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><body>
        <div id="content" class="content content-home">
            <article><div class="post-inner"><a href="https://verhalen.example/de-kat/">De kat</a><a href="/ignored">x</a></div></article>
            <article><div class="post-inner"><a href="/de-hond/">De hond</a></div></article>
            <article><div class="post-inner"><span>geen link</span></div></article>
        </div>
        <div class="sidebar"><article><div class="post-inner"><a href="/elders/">Elders</a></div></article></div>
    </body></html>"#;

    #[test]
    fn test_parse_index() {
        let links = parse_index(INDEX, "https://verhalen.example/").unwrap();
        assert_eq!(
            links,
            vec![
                "https://verhalen.example/de-kat/",
                "https://verhalen.example/de-hond/"
            ]
        );
    }

    #[test]
    fn test_parse_story() {
        let html = r#"<div class="post-content single-post-content"><p>Er was eens.</p><p>Het einde.</p></div>"#;
        assert_eq!(
            parse_story(html).unwrap().as_deref(),
            Some("Er was eens.Het einde.")
        );
        assert_eq!(parse_story("<div>leeg</div>").unwrap(), None);
    }

    #[test]
    fn test_initialise() {
        let mut backend = ShortStoriesBackend::default();
        assert_eq!(backend.backend_name(), DEFAULT_BACKEND_NAME);

        backend
            .initialise(InitArgs::new(
                "Korte verhalen",
                r#"{"base_url": "https://verhalen.example/", "page_url": "page/{}/", "amount": 12}"#,
            ))
            .unwrap();
        assert_eq!(backend.backend_name(), "Korte verhalen");

        let ready = backend.ready.as_ref().unwrap();
        assert_eq!(ready.config.amount, 12);
        assert_eq!(ready.pipeline.len(), default_passes().len());
        assert_eq!(ready.pipeline.pass_ids()[5], "newline_after_punctuation");
    }

    #[test]
    fn test_initialise_rejects_bad_arguments() {
        let mut backend = ShortStoriesBackend::default();
        let err = backend
            .initialise(InitArgs::new(
                "Verhalen",
                r#"{"base_url": "https://verhalen.example/"}"#,
            ))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidArguments(_)));
    }

    #[test]
    fn test_initialise_rejects_bad_pass_arguments() {
        let blobs = [
            r#"[{"name": "bad", "transform": "replace_regex_pattern", "args": ["(", ""]}]"#,
            r#"[{"name": "bad", "transform": "replace_regex_pattern", "args": ["x", "", "q"]}]"#,
            r#"[{"name": "bad", "transform": "filter_language", "args": ["zzz"]}]"#,
        ];
        for passes in blobs {
            let mut backend = ShortStoriesBackend::default();
            let blob = format!(
                r#"{{"base_url": "https://verhalen.example/", "page_url": "page/{{}}/", "amount": 1, "passes": {}}}"#,
                passes
            );
            let err = backend.initialise(InitArgs::new("Verhalen", blob)).unwrap_err();
            assert!(matches!(err, BackendError::InvalidArguments(_)), "{}", passes);
            assert!(backend.ready.is_none());
            assert_eq!(backend.backend_name(), DEFAULT_BACKEND_NAME);
        }
    }

    #[tokio::test]
    async fn test_run_before_initialise_fails() {
        let mut backend = ShortStoriesBackend::default();
        assert!(matches!(backend.run().await, Err(BackendError::Other(_))));
    }

    #[test]
    fn test_default_pipeline_drops_non_dutch() {
        let pipeline = build_pipeline(None, default_passes).unwrap();
        let english =
            "Hello world, this is a test sentence written in plain English for the detector.";
        assert_eq!(pipeline.run_pipeline(english).unwrap(), vec![String::new()]);
    }
}
