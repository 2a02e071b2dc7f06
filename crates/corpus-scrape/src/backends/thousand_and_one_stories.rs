//! Stories from a genre-indexed story site.

use async_trait::async_trait;
use serde::Deserialize;

use corpus::backend::DEFAULT_BACKEND_NAME;
use corpus::text::{PassSpec, TextPipeline};
use corpus::{Backend, BackendError, InitArgs};

use super::{
    build_pipeline, extract_links, first_paragraph, not_initialised, page_path, ScrapeOptions,
};
use crate::http_client::HttpClient;

pub(super) const IDENTIFIER: &str = "1001_stories";

/// A full genre page lists this many stories.
const STORIES_PER_PAGE: usize = 50;

const LINK_SELECTOR: &str = "div.categoryBox ul a";
const STORY_SELECTOR: &str = r#"div[style="padding-left: 20px; margin: 10px 0px;"]"#;

#[derive(Debug, Clone, Deserialize)]
pub struct ThousandStoriesConfig {
    pub base_url: String,
    /// Path of later genre pages, with `{}` for the page number.
    pub page_url: String,
    /// Maximum number of stories per genre.
    pub amount: usize,
    pub genres: Vec<String>,
    #[serde(default)]
    pub passes: Option<Vec<PassSpec>>,
}

fn default_passes() -> Vec<PassSpec> {
    vec![
        PassSpec::new("check_language_dutch").with_transform("filter_out_non_dutch"),
        PassSpec::new("remove_quotation_marks"),
        PassSpec::new("remove_special_unicode_character"),
        PassSpec::new("remove_last_sentence"),
        PassSpec::new("set_every_sentence_on_new_line")
            .with_transform("each_sentence_on_new_line"),
        PassSpec::new("remove_excessive_newlines"),
        PassSpec::new("remove_non_alphanumeric"),
        PassSpec::new("remove_multiple_dots"),
        PassSpec::new("remove_text_in_brackets")
            .with_transform("remove_text_between_brackets")
            .with_args([" "]),
        PassSpec::new("remove_punctuation_if_not_preceded_by_text"),
    ]
}

struct Ready {
    config: ThousandStoriesConfig,
    client: HttpClient,
    pipeline: TextPipeline,
}

pub struct ThousandStoriesBackend {
    options: ScrapeOptions,
    name: Option<String>,
    ready: Option<Ready>,
}

impl ThousandStoriesBackend {
    pub fn new(options: ScrapeOptions) -> Self {
        Self {
            options,
            name: None,
            ready: None,
        }
    }
}

impl Default for ThousandStoriesBackend {
    fn default() -> Self {
        Self::new(ScrapeOptions::default())
    }
}

#[async_trait]
impl Backend for ThousandStoriesBackend {
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError> {
        let config: ThousandStoriesConfig = args.parse()?;
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
        let mut stories = Vec::new();
        for genre in &ready.config.genres {
            let found = ready.collect_genre(genre).await?;
            tracing::info!("[{}] genre '{}': {} stories", IDENTIFIER, genre, found.len());
            stories.extend(found);
        }
        Ok(ready.pipeline.run_pipeline(stories)?)
    }

    fn backend_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BACKEND_NAME)
    }
}

impl Ready {
    async fn collect_genre(&self, genre: &str) -> Result<Vec<String>, BackendError> {
        let config = &self.config;
        let genre_url = genre_url(&config.base_url, genre);
        let mut url = genre_url.clone();
        let mut page = 1;
        let mut stories = Vec::new();

        while stories.len() < config.amount {
            let index = self.client.get_text(&url).await?;
            let links = extract_links(&index, LINK_SELECTOR, &config.base_url)?;
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

            if fetched != STORIES_PER_PAGE {
                break;
            }
            page += 1;
            url = format!("{}{}", genre_url, page_path(&config.page_url, page));
        }

        Ok(stories)
    }

    async fn fetch_story(&self, url: &str) -> Result<Option<String>, BackendError> {
        let html = self.client.get_text(url).await?;
        first_paragraph(&html, STORY_SELECTOR)
    }
}

fn genre_url(base_url: &str, genre: &str) -> String {
    format!("{}{}/", base_url, genre)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_url() {
        assert_eq!(
            genre_url("https://verhalen.example/", "sprookjes"),
            "https://verhalen.example/sprookjes/"
        );
        assert_eq!(
            format!(
                "{}{}",
                genre_url("https://verhalen.example/", "sprookjes"),
                page_path("{}.html", 2)
            ),
            "https://verhalen.example/sprookjes/2.html"
        );
    }

    #[test]
    fn test_story_extraction() {
        let html = r#"<html><body>
            <div style="padding-left: 20px; margin: 10px 0px;"><p>Er was eens een koning.<br>Hij was oud.</p><p>Reclame</p></div>
        </body></html>"#;
        assert_eq!(
            first_paragraph(html, STORY_SELECTOR).unwrap().as_deref(),
            Some("Er was eens een koning.\nHij was oud.")
        );
    }

    #[test]
    fn test_index_links_resolve_against_base() {
        let html = r#"<div class="categoryBox"><ul><li><a href="/verhaal/de-koning/">De koning</a></li></ul></div>"#;
        let links = extract_links(html, LINK_SELECTOR, "https://verhalen.example/").unwrap();
        assert_eq!(links, vec!["https://verhalen.example/verhaal/de-koning/"]);
    }

    #[test]
    fn test_initialise_requires_genres() {
        let mut backend = ThousandStoriesBackend::default();
        let err = backend
            .initialise(InitArgs::new(
                "1001 verhalen",
                r#"{"base_url": "https://verhalen.example/", "page_url": "{}.html", "amount": 5}"#,
            ))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidArguments(_)));

        backend
            .initialise(InitArgs::new(
                "1001 verhalen",
                r#"{"base_url": "https://verhalen.example/", "page_url": "{}.html", "amount": 5, "genres": ["sprookjes"]}"#,
            ))
            .unwrap();
        assert_eq!(backend.backend_name(), "1001 verhalen");
    }

    #[test]
    fn test_passes_override() {
        let mut backend = ThousandStoriesBackend::default();
        backend
            .initialise(InitArgs::new(
                "1001 verhalen",
                r#"{"base_url": "https://verhalen.example/", "page_url": "{}.html", "amount": 5,
                    "genres": [], "passes": [{"name": "remove_multiple_dots"}]}"#,
            ))
            .unwrap();
        let ready = backend.ready.as_ref().unwrap();
        assert_eq!(ready.pipeline.pass_ids(), vec!["remove_multiple_dots"]);
    }
}
