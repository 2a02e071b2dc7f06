//! Song lyrics from the Genius API.
//!
//! Artists are resolved through the search endpoint and their songs listed
//! through `/artists/{id}/songs`. Albums go through Genius' public web API.
//! Lyrics themselves are scraped from each song page.

use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use corpus::backend::DEFAULT_BACKEND_NAME;
use corpus::text::{PassSpec, TextPipeline};
use corpus::{Backend, BackendError, InitArgs};

use super::{build_pipeline, not_initialised, selector, text_with_breaks, ScrapeOptions};
use crate::http_client::HttpClient;

pub(super) const IDENTIFIER: &str = "genius";

const API_BASE: &str = "https://api.genius.com";
const WEB_API_BASE: &str = "https://genius.com/api";
const PER_PAGE: usize = 50;
const LYRICS_SELECTOR: &str = r#"div[data-lyrics-container="true"]"#;

/// An album given by name, or by name and artist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AlbumRef {
    Name(String),
    WithArtist(String, String),
}

impl AlbumRef {
    fn search_query(&self) -> String {
        match self {
            AlbumRef::Name(album) => album.clone(),
            AlbumRef::WithArtist(album, artist) => format!("{} {}", album, artist),
        }
    }

    fn album(&self) -> &str {
        match self {
            AlbumRef::Name(album) | AlbumRef::WithArtist(album, _) => album,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeniusConfig {
    pub genius_token: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub max_songs_pr_artists: i64,
    /// `title`, `popularity` or `release_date`.
    pub sort: String,
    #[serde(default)]
    pub albums: Vec<AlbumRef>,
    #[serde(default)]
    pub passes: Option<Vec<PassSpec>>,
}

fn default_passes() -> Vec<PassSpec> {
    vec![
        PassSpec::new("check_language_dutch").with_transform("filter_out_non_dutch"),
        PassSpec::new("remove_first_line").with_transform("remove_first_sentence"),
        PassSpec::new("remove_special_unicode_character"),
        PassSpec::new("remove_excess_newlines").with_transform("remove_excessive_newlines"),
        PassSpec::new("remove_non_alphanumeric"),
        PassSpec::new("replace_embed_text")
            .with_transform("replace_regex_pattern")
            .with_args([r"\s*embe\w*|You might also l\w*", "", "i"]),
        PassSpec::new("replace_refrein_text")
            .with_transform("replace_regex_pattern")
            .with_args([r"\s*Refr(\.|:|\.:|\(x\)|ain|ein)?|\(refrein 2x\)", "", "i"]),
        PassSpec::new("remove_text_in_brackets")
            .with_transform("remove_text_between_brackets")
            .with_args(["\n\n"]),
        PassSpec::new("remove_punctuation_if_not_preceded_by_text"),
    ]
}

// ============================================================================
// API payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: SongHit,
}

#[derive(Debug, Deserialize)]
struct SongHit {
    primary_artist: ArtistSummary,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistSummary {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SongsResponse {
    #[serde(default)]
    songs: Vec<SongSummary>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SongSummary {
    url: String,
}

#[derive(Debug, Deserialize)]
struct AlbumSearchResponse {
    #[serde(default)]
    sections: Vec<AlbumSection>,
}

#[derive(Debug, Deserialize)]
struct AlbumSection {
    #[serde(default)]
    hits: Vec<AlbumHit>,
}

#[derive(Debug, Deserialize)]
struct AlbumHit {
    result: AlbumSummary,
}

#[derive(Debug, Deserialize)]
struct AlbumSummary {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    tracks: Vec<Track>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Track {
    song: SongSummary,
}

// ============================================================================
// Backend
// ============================================================================

struct Ready {
    config: GeniusConfig,
    max_songs: usize,
    client: HttpClient,
    pipeline: TextPipeline,
}

pub struct GeniusBackend {
    options: ScrapeOptions,
    name: Option<String>,
    ready: Option<Ready>,
}

impl GeniusBackend {
    pub fn new(options: ScrapeOptions) -> Self {
        Self {
            options,
            name: None,
            ready: None,
        }
    }
}

impl Default for GeniusBackend {
    fn default() -> Self {
        Self::new(ScrapeOptions::default())
    }
}

#[async_trait]
impl Backend for GeniusBackend {
    fn initialise(&mut self, args: InitArgs) -> Result<(), BackendError> {
        let config: GeniusConfig = args.parse()?;
        let max_songs = usize::try_from(config.max_songs_pr_artists).map_err(|_| {
            BackendError::InvalidArguments(format!(
                "max_songs_pr_artists must not be negative, got {}",
                config.max_songs_pr_artists
            ))
        })?;
        let pipeline = build_pipeline(config.passes.as_deref(), default_passes)?;
        let client = HttpClient::builder(
            IDENTIFIER,
            self.options.request_timeout,
            self.options.request_delay,
        )
        .user_agent(&self.options.user_agent)
        .bearer_token(&config.genius_token)
        .max_retries(self.options.max_retries)
        .build()?;

        self.name = Some(args.display_name);
        self.ready = Some(Ready {
            config,
            max_songs,
            client,
            pipeline,
        });
        Ok(())
    }

    async fn run(&mut self) -> Result<Vec<String>, BackendError> {
        let ready = self.ready.as_ref().ok_or_else(|| not_initialised(IDENTIFIER))?;
        let mut lyrics = Vec::new();

        for artist in &ready.config.artists {
            let songs = ready.artist_song_urls(artist).await?;
            tracing::info!("[{}] '{}': {} songs", IDENTIFIER, artist, songs.len());
            lyrics.extend(ready.fetch_lyrics(&songs).await);
        }
        for album in &ready.config.albums {
            let songs = ready.album_song_urls(album).await?;
            tracing::info!("[{}] album '{}': {} tracks", IDENTIFIER, album.album(), songs.len());
            lyrics.extend(ready.fetch_lyrics(&songs).await);
        }

        Ok(ready.pipeline.run_pipeline(lyrics)?)
    }

    fn backend_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_BACKEND_NAME)
    }
}

impl Ready {
    /// Song page URLs for an artist, or none when the search resolves to a
    /// differently named artist.
    async fn artist_song_urls(&self, artist_name: &str) -> Result<Vec<String>, BackendError> {
        let search: Envelope<SearchResponse> = self
            .client
            .get_json(&format!("{}/search", API_BASE), &[("q", artist_name.to_string())])
            .await?;
        let Some(artist) = pick_artist(search.response, artist_name) else {
            tracing::info!("[{}] no artist named '{}'", IDENTIFIER, artist_name);
            return Ok(Vec::new());
        };

        let mut urls = Vec::new();
        let mut page = Some(1);
        while let Some(current) = page {
            if urls.len() >= self.max_songs {
                break;
            }
            let songs: Envelope<SongsResponse> = self
                .client
                .get_json(
                    &format!("{}/artists/{}/songs", API_BASE, artist.id),
                    &[
                        ("sort", self.config.sort.clone()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", current.to_string()),
                    ],
                )
                .await?;
            urls.extend(songs.response.songs.into_iter().map(|s| s.url));
            page = songs.response.next_page;
        }
        urls.truncate(self.max_songs);
        Ok(urls)
    }

    async fn album_song_urls(&self, album: &AlbumRef) -> Result<Vec<String>, BackendError> {
        let search: Envelope<AlbumSearchResponse> = self
            .client
            .get_json(
                &format!("{}/search/album", WEB_API_BASE),
                &[("q", album.search_query())],
            )
            .await?;
        let Some(found) = first_album(search.response) else {
            tracing::info!("[{}] no album named '{}'", IDENTIFIER, album.album());
            return Ok(Vec::new());
        };
        tracing::debug!("[{}] album '{}' resolved to '{}'", IDENTIFIER, album.album(), found.name);

        let mut urls = Vec::new();
        let mut page = Some(1);
        while let Some(current) = page {
            let tracks: Envelope<TracksResponse> = self
                .client
                .get_json(
                    &format!("{}/albums/{}/tracks", WEB_API_BASE, found.id),
                    &[("per_page", PER_PAGE.to_string()), ("page", current.to_string())],
                )
                .await?;
            urls.extend(tracks.response.tracks.into_iter().map(|t| t.song.url));
            page = tracks.response.next_page;
        }
        Ok(urls)
    }

    /// Lyrics of every song page that could be fetched.
    async fn fetch_lyrics(&self, song_urls: &[String]) -> Vec<String> {
        let mut lyrics = Vec::with_capacity(song_urls.len());
        for url in song_urls {
            let html = match self.client.get_text(url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("[{}] skipping {}: {}", IDENTIFIER, url, e);
                    continue;
                }
            };
            match extract_lyrics(&html) {
                Ok(Some(text)) => lyrics.push(text),
                Ok(None) => tracing::debug!("[{}] no lyrics on {}", IDENTIFIER, url),
                Err(e) => tracing::warn!("[{}] skipping {}: {}", IDENTIFIER, url, e),
            }
        }
        lyrics
    }
}

/// Case-insensitive, ignoring newlines in the configured name.
fn names_match(resolved: &str, wanted: &str) -> bool {
    resolved.to_lowercase() == wanted.replace('\n', "").to_lowercase()
}

fn pick_artist(search: SearchResponse, wanted: &str) -> Option<ArtistSummary> {
    search
        .hits
        .into_iter()
        .map(|hit| hit.result.primary_artist)
        .find(|artist| names_match(&artist.name, wanted))
}

fn first_album(search: AlbumSearchResponse) -> Option<AlbumSummary> {
    search
        .sections
        .into_iter()
        .flat_map(|section| section.hits)
        .map(|hit| hit.result)
        .next()
}

/// Lyrics containers of a song page joined by newlines.
fn extract_lyrics(html: &str) -> Result<Option<String>, BackendError> {
    let document = Html::parse_document(html);
    let containers = selector(LYRICS_SELECTOR)?;
    let parts: Vec<String> = document.select(&containers).map(text_with_breaks).collect();
    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"{
        "meta": {"status": 200},
        "response": {"hits": [
            {"type": "song", "result": {"title": "Zoutelande", "primary_artist": {"id": 12, "name": "BLØF"}}},
            {"type": "song", "result": {"title": "Mooi", "primary_artist": {"id": 34, "name": "Guus Meeuwis"}}}
        ]}
    }"#;

    #[test]
    fn test_pick_artist_by_name() {
        let search: Envelope<SearchResponse> = serde_json::from_str(SEARCH).unwrap();
        let artist = pick_artist(search.response, "guus meeuwis\n").unwrap();
        assert_eq!(artist.id, 34);
    }

    #[test]
    fn test_pick_artist_rejects_mismatch() {
        let search: Envelope<SearchResponse> = serde_json::from_str(SEARCH).unwrap();
        assert!(pick_artist(search.response, "Marco Borsato").is_none());
    }

    #[test]
    fn test_songs_page() {
        let page: Envelope<SongsResponse> = serde_json::from_str(
            r#"{"response": {"songs": [{"url": "https://genius.com/a"}, {"url": "https://genius.com/b"}], "next_page": 2}}"#,
        )
        .unwrap();
        assert_eq!(page.response.songs.len(), 2);
        assert_eq!(page.response.next_page, Some(2));
    }

    #[test]
    fn test_first_album() {
        let search: Envelope<AlbumSearchResponse> = serde_json::from_str(
            r#"{"response": {"sections": [{"type": "album", "hits": [
                {"result": {"id": 7, "name": "Umoja", "artist": {"name": "BLØF"}}}
            ]}]}}"#,
        )
        .unwrap();
        let album = first_album(search.response).unwrap();
        assert_eq!((album.id, album.name.as_str()), (7, "Umoja"));
    }

    #[test]
    fn test_extract_lyrics() {
        let html = r#"<html><body>
            <div data-lyrics-container="true">[Couplet 1]<br>Zoutelande<br><i>bij jou zijn</i></div>
            <div class="ad">Advertentie</div>
            <div data-lyrics-container="true">[Refrein]<br>Laat me</div>
        </body></html>"#;
        assert_eq!(
            extract_lyrics(html).unwrap().as_deref(),
            Some("[Couplet 1]\nZoutelande\nbij jou zijn\n[Refrein]\nLaat me")
        );
        assert_eq!(extract_lyrics("<p>niets</p>").unwrap(), None);
    }

    #[test]
    fn test_album_refs() {
        let config: GeniusConfig = serde_json::from_str(
            r#"{"genius_token": "t", "max_songs_pr_artists": 3, "sort": "popularity",
                "albums": ["Umoja", ["Omarm", "BLØF"]]}"#,
        )
        .unwrap();
        assert_eq!(
            config.albums,
            vec![
                AlbumRef::Name("Umoja".to_string()),
                AlbumRef::WithArtist("Omarm".to_string(), "BLØF".to_string())
            ]
        );
        assert_eq!(config.albums[1].search_query(), "Omarm BLØF");
        assert!(config.artists.is_empty());
    }

    #[test]
    fn test_negative_song_count_rejected() {
        let mut backend = GeniusBackend::default();
        let err = backend
            .initialise(InitArgs::new(
                "Genius",
                r#"{"genius_token": "t", "max_songs_pr_artists": -1, "sort": "title"}"#,
            ))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidArguments(msg) if msg.contains("negative")));
        assert_eq!(backend.backend_name(), DEFAULT_BACKEND_NAME);
    }

    #[test]
    fn test_token_required() {
        let mut backend = GeniusBackend::default();
        let err = backend
            .initialise(InitArgs::new("Genius", r#"{"max_songs_pr_artists": 1, "sort": "title"}"#))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidArguments(_)));
    }

    #[test]
    fn test_default_pipeline_strips_markers() {
        let specs: Vec<PassSpec> = default_passes().into_iter().skip(5).take(2).collect();
        let pipeline = build_pipeline(Some(specs.as_slice()), default_passes).unwrap();
        let out = pipeline
            .run_pipeline("Couplet\nRefrein:\nWoorden\n12Embed")
            .unwrap();
        assert_eq!(out, vec!["Couplet:\nWoorden\n12".to_string()]);
    }
}
