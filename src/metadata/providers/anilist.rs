//! AniList metadata provider.
//!
//! Implements [`MetadataProvider`] against the AniList GraphQL API.
//!
//! Features:
//! - Token-bucket rate limiting (requests per minute) via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - Search text travels as a GraphQL variable, never spliced into the query.
//! - Requests race the caller's cancellation token.

use std::num::NonZeroU32;
use std::time::Duration;

use anilib_common::{AnimeFormat, AnimeStatus};
use anilib_db::models::AnimeTitle;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::MetadataConfig;
use crate::metadata::provider::{AnimeCandidate, FuzzyDate, LookupError, MetadataProvider};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_RETRIES: u32 = 3;

const SEARCH_QUERY: &str = r#"
query ($search: String, $perPage: Int) {
  Page(page: 1, perPage: $perPage) {
    media(search: $search, type: ANIME) {
      id
      title { romaji english native }
      coverImage { extraLarge }
      description
      episodes
      startDate { year month day }
      status
      genres
      format
    }
  }
}
"#;

// ---------------------------------------------------------------------------
// AniList response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<SearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Media {
    id: i64,
    #[serde(default)]
    title: MediaTitle,
    cover_image: Option<CoverImage>,
    description: Option<String>,
    episodes: Option<u32>,
    start_date: Option<StartDate>,
    status: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverImage {
    extra_large: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartDate {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

impl From<Media> for AnimeCandidate {
    fn from(media: Media) -> Self {
        let start_date = media
            .start_date
            .map(|d| FuzzyDate {
                year: d.year,
                month: d.month,
                day: d.day,
            })
            .unwrap_or_default();

        AnimeCandidate {
            external_id: media.id,
            title: AnimeTitle {
                romaji: media.title.romaji,
                english: media.title.english,
                native: media.title.native,
            },
            cover_url: media.cover_image.and_then(|c| c.extra_large),
            description: media.description,
            episodes: media.episodes,
            start_date,
            status: media
                .status
                .and_then(|s| s.parse().ok())
                .unwrap_or(AnimeStatus::Unknown),
            genres: media.genres,
            format: media
                .format
                .and_then(|f| f.parse().ok())
                .unwrap_or(AnimeFormat::Unknown),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// AniList metadata provider.
///
/// # Examples
///
/// ```no_run
/// use anilib::config::MetadataConfig;
/// use anilib::metadata::providers::AniListProvider;
///
/// let provider = AniListProvider::new(&MetadataConfig::default()).unwrap();
/// ```
pub struct AniListProvider {
    client: reqwest::Client,
    endpoint: String,
    per_page: u32,
    rate_limiter: DirectLimiter,
}

impl AniListProvider {
    /// Create a provider from the `[metadata]` config section.
    pub fn new(config: &MetadataConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| anyhow::anyhow!("requests_per_minute must be at least 1"))?;
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            per_page: config.candidates.max(1),
            rate_limiter,
        })
    }

    /// POST the search with rate limiting and 429-retry logic.
    async fn post_search(&self, query: &str) -> Result<GraphQlResponse, LookupError> {
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": { "search": query, "perPage": self.per_page },
        });

        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| classify_transport_error(query, e))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "AniList returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let status = resp.status();
            // AniList reports GraphQL errors with a 4xx status and a JSON body.
            let parsed = resp.json::<GraphQlResponse>().await;
            return match parsed {
                Ok(body) => Ok(body),
                Err(_) if !status.is_success() => {
                    Err(LookupError::request(query, format!("HTTP {status}")))
                }
                Err(e) => Err(LookupError::request(
                    query,
                    format!("malformed response: {e}"),
                )),
            };
        }
    }
}

/// Connection-level failures mean every other request will fail too.
fn classify_transport_error(query: &str, err: reqwest::Error) -> LookupError {
    if err.is_connect() {
        LookupError::Unavailable(err.to_string())
    } else {
        LookupError::request(query, err)
    }
}

#[async_trait]
impl MetadataProvider for AniListProvider {
    fn name(&self) -> &'static str {
        "anilist"
    }

    async fn search_anime(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnimeCandidate>, LookupError> {
        debug!(query = %query, "AniList search anime");

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(LookupError::Cancelled),
            body = self.post_search(query) => body?,
        };

        if let Some(data) = body.data {
            return Ok(data.page.media.into_iter().map(AnimeCandidate::from).collect());
        }

        let message = body
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        Err(LookupError::request(
            query,
            if message.is_empty() { "empty response".to_string() } else { message },
        ))
    }
}
