//! Content/account service client
//!
//! Catalog objects, stream lookups, playheads, adjacency and music catalog
//! queries, plus raw downloads of thumbnail containers from the CDN.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::wire::{
    ArtistAdjacency, DataEnvelope, PlayheadRecord, RawContent, SavePlayheadBody, StreamsResponse,
};
use crate::models::{ContentType, Step};

/// Default service endpoint
pub const DEFAULT_BASE_URL: &str = "https://beta-api.crunchyroll.com";

/// Transport-level failures talking to the service
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Operations the playback engine needs from the content/account service
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Fetch a single catalog object
    async fn get_content(&self, content_id: &str) -> Result<Option<RawContent>, ApiError>;

    /// Stream lookup; `content_type` picks the backing catalog
    async fn get_streams(
        &self,
        content_type: ContentType,
        media_id: &str,
    ) -> Result<StreamsResponse, ApiError>;

    async fn get_playheads(&self, content_ids: &[String])
        -> Result<Vec<PlayheadRecord>, ApiError>;

    async fn save_playhead(&self, content_id: &str, position_secs: u64) -> Result<(), ApiError>;

    /// Next or previous episode of a series; `None` when there is none
    async fn get_adjacent_episode(
        &self,
        content_id: &str,
        step: Step,
    ) -> Result<Option<RawContent>, ApiError>;

    /// All movies of a movie listing, in listing order
    async fn get_sibling_movies(&self, listing_id: &str) -> Result<Vec<RawContent>, ApiError>;

    async fn get_artist_adjacency(
        &self,
        artist_id: &str,
    ) -> Result<Option<ArtistAdjacency>, ApiError>;

    /// Concerts or music videos by id
    async fn get_music_items(
        &self,
        content_type: ContentType,
        ids: &[String],
    ) -> Result<Vec<RawContent>, ApiError>;

    /// Raw bytes of a thumbnail container
    async fn fetch_preview_container(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

/// HTTP implementation of [`ContentService`]
pub struct HttpContentService {
    base_url: String,
    access_token: Option<String>,
    account_id: Option<String>,
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpContentService {
    /// Create a client against the default endpoint
    pub fn new(access_token: Option<String>, account_id: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, access_token, account_id)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: Option<String>,
        account_id: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            account_id,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    fn account(&self) -> Result<&str, ApiError> {
        self.account_id
            .as_deref()
            .ok_or(ApiError::NotConfigured("account id is required for playheads"))
    }

    /// Send an authenticated request with retry logic for rate limits
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("Accept", "application/json");
            if let Some(token) = &self.access_token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            match response.status() {
                status if status.is_success() => return Ok(response),
                StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(ApiError::RateLimited);
                    }

                    // Retry-After header or exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    warn!(%url, wait_secs, retries, "rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }
                status => return Err(ApiError::ServerError(status.as_u16())),
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, endpoint, None).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))
    }

    /// GET a `{data: [...]}` envelope, mapping 404 to an empty list
    async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>, ApiError> {
        match self.get::<DataEnvelope<T>>(endpoint).await {
            Ok(envelope) => Ok(envelope.data),
            Err(ApiError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn join_ids(ids: &[String]) -> String {
    urlencoding::encode(&ids.join(",")).into_owned()
}

#[async_trait]
impl ContentService for HttpContentService {
    async fn get_content(&self, content_id: &str) -> Result<Option<RawContent>, ApiError> {
        let endpoint = format!("/content/v2/cms/objects/{}", urlencoding::encode(content_id));
        Ok(self.get_data(&endpoint).await?.into_iter().next())
    }

    async fn get_streams(
        &self,
        content_type: ContentType,
        media_id: &str,
    ) -> Result<StreamsResponse, ApiError> {
        let media_id = urlencoding::encode(media_id);
        let endpoint = match content_type {
            ContentType::Other => {
                return Err(ApiError::InvalidResponse(
                    "no stream catalog for this content type".to_string(),
                ))
            }
            music if music.is_music() => format!("/content/v2/music/{}/streams", media_id),
            _ => format!("/content/v2/cms/videos/{}/streams", media_id),
        };
        debug!(%endpoint, "looking up streams");
        self.get(&endpoint).await
    }

    async fn get_playheads(
        &self,
        content_ids: &[String],
    ) -> Result<Vec<PlayheadRecord>, ApiError> {
        let endpoint = format!(
            "/content/v2/{}/playheads?content_ids={}",
            self.account()?,
            join_ids(content_ids)
        );
        self.get_data(&endpoint).await
    }

    async fn save_playhead(&self, content_id: &str, position_secs: u64) -> Result<(), ApiError> {
        let endpoint = format!("/content/v2/{}/playheads", self.account()?);
        let body = SavePlayheadBody {
            content_id,
            playhead: position_secs,
        };
        self.send(Method::POST, &endpoint, Some(&body)).await?;
        Ok(())
    }

    async fn get_adjacent_episode(
        &self,
        content_id: &str,
        step: Step,
    ) -> Result<Option<RawContent>, ApiError> {
        let route = match step {
            Step::Next => "up_next",
            Step::Previous => "previous_episode",
        };
        let endpoint = format!(
            "/content/v2/discover/{}/{}",
            route,
            urlencoding::encode(content_id)
        );
        Ok(self.get_data(&endpoint).await?.into_iter().next())
    }

    async fn get_sibling_movies(&self, listing_id: &str) -> Result<Vec<RawContent>, ApiError> {
        let endpoint = format!(
            "/content/v2/cms/movie_listings/{}/movies",
            urlencoding::encode(listing_id)
        );
        self.get_data(&endpoint).await
    }

    async fn get_artist_adjacency(
        &self,
        artist_id: &str,
    ) -> Result<Option<ArtistAdjacency>, ApiError> {
        let endpoint = format!("/content/v2/music/artists/{}", urlencoding::encode(artist_id));
        Ok(self.get_data(&endpoint).await?.into_iter().next())
    }

    async fn get_music_items(
        &self,
        content_type: ContentType,
        ids: &[String],
    ) -> Result<Vec<RawContent>, ApiError> {
        let collection = match content_type {
            ContentType::Concert => "concerts",
            ContentType::Video => "music_videos",
            _ => return Ok(Vec::new()),
        };
        let endpoint = format!("/content/v2/music/{}/{}", collection, join_ids(ids));
        self.get_data(&endpoint).await
    }

    async fn fetch_preview_container(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        // CDN download, no service auth
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            return Err(ApiError::ServerError(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_ids_encodes_commas() {
        let ids = vec!["A1".to_string(), "B2".to_string()];
        assert_eq!(join_ids(&ids), "A1%2CB2");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpContentService::with_base_url("http://localhost:1234/", None, None);
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_playheads_need_account() {
        let client = HttpContentService::with_base_url("http://localhost", None, None);
        assert!(matches!(client.account(), Err(ApiError::NotConfigured(_))));
    }
}
