use async_trait::async_trait;
use media_compose_models::{Episode, ListCatalogEntry, MediaReference, Rating, Season, VoteChoice};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::error::BackendError;
use crate::http::api;
use crate::traits::{MetadataProvider, SocialBackend};
use crate::types::{FeedPostPayload, PollId, PostId, TrackDestination, TrackOptions, TrackReceipt};

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

/// JSON-over-HTTP implementation of both backend traits.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::InvalidUrl("URL cannot be empty".into()));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::InvalidUrl(format!(
                "{} (must start with http:// or https://)",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("marquee/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        info!(base_url = %base_url, authenticated = config.api_token.is_some(), "HTTP backend ready");
        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }
}

#[async_trait]
impl MetadataProvider for HttpBackend {
    fn provider_name(&self) -> &str {
        "http"
    }

    async fn search_media(&self, query: &str) -> Result<Vec<Value>, BackendError> {
        api::search_media(&self.client, &self.base_url, self.token(), query).await
    }

    async fn get_seasons(&self, parent_id: &str) -> Result<Vec<Season>, BackendError> {
        api::get_seasons(&self.client, &self.base_url, self.token(), parent_id).await
    }

    async fn get_episodes(&self, parent_id: &str, season: u32) -> Result<Vec<Episode>, BackendError> {
        api::get_episodes(&self.client, &self.base_url, self.token(), parent_id, season).await
    }

    async fn get_genres(&self, media: &MediaReference) -> Result<Vec<String>, BackendError> {
        api::get_genres(&self.client, &self.base_url, self.token(), media).await
    }
}

#[async_trait]
impl SocialBackend for HttpBackend {
    async fn track_media(
        &self,
        media: &MediaReference,
        destination: &TrackDestination,
        options: &TrackOptions,
    ) -> Result<TrackReceipt, BackendError> {
        api::track_media(&self.client, &self.base_url, self.token(), media, destination, options).await
    }

    async fn create_feed_post(&self, payload: &FeedPostPayload) -> Result<PostId, BackendError> {
        api::create_feed_post(&self.client, &self.base_url, self.token(), payload).await
    }

    async fn rate_media(
        &self,
        media: &MediaReference,
        rating: Rating,
        review: Option<&str>,
    ) -> Result<(), BackendError> {
        api::rate_media(&self.client, &self.base_url, self.token(), media, rating, review).await
    }

    async fn create_poll(&self, question: &str, options: &[String]) -> Result<PollId, BackendError> {
        api::create_poll(&self.client, &self.base_url, self.token(), question, options).await
    }

    async fn add_rank_item(&self, rank_id: &str, media: &MediaReference) -> Result<(), BackendError> {
        api::add_rank_item(&self.client, &self.base_url, self.token(), rank_id, media).await
    }

    async fn set_vote(&self, target_id: &str, choice: VoteChoice) -> Result<(), BackendError> {
        api::set_vote(&self.client, &self.base_url, self.token(), target_id, choice).await
    }

    async fn unset_vote(&self, target_id: &str) -> Result<(), BackendError> {
        api::remove_reaction(&self.client, &self.base_url, self.token(), target_id, "vote").await
    }

    async fn set_like(&self, target_id: &str) -> Result<(), BackendError> {
        api::set_like(&self.client, &self.base_url, self.token(), target_id).await
    }

    async fn unset_like(&self, target_id: &str) -> Result<(), BackendError> {
        api::remove_reaction(&self.client, &self.base_url, self.token(), target_id, "like").await
    }

    async fn list_catalog(&self) -> Result<Vec<ListCatalogEntry>, BackendError> {
        api::list_catalog(&self.client, &self.base_url, self.token()).await
    }
}
