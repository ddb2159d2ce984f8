use async_trait::async_trait;
use media_compose_models::{Episode, ListCatalogEntry, MediaReference, Rating, Season, VoteChoice};
use serde_json::Value;

use crate::error::BackendError;
use crate::types::{FeedPostPayload, PollId, PostId, ResourceKind, TrackDestination, TrackOptions, TrackReceipt};

/// Read side: search and media metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Free-text search. Results come back in whatever shape the upstream
    /// catalog uses; callers normalize them with the reference resolver.
    async fn search_media(&self, query: &str) -> Result<Vec<Value>, BackendError>;

    async fn get_seasons(&self, parent_id: &str) -> Result<Vec<Season>, BackendError>;

    async fn get_episodes(&self, parent_id: &str, season: u32) -> Result<Vec<Episode>, BackendError>;

    /// Genre names for one media item (used for profile aggregation).
    async fn get_genres(&self, media: &MediaReference) -> Result<Vec<String>, BackendError>;
}

/// Write side: lists, feed, ratings, ranks and reactions.
#[async_trait]
pub trait SocialBackend: Send + Sync {
    /// Add `media` to a list. Tracking an item that is already present
    /// succeeds with `already_present: true` and writes nothing.
    async fn track_media(
        &self,
        media: &MediaReference,
        destination: &TrackDestination,
        options: &TrackOptions,
    ) -> Result<TrackReceipt, BackendError>;

    async fn create_feed_post(&self, payload: &FeedPostPayload) -> Result<PostId, BackendError>;

    async fn rate_media(
        &self,
        media: &MediaReference,
        rating: Rating,
        review: Option<&str>,
    ) -> Result<(), BackendError>;

    /// `options` holds 2..=6 entries.
    async fn create_poll(&self, question: &str, options: &[String]) -> Result<PollId, BackendError>;

    async fn add_rank_item(&self, rank_id: &str, media: &MediaReference) -> Result<(), BackendError>;

    async fn set_vote(&self, target_id: &str, choice: VoteChoice) -> Result<(), BackendError>;
    async fn unset_vote(&self, target_id: &str) -> Result<(), BackendError>;
    async fn set_like(&self, target_id: &str) -> Result<(), BackendError>;
    async fn unset_like(&self, target_id: &str) -> Result<(), BackendError>;

    /// The user's lists and ranks, unclassified.
    async fn list_catalog(&self) -> Result<Vec<ListCatalogEntry>, BackendError>;
}

/// Signals dependent read paths to refetch.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, kind: ResourceKind);
}

/// Invalidator for adapters that keep no read caches of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, kind: ResourceKind) {
        tracing::trace!(?kind, "Invalidation ignored (no read caches)");
    }
}
