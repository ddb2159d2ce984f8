//! In-process backend.
//!
//! Backs the CLI's `--offline` mode and doubles as a call-counting spy with
//! fault injection for tests.

use async_trait::async_trait;
use media_compose_models::{Episode, ListCatalogEntry, MediaReference, Rating, Season, VoteChoice};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::error::BackendError;
use crate::traits::{CacheInvalidator, MetadataProvider, SocialBackend};
use crate::types::{FeedPostPayload, PollId, PostId, ResourceKind, TrackDestination, TrackOptions, TrackReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SearchMedia,
    GetSeasons,
    GetEpisodes,
    GetGenres,
    TrackMedia,
    CreateFeedPost,
    RateMedia,
    CreatePoll,
    AddRankItem,
    SetVote,
    UnsetVote,
    SetLike,
    UnsetLike,
    ListCatalog,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Operation::SearchMedia
                | Operation::GetSeasons
                | Operation::GetEpisodes
                | Operation::GetGenres
                | Operation::ListCatalog
        )
    }
}

#[derive(Debug, Clone)]
enum FailureMode {
    Once(BackendError),
    Always(BackendError),
}

#[derive(Debug, Clone)]
pub struct StoredPoll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Default)]
struct MemoryState {
    search_index: Vec<Value>,
    seasons: HashMap<String, Vec<Season>>,
    episodes: HashMap<(String, u32), Vec<Episode>>,
    genres: HashMap<String, Vec<String>>,
    catalog: Vec<ListCatalogEntry>,

    lists: HashMap<TrackDestination, Vec<MediaReference>>,
    posts: Vec<(PostId, FeedPostPayload)>,
    ratings: HashMap<MediaReference, (Rating, Option<String>)>,
    polls: Vec<StoredPoll>,
    ranks: HashMap<String, Vec<MediaReference>>,
    votes: HashMap<String, VoteChoice>,
    likes: HashSet<String>,

    calls: HashMap<Operation, usize>,
    call_log: Vec<Operation>,
    failures: HashMap<Operation, FailureMode>,
    invalidations: Vec<ResourceKind>,
    next_id: u64,
}

pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            latency: None,
        }
    }

    /// Delay every call by `latency` (lets tests overlap requests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_search_results(self, results: Vec<Value>) -> Self {
        self.state().search_index = results;
        self
    }

    pub fn with_seasons(self, parent_id: &str, seasons: Vec<Season>) -> Self {
        self.state().seasons.insert(parent_id.to_string(), seasons);
        self
    }

    pub fn with_episodes(self, parent_id: &str, season: u32, episodes: Vec<Episode>) -> Self {
        self.state().episodes.insert((parent_id.to_string(), season), episodes);
        self
    }

    pub fn with_genres(self, media: &MediaReference, genres: &[&str]) -> Self {
        self.state()
            .genres
            .insert(media.key(), genres.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn with_catalog(self, catalog: Vec<ListCatalogEntry>) -> Self {
        self.state().catalog = catalog;
        self
    }

    /// Fail every subsequent call to `op` with `error`.
    pub fn fail(&self, op: Operation, error: BackendError) {
        self.state().failures.insert(op, FailureMode::Always(error));
    }

    /// Fail only the next call to `op`.
    pub fn fail_once(&self, op: Operation, error: BackendError) {
        self.state().failures.insert(op, FailureMode::Once(error));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every call in the order it was made.
    pub fn call_log(&self) -> Vec<Operation> {
        self.state().call_log.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.state().call_log.iter().filter(|op| op.is_write()).count()
    }

    pub fn list_contents(&self, destination: &TrackDestination) -> Vec<MediaReference> {
        self.state().lists.get(destination).cloned().unwrap_or_default()
    }

    pub fn posts(&self) -> Vec<(PostId, FeedPostPayload)> {
        self.state().posts.clone()
    }

    pub fn rating_for(&self, media: &MediaReference) -> Option<Rating> {
        self.state().ratings.get(media).map(|(rating, _)| *rating)
    }

    pub fn polls(&self) -> Vec<StoredPoll> {
        self.state().polls.clone()
    }

    pub fn rank_contents(&self, rank_id: &str) -> Vec<MediaReference> {
        self.state().ranks.get(rank_id).cloned().unwrap_or_default()
    }

    pub fn vote_for(&self, target_id: &str) -> Option<VoteChoice> {
        self.state().votes.get(target_id).copied()
    }

    pub fn is_liked(&self, target_id: &str) -> bool {
        self.state().likes.contains(target_id)
    }

    pub fn invalidations(&self) -> Vec<ResourceKind> {
        self.state().invalidations.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, simulate latency, then apply any injected failure.
    async fn enter(&self, op: Operation) -> Result<(), BackendError> {
        {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.call_log.push(op);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state();
        match state.failures.get(&op).cloned() {
            Some(FailureMode::Always(error)) => Err(error),
            Some(FailureMode::Once(error)) => {
                state.failures.remove(&op);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.next_id += 1;
        format!("{}-{}", prefix, state.next_id)
    }
}

fn result_title(value: &Value) -> Option<&str> {
    value
        .get("title")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
}

#[async_trait]
impl MetadataProvider for InMemoryBackend {
    fn provider_name(&self) -> &str {
        "memory"
    }

    async fn search_media(&self, query: &str) -> Result<Vec<Value>, BackendError> {
        self.enter(Operation::SearchMedia).await?;
        let needle = query.trim().to_lowercase();
        let results: Vec<Value> = self
            .state()
            .search_index
            .iter()
            .filter(|value| {
                result_title(value)
                    .map(|title| title.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        debug!(query, results = results.len(), "In-memory search");
        Ok(results)
    }

    async fn get_seasons(&self, parent_id: &str) -> Result<Vec<Season>, BackendError> {
        self.enter(Operation::GetSeasons).await?;
        Ok(self.state().seasons.get(parent_id).cloned().unwrap_or_default())
    }

    async fn get_episodes(&self, parent_id: &str, season: u32) -> Result<Vec<Episode>, BackendError> {
        self.enter(Operation::GetEpisodes).await?;
        Ok(self
            .state()
            .episodes
            .get(&(parent_id.to_string(), season))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_genres(&self, media: &MediaReference) -> Result<Vec<String>, BackendError> {
        self.enter(Operation::GetGenres).await?;
        Ok(self.state().genres.get(&media.key()).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SocialBackend for InMemoryBackend {
    async fn track_media(
        &self,
        media: &MediaReference,
        destination: &TrackDestination,
        _options: &TrackOptions,
    ) -> Result<TrackReceipt, BackendError> {
        self.enter(Operation::TrackMedia).await?;
        let mut state = self.state();
        let items = state.lists.entry(destination.clone()).or_default();
        if items.contains(media) {
            return Ok(TrackReceipt { already_present: true });
        }
        items.push(media.clone());
        Ok(TrackReceipt { already_present: false })
    }

    async fn create_feed_post(&self, payload: &FeedPostPayload) -> Result<PostId, BackendError> {
        self.enter(Operation::CreateFeedPost).await?;
        let id = PostId(self.next_id("post"));
        self.state().posts.push((id.clone(), payload.clone()));
        Ok(id)
    }

    async fn rate_media(
        &self,
        media: &MediaReference,
        rating: Rating,
        review: Option<&str>,
    ) -> Result<(), BackendError> {
        self.enter(Operation::RateMedia).await?;
        self.state()
            .ratings
            .insert(media.clone(), (rating, review.map(str::to_string)));
        Ok(())
    }

    async fn create_poll(&self, question: &str, options: &[String]) -> Result<PollId, BackendError> {
        self.enter(Operation::CreatePoll).await?;
        let id = PollId(self.next_id("poll"));
        self.state().polls.push(StoredPoll {
            id: id.clone(),
            question: question.to_string(),
            options: options.to_vec(),
        });
        Ok(id)
    }

    async fn add_rank_item(&self, rank_id: &str, media: &MediaReference) -> Result<(), BackendError> {
        self.enter(Operation::AddRankItem).await?;
        let mut state = self.state();
        let items = state.ranks.entry(rank_id.to_string()).or_default();
        if !items.contains(media) {
            items.push(media.clone());
        }
        Ok(())
    }

    async fn set_vote(&self, target_id: &str, choice: VoteChoice) -> Result<(), BackendError> {
        self.enter(Operation::SetVote).await?;
        self.state().votes.insert(target_id.to_string(), choice);
        Ok(())
    }

    async fn unset_vote(&self, target_id: &str) -> Result<(), BackendError> {
        self.enter(Operation::UnsetVote).await?;
        self.state().votes.remove(target_id);
        Ok(())
    }

    async fn set_like(&self, target_id: &str) -> Result<(), BackendError> {
        self.enter(Operation::SetLike).await?;
        self.state().likes.insert(target_id.to_string());
        Ok(())
    }

    async fn unset_like(&self, target_id: &str) -> Result<(), BackendError> {
        self.enter(Operation::UnsetLike).await?;
        self.state().likes.remove(target_id);
        Ok(())
    }

    async fn list_catalog(&self) -> Result<Vec<ListCatalogEntry>, BackendError> {
        self.enter(Operation::ListCatalog).await?;
        Ok(self.state().catalog.clone())
    }
}

impl CacheInvalidator for InMemoryBackend {
    fn invalidate(&self, kind: ResourceKind) {
        self.state().invalidations.push(kind);
    }
}
