// The coordinator every presentation adapter talks to.
//
// A ComposerSession owns the session-scoped collaborators (metadata cache,
// pipeline, search, reactions). Each Composer wraps one draft and applies
// async fetch results to it only while the draft still points at the same
// target.

use media_compose_backend::{BackendError, CacheInvalidator, MetadataProvider, SocialBackend};
use media_compose_config::Config;
use media_compose_models::{
    Action, AttachmentTarget, Episode, EpisodeSelection, Intent, ListCatalogEntry, MediaReference, Season,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::attachment::AttachmentResolver;
use crate::draft::{CompositionDraft, SeasonRequest, DEFAULT_MAX_POLL_OPTIONS};
use crate::error::{ComposeError, DraftError, SubmitError, ValidationError};
use crate::genres::GenreAggregator;
use crate::metadata_cache::HierarchicalMetadataCache;
use crate::optimistic::OptimisticMutationManager;
use crate::pipeline::{SubmissionPipeline, SubmissionReport, SubmissionStatus};
use crate::search::MediaSearch;

pub struct ComposerSession {
    backend: Arc<dyn SocialBackend>,
    cache: Arc<HierarchicalMetadataCache>,
    pipeline: Arc<SubmissionPipeline>,
    search: MediaSearch,
    reactions: OptimisticMutationManager,
    genres: GenreAggregator,
    attachments: AttachmentResolver,
    max_poll_options: usize,
}

impl ComposerSession {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        backend: Arc<dyn SocialBackend>,
        invalidator: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            cache: Arc::new(HierarchicalMetadataCache::new(provider.clone())),
            pipeline: Arc::new(SubmissionPipeline::new(backend.clone(), invalidator)),
            search: MediaSearch::new(provider.clone()),
            reactions: OptimisticMutationManager::new(backend.clone()),
            genres: GenreAggregator::new(provider),
            attachments: AttachmentResolver::new(),
            max_poll_options: DEFAULT_MAX_POLL_OPTIONS,
            backend,
        }
    }

    /// Session tuned by the `[composer]` and `[metadata]` config sections.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn MetadataProvider>,
        backend: Arc<dyn SocialBackend>,
        invalidator: Arc<dyn CacheInvalidator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let composer = &config.composer;
        let metadata = &config.metadata;

        Ok(Self {
            cache: Arc::new(HierarchicalMetadataCache::new(provider.clone())),
            pipeline: Arc::new(
                SubmissionPipeline::new(backend.clone(), invalidator)
                    .with_default_list(composer.default_system_list()),
            ),
            search: MediaSearch::new(provider.clone()).with_debounce(composer.search_debounce()),
            reactions: OptimisticMutationManager::new(backend.clone()),
            genres: GenreAggregator::new(provider)
                .with_batching(metadata.genre_batch_size, metadata.genre_batch_delay()),
            attachments: AttachmentResolver::new(),
            max_poll_options: composer.max_poll_options,
            backend,
        })
    }

    /// A fresh composer sharing this session's cache and pipeline.
    pub fn composer(&self) -> Composer {
        Composer {
            draft: Mutex::new(CompositionDraft::with_max_poll_options(self.max_poll_options)),
            cache: self.cache.clone(),
            pipeline: self.pipeline.clone(),
        }
    }

    pub fn cache(&self) -> &HierarchicalMetadataCache {
        &self.cache
    }

    pub fn search(&self) -> &MediaSearch {
        &self.search
    }

    pub fn reactions(&self) -> &OptimisticMutationManager {
        &self.reactions
    }

    pub fn genres(&self) -> &GenreAggregator {
        &self.genres
    }

    pub async fn load_catalog(&self) -> Result<Vec<ListCatalogEntry>, BackendError> {
        self.backend.list_catalog().await
    }

    /// Look up a list or rank by id or title against the live catalog.
    pub async fn resolve_attachment(&self, selector: &str) -> Result<Option<AttachmentTarget>, BackendError> {
        let catalog = self.load_catalog().await?;
        Ok(self.attachments.resolve_selector(&catalog, selector))
    }
}

pub struct Composer {
    draft: Mutex<CompositionDraft>,
    cache: Arc<HierarchicalMetadataCache>,
    pipeline: Arc<SubmissionPipeline>,
}

/// Marks the draft Failed if a submit future is dropped before the pipeline
/// reports back, so the draft never stays locked.
struct InFlightSubmit<'a> {
    composer: &'a Composer,
    settled: bool,
}

impl Drop for InFlightSubmit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(operation = "submit", status = "abandoned", "Submission dropped before completion");
            self.composer.draft().finish_submit(SubmissionStatus::Failed);
        }
    }
}

impl Composer {
    fn draft(&self) -> MutexGuard<'_, CompositionDraft> {
        self.draft.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> CompositionDraft {
        self.draft().clone()
    }

    pub fn select_intent(&self, intent: Intent) -> Result<(), DraftError> {
        self.draft().select_intent(intent)
    }

    pub fn select_action(&self, action: Action) -> bool {
        self.draft().select_action(action)
    }

    /// Apply a synchronous edit to the draft.
    pub fn edit<R>(&self, f: impl FnOnce(&mut CompositionDraft) -> Result<R, DraftError>) -> Result<R, DraftError> {
        f(&mut self.draft())
    }

    /// Replace the media; TV media loads its seasons through the cache.
    pub async fn set_media(&self, media: Option<MediaReference>) -> Result<(), ComposeError> {
        let request = self.draft().set_media(media)?;
        if let Some(request) = request {
            self.load_seasons(request).await?;
        }
        Ok(())
    }

    /// Seasons for the current TV media (cached after the first call).
    pub async fn seasons(&self) -> Result<Vec<Season>, ComposeError> {
        let request = self.draft().season_request().ok_or(DraftError::NotTv)?;
        Ok(self.load_seasons(request).await?)
    }

    async fn load_seasons(&self, request: SeasonRequest) -> Result<Vec<Season>, BackendError> {
        let seasons = self.cache.get_seasons(&request.parent_id).await?;
        self.draft().apply_seasons(&request, seasons.clone());
        Ok(seasons)
    }

    pub async fn select_season(&self, season: u32) -> Result<Vec<Episode>, ComposeError> {
        let request = self.draft().select_season(season)?;
        let episodes = self.cache.get_episodes(&request.parent_id, request.season).await?;
        self.draft().apply_episodes(&request, episodes.clone());
        Ok(episodes)
    }

    pub fn select_episode(&self, selection: Option<EpisodeSelection>) -> Result<(), DraftError> {
        self.draft().select_episode(selection)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.draft().validate()
    }

    /// Validate, run the pipeline, record the outcome on the draft.
    ///
    /// A draft that fails validation never reaches the network. Only one
    /// submission per draft may be in flight.
    pub async fn submit(&self) -> Result<SubmissionReport, SubmitError> {
        let validated = self.draft().begin_submit()?;
        let mut in_flight = InFlightSubmit {
            composer: self,
            settled: false,
        };

        let report = self.pipeline.run(&validated).await;

        self.draft().finish_submit(report.status);
        in_flight.settled = true;
        info!(operation = "compose", action = %report.action, status = ?report.status, "Composition submitted");
        Ok(report)
    }

    pub fn resume_editing(&self) -> bool {
        self.draft().resume_editing()
    }

    pub fn acknowledge(&self) -> bool {
        self.draft().acknowledge()
    }

    pub fn cancel(&self) -> Result<(), DraftError> {
        self.draft().cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::DraftState;
    use media_compose_backend::{InMemoryBackend, Operation, TrackDestination};
    use media_compose_models::{MediaType, Rating};
    use std::time::Duration;

    fn session(backend: &Arc<InMemoryBackend>) -> ComposerSession {
        ComposerSession::new(backend.clone(), backend.clone(), backend.clone())
    }

    fn dune() -> MediaReference {
        MediaReference::new("Dune", MediaType::Movie, "438631", "tmdb")
    }

    fn got() -> MediaReference {
        MediaReference::new("Game of Thrones", MediaType::Tv, "1399", "tmdb")
    }

    fn got_backend() -> InMemoryBackend {
        let season = |number| Season {
            number,
            name: Some(format!("Season {}", number)),
            episode_count: Some(10),
        };
        let episode = |season, number, title: &str| Episode {
            season,
            number,
            title: title.into(),
            air_date: None,
        };
        InMemoryBackend::new()
            .with_seasons("1399", vec![season(1), season(2)])
            .with_episodes("1399", 1, vec![episode(1, 1, "Winter Is Coming")])
            .with_episodes("1399", 2, vec![episode(2, 1, "The North Remembers")])
    }

    type Setup = Box<dyn Fn(&mut CompositionDraft)>;

    fn case(action: Action, setup: impl Fn(&mut CompositionDraft) + 'static) -> (Action, Setup) {
        (action, Box::new(setup))
    }

    /// One rule-table violation per action
    fn invalid_drafts() -> Vec<(Action, Setup)> {
        vec![
            case(Action::Track, |_| {}),
            case(Action::Post, |d| d.set_content("  ").unwrap()),
            case(Action::Post, |d| {
                d.set_rating(Some(Rating::new(0.0).unwrap())).unwrap();
                d.set_media(Some(dune())).unwrap();
            }),
            case(Action::HotTake, |d| {
                d.set_media(Some(dune())).unwrap();
            }),
            case(Action::Poll, |d| {
                d.set_content("Who wins?").unwrap();
                d.set_poll_options(vec!["A".into(), "".into()]).unwrap();
            }),
            case(Action::AskForRecs, |_| {}),
            case(Action::Rank, |d| {
                d.set_media(Some(dune())).unwrap();
            }),
            case(Action::Challenge, |_| {}),
        ]
    }

    #[tokio::test]
    async fn test_invalid_drafts_never_reach_the_network() {
        for (action, setup) in invalid_drafts() {
            let backend = Arc::new(InMemoryBackend::new());
            let composer = session(&backend).composer();
            composer.select_intent(action.intent()).unwrap();
            composer.select_action(action);
            composer
                .edit(|d| {
                    setup(d);
                    Ok(())
                })
                .unwrap();

            let result = composer.submit().await;

            assert!(matches!(result, Err(SubmitError::Validation(_))), "{}", action);
            assert!(backend.call_log().is_empty(), "{} issued {:?}", action, backend.call_log());
            assert_eq!(composer.snapshot().state(), DraftState::Editing, "{}", action);
        }
    }

    #[tokio::test]
    async fn test_poll_with_one_real_option_is_a_noop() {
        let backend = Arc::new(InMemoryBackend::new());
        let composer = session(&backend).composer();
        composer.select_intent(Intent::Play).unwrap();
        composer.select_action(Action::Poll);
        composer
            .edit(|d| {
                d.set_content("Who wins?")?;
                d.set_poll_options(vec!["A".into(), "".into()])
            })
            .unwrap();

        assert_eq!(composer.validate(), Err(ValidationError::InsufficientOptions));
        assert_eq!(
            composer.submit().await.unwrap_err(),
            SubmitError::Validation(ValidationError::InsufficientOptions)
        );
        assert_eq!(backend.write_calls(), 0);
        assert_eq!(backend.calls(Operation::CreatePoll), 0);
    }

    #[tokio::test]
    async fn test_track_dune_without_list() {
        let backend = Arc::new(InMemoryBackend::new());
        let composer = session(&backend).composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(dune())).await.unwrap();

        assert_eq!(composer.validate(), Ok(()));
        let report = composer.submit().await.unwrap();

        assert_eq!(report.status, SubmissionStatus::Succeeded);
        assert_eq!(backend.calls(Operation::TrackMedia), 1);
        assert_eq!(backend.calls(Operation::CreateFeedPost), 0);
        // Movies never load seasons
        assert_eq!(backend.calls(Operation::GetSeasons), 0);
        assert_eq!(composer.snapshot().state(), DraftState::Succeeded);

        assert!(composer.acknowledge());
        assert_eq!(composer.snapshot().state(), DraftState::Idle);
    }

    #[tokio::test]
    async fn test_switching_seasons_fetches_each_once() {
        let backend = Arc::new(got_backend());
        let composer = session(&backend).composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(got())).await.unwrap();
        assert_eq!(composer.snapshot().available_seasons().map(|s| s.len()), Some(2));

        let first = composer.select_season(1).await.unwrap();
        composer.select_season(2).await.unwrap();
        let again = composer.select_season(1).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(backend.calls(Operation::GetEpisodes), 2);
        assert_eq!(backend.calls(Operation::GetSeasons), 1);
        assert_eq!(
            composer.snapshot().available_episodes().map(|e| e[0].title.clone()),
            Some("Winter Is Coming".to_string())
        );
    }

    #[tokio::test]
    async fn test_cache_is_shared_across_composers() {
        let backend = Arc::new(got_backend());
        let session = session(&backend);

        for _ in 0..2 {
            let composer = session.composer();
            composer.select_intent(Intent::Capture).unwrap();
            composer.set_media(Some(got())).await.unwrap();
            composer.select_season(1).await.unwrap();
        }
        assert_eq!(backend.calls(Operation::GetSeasons), 1);
        assert_eq!(backend.calls(Operation::GetEpisodes), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_change_discards_outstanding_seasons() {
        let backend = Arc::new(got_backend().with_latency(Duration::from_millis(300)));
        let session = session(&backend);
        let composer = Arc::new(session.composer());
        composer.select_intent(Intent::Capture).unwrap();

        let slow = {
            let composer = composer.clone();
            tokio::spawn(async move { composer.set_media(Some(got())).await })
        };
        tokio::task::yield_now().await;
        composer.set_media(Some(dune())).await.unwrap();

        slow.await.unwrap().unwrap();
        let draft = composer.snapshot();
        assert_eq!(draft.media(), Some(&dune()));
        assert_eq!(draft.available_seasons(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intent_change_discards_outstanding_seasons() {
        let backend = Arc::new(got_backend().with_latency(Duration::from_millis(300)));
        let session = session(&backend);
        let composer = Arc::new(session.composer());
        composer.select_intent(Intent::Capture).unwrap();

        let slow = {
            let composer = composer.clone();
            tokio::spawn(async move { composer.set_media(Some(got())).await })
        };
        tokio::task::yield_now().await;
        composer.select_intent(Intent::Play).unwrap();

        slow.await.unwrap().unwrap();
        let draft = composer.snapshot();
        assert_eq!(draft.intent(), Some(Intent::Play));
        assert_eq!(draft.media(), Some(&got()));
        assert_eq!(draft.available_seasons(), None);

        // A fresh request under the new intent is served from the cache
        assert_eq!(composer.seasons().await.unwrap().len(), 2);
        assert_eq!(composer.snapshot().available_seasons().map(|s| s.len()), Some(2));
        assert_eq!(backend.calls(Operation::GetSeasons), 1);
    }

    #[tokio::test]
    async fn test_reselecting_same_intent_keeps_loaded_seasons() {
        let backend = Arc::new(got_backend());
        let session = session(&backend);
        let composer = session.composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(got())).await.unwrap();

        composer.select_intent(Intent::Capture).unwrap();
        assert!(composer.snapshot().available_seasons().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_submission_in_flight() {
        let backend = Arc::new(InMemoryBackend::new().with_latency(Duration::from_millis(200)));
        let session = session(&backend);
        let composer = Arc::new(session.composer());
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(dune())).await.unwrap();

        let first = {
            let composer = composer.clone();
            tokio::spawn(async move { composer.submit().await })
        };
        tokio::task::yield_now().await;

        assert_eq!(composer.submit().await.unwrap_err(), SubmitError::InFlight);
        assert_eq!(
            composer.edit(|d| d.set_content("late")),
            Err(DraftError::Locked(DraftState::Submitting))
        );
        assert_eq!(composer.cancel(), Err(DraftError::Locked(DraftState::Submitting)));

        assert!(first.await.unwrap().unwrap().is_success());
        assert_eq!(backend.calls(Operation::TrackMedia), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submission_unlocks_draft() {
        let backend = Arc::new(InMemoryBackend::new().with_latency(Duration::from_secs(5)));
        let session = session(&backend);
        let composer = session.composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(dune())).await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(100), composer.submit()).await;
        assert!(timed_out.is_err());

        assert_eq!(composer.snapshot().state(), DraftState::Failed);
        assert!(composer.resume_editing());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_draft_for_retry() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_once(Operation::CreateFeedPost, BackendError::Network("reset".into()));
        let composer = session(&backend).composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(dune())).await.unwrap();
        composer.edit(|d| d.set_post_to_feed(true)).unwrap();

        let report = composer.submit().await.unwrap();
        assert_eq!(report.status, SubmissionStatus::PartiallyFailed);
        assert_eq!(composer.snapshot().state(), DraftState::PartiallyFailed);

        // Retry: the track is an idempotent no-op, the post goes through
        assert!(composer.resume_editing());
        let retry = composer.submit().await.unwrap();
        assert!(retry.is_success());
        assert!(retry.already_present);
        assert_eq!(backend.list_contents(&TrackDestination::system("finished")), vec![dune()]);
        assert_eq!(backend.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_applies_default_list() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut config = Config::default();
        config.composer.default_list = "queue".to_string();
        let session =
            ComposerSession::from_config(&config, backend.clone(), backend.clone(), backend.clone()).unwrap();

        let composer = session.composer();
        composer.select_intent(Intent::Capture).unwrap();
        composer.set_media(Some(dune())).await.unwrap();
        composer.submit().await.unwrap();

        assert_eq!(backend.list_contents(&TrackDestination::system("queue")), vec![dune()]);

        config.composer.max_poll_options = 1;
        assert!(ComposerSession::from_config(&config, backend.clone(), backend.clone(), backend).is_err());
    }

    #[tokio::test]
    async fn test_resolve_attachment_against_catalog() {
        let backend = Arc::new(InMemoryBackend::new().with_catalog(vec![
            ListCatalogEntry::default_list("l-1", "Finished"),
            ListCatalogEntry::user_list("abc-123", "Cozy Mysteries", "u-1"),
        ]));
        let session = session(&backend);

        let target = session.resolve_attachment("Cozy Mysteries").await.unwrap().unwrap();
        assert_eq!(
            target,
            AttachmentTarget {
                id: "abc-123".into(),
                is_system_list: false,
                inferred_type: None
            }
        );
        assert!(session.resolve_attachment("missing").await.unwrap().is_none());
    }
}
