// Sequences the backend writes a validated draft implies and folds their
// outcomes into one report.
//
// Steps run strictly in order. The first step is the primary write: if it
// fails nothing else runs and the submission is Failed. Secondary failures
// are collected, never retried, and never undo the primary.

use media_compose_backend::{
    BackendError, CacheInvalidator, FeedPostPayload, PollId, PostId, PostKind, ResourceKind, SocialBackend,
    TrackDestination, TrackOptions,
};
use media_compose_models::{Action, MediaReference, SystemList};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::attachment::AttachmentResolver;
use crate::draft::ValidatedDraft;
use crate::error::{PipelineError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    TrackMedia,
    FeedPost,
    Rating,
    RankAdd,
    CreatePoll,
}

impl PipelineStep {
    /// Read path made stale by this write.
    pub fn resource(&self) -> ResourceKind {
        match self {
            PipelineStep::TrackMedia => ResourceKind::ListContents,
            PipelineStep::FeedPost | PipelineStep::CreatePoll => ResourceKind::Feed,
            PipelineStep::Rating => ResourceKind::Ratings,
            PipelineStep::RankAdd => ResourceKind::Ranks,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::TrackMedia => "track_media",
            PipelineStep::FeedPost => "feed_post",
            PipelineStep::Rating => "rating",
            PipelineStep::RankAdd => "rank_add",
            PipelineStep::CreatePoll => "create_poll",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    /// Idempotent no-op: the item was already there
    AlreadyPresent,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step: PipelineStep,
    pub primary: bool,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Succeeded,
    PartiallyFailed,
    Failed,
}

/// Aggregated, user-visible result of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub action: Action,
    pub status: SubmissionStatus,
    pub steps: Vec<StepResult>,
    /// Tracking was a no-op because the item was already in the list
    pub already_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<PollId>,
    pub invalidated: Vec<ResourceKind>,
    /// A failed write hit a transient backend error, so resubmitting may
    /// succeed
    pub retryable: bool,
    #[serde(skip)]
    pub primary_error: Option<BackendError>,
}

impl SubmissionReport {
    pub fn failed_steps(&self) -> Vec<PipelineStep> {
        self.steps.iter().filter(|s| s.failed()).map(|s| s.step).collect()
    }

    pub fn is_success(&self) -> bool {
        self.status == SubmissionStatus::Succeeded
    }

    pub fn error(&self) -> Option<PipelineError> {
        match self.status {
            SubmissionStatus::Succeeded => None,
            SubmissionStatus::PartiallyFailed => Some(PipelineError::Partial {
                failed: self.failed_steps(),
            }),
            SubmissionStatus::Failed => Some(PipelineError::Primary(
                self.primary_error
                    .clone()
                    .unwrap_or_else(|| BackendError::Parse("submission rejected before any write".into())),
            )),
        }
    }
}

/// Accumulates step results while a run is in progress.
struct Progress {
    steps: Vec<StepResult>,
    touched: BTreeSet<ResourceKind>,
    primary_error: Option<BackendError>,
    primary_failed: bool,
    retryable: bool,
    already_present: bool,
    post_id: Option<PostId>,
    poll_id: Option<PollId>,
}

impl Progress {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            touched: BTreeSet::new(),
            primary_error: None,
            primary_failed: false,
            retryable: false,
            already_present: false,
            post_id: None,
            poll_id: None,
        }
    }

    /// Record one attempted write. Returns true when it succeeded.
    fn record(&mut self, step: PipelineStep, primary: bool, result: Result<StepOutcome, BackendError>) -> bool {
        self.touched.insert(step.resource());
        match result {
            Ok(outcome) => {
                debug!(operation = "submit_step", step = %step, primary, status = "ok", "Step completed");
                if outcome == StepOutcome::AlreadyPresent {
                    self.already_present = true;
                }
                self.steps.push(StepResult { step, primary, outcome });
                true
            }
            Err(e) => {
                warn!(
                    operation = "submit_step",
                    step = %step,
                    primary,
                    status = "error",
                    error = %e,
                    "Submission step failed"
                );
                self.steps.push(StepResult {
                    step,
                    primary,
                    outcome: StepOutcome::Failed { error: e.to_string() },
                });
                self.retryable |= e.is_transient();
                if primary {
                    self.primary_failed = true;
                    self.primary_error = Some(e);
                }
                false
            }
        }
    }

    /// Primary step that cannot be attempted with what the draft holds.
    fn reject(&mut self, step: PipelineStep, reason: ValidationError) {
        warn!(operation = "submit_step", step = %step, status = "rejected", reason = %reason, "Primary step not attempted");
        self.steps.push(StepResult {
            step,
            primary: true,
            outcome: StepOutcome::Failed {
                error: reason.to_string(),
            },
        });
        self.primary_failed = true;
    }

    fn status(&self) -> SubmissionStatus {
        if self.primary_failed {
            SubmissionStatus::Failed
        } else if self.steps.iter().any(StepResult::failed) {
            SubmissionStatus::PartiallyFailed
        } else {
            SubmissionStatus::Succeeded
        }
    }
}

pub struct SubmissionPipeline {
    backend: Arc<dyn SocialBackend>,
    invalidator: Arc<dyn CacheInvalidator>,
    attachments: AttachmentResolver,
    default_list: SystemList,
}

impl SubmissionPipeline {
    pub fn new(backend: Arc<dyn SocialBackend>, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self {
            backend,
            invalidator,
            attachments: AttachmentResolver::new(),
            default_list: SystemList::Finished,
        }
    }

    /// System list used by `track` when no list is attached.
    pub fn with_default_list(mut self, list: SystemList) -> Self {
        self.default_list = list;
        self
    }

    pub fn default_list(&self) -> SystemList {
        self.default_list
    }

    #[instrument(skip(self, draft), fields(action = %draft.action))]
    pub async fn run(&self, draft: &ValidatedDraft) -> SubmissionReport {
        let mut progress = Progress::new();

        match draft.action {
            Action::Track => self.run_track(draft, &mut progress).await,
            Action::Post => self.run_post(draft, &mut progress).await,
            Action::HotTake => self.run_feed_only(draft, PostKind::HotTake, &mut progress).await,
            Action::AskForRecs => self.run_feed_only(draft, PostKind::AskForRecs, &mut progress).await,
            Action::Challenge => self.run_feed_only(draft, PostKind::Challenge, &mut progress).await,
            Action::Poll => self.run_poll(draft, &mut progress).await,
            Action::Rank => self.run_rank(draft, &mut progress).await,
        }

        let status = progress.status();
        let invalidated: Vec<ResourceKind> = if progress.primary_failed {
            Vec::new()
        } else {
            progress.touched.iter().copied().collect()
        };
        for kind in &invalidated {
            self.invalidator.invalidate(*kind);
        }

        let report = SubmissionReport {
            action: draft.action,
            status,
            steps: progress.steps,
            already_present: progress.already_present,
            post_id: progress.post_id,
            poll_id: progress.poll_id,
            invalidated,
            retryable: progress.retryable,
            primary_error: progress.primary_error,
        };

        info!(
            operation = "submit",
            status = ?report.status,
            steps = report.steps.len(),
            failed = ?report.failed_steps(),
            already_present = report.already_present,
            "Submission finished"
        );
        report
    }

    fn list_destination(&self, draft: &ValidatedDraft) -> TrackDestination {
        match &draft.attachments.list {
            Some(target) => self.attachments.destination(target),
            None => AttachmentResolver::system_destination(self.default_list),
        }
    }

    fn feed_payload(&self, draft: &ValidatedDraft, kind: PostKind) -> FeedPostPayload {
        FeedPostPayload {
            kind,
            content: draft.content.clone(),
            media: draft.media.clone(),
            episode: draft.episode.clone(),
            rating: draft.rating,
            contains_spoilers: draft.contains_spoilers,
            visibility: draft.visibility,
        }
    }

    async fn track(
        &self,
        draft: &ValidatedDraft,
        media: &MediaReference,
        destination: &TrackDestination,
        primary: bool,
        progress: &mut Progress,
    ) -> bool {
        let options = TrackOptions {
            episode: draft.episode.clone(),
            visibility: draft.visibility,
        };
        let result = self
            .backend
            .track_media(media, destination, &options)
            .await
            .map(|receipt| {
                if receipt.already_present {
                    StepOutcome::AlreadyPresent
                } else {
                    StepOutcome::Completed
                }
            });
        progress.record(PipelineStep::TrackMedia, primary, result)
    }

    async fn feed_post(&self, payload: FeedPostPayload, primary: bool, progress: &mut Progress) -> bool {
        match self.backend.create_feed_post(&payload).await {
            Ok(id) => {
                progress.post_id = Some(id);
                progress.record(PipelineStep::FeedPost, primary, Ok(StepOutcome::Completed))
            }
            Err(e) => progress.record(PipelineStep::FeedPost, primary, Err(e)),
        }
    }

    async fn rate(&self, draft: &ValidatedDraft, media: &MediaReference, progress: &mut Progress) {
        let Some(rating) = draft.rating else {
            return;
        };
        let review = Some(draft.content.as_str()).filter(|c| !c.is_empty());
        let result = self
            .backend
            .rate_media(media, rating, review)
            .await
            .map(|_| StepOutcome::Completed);
        progress.record(PipelineStep::Rating, false, result);
    }

    async fn add_to_rank(&self, rank_id: &str, media: &MediaReference, primary: bool, progress: &mut Progress) -> bool {
        let result = self
            .backend
            .add_rank_item(rank_id, media)
            .await
            .map(|_| StepOutcome::Completed);
        progress.record(PipelineStep::RankAdd, primary, result)
    }

    /// track → feed post → rating → rank
    async fn run_track(&self, draft: &ValidatedDraft, progress: &mut Progress) {
        let Some(media) = draft.media.as_ref() else {
            progress.reject(PipelineStep::TrackMedia, ValidationError::MissingMedia);
            return;
        };
        let destination = self.list_destination(draft);
        debug!(media = %media.key(), destination = %destination, "Tracking");
        if !self.track(draft, media, &destination, true, progress).await {
            return;
        }

        if draft.attachments.post_to_feed {
            self.feed_post(self.feed_payload(draft, PostKind::Track), false, progress)
                .await;
        }
        self.rate(draft, media, progress).await;
        if let Some(rank) = &draft.attachments.rank {
            self.add_to_rank(&rank.id, media, false, progress).await;
        }
    }

    /// feed post → rating → list → rank
    async fn run_post(&self, draft: &ValidatedDraft, progress: &mut Progress) {
        let kind = if draft.is_review() {
            PostKind::Review
        } else {
            PostKind::Thought
        };
        if !self.feed_post(self.feed_payload(draft, kind), true, progress).await {
            return;
        }

        let Some(media) = draft.media.as_ref() else {
            return;
        };
        self.rate(draft, media, progress).await;
        if let Some(list) = &draft.attachments.list {
            let destination = self.attachments.destination(list);
            self.track(draft, media, &destination, false, progress).await;
        }
        if let Some(rank) = &draft.attachments.rank {
            self.add_to_rank(&rank.id, media, false, progress).await;
        }
    }

    async fn run_feed_only(&self, draft: &ValidatedDraft, kind: PostKind, progress: &mut Progress) {
        self.feed_post(self.feed_payload(draft, kind), true, progress).await;
    }

    async fn run_poll(&self, draft: &ValidatedDraft, progress: &mut Progress) {
        match self.backend.create_poll(&draft.content, &draft.poll_options).await {
            Ok(id) => {
                progress.poll_id = Some(id);
                progress.record(PipelineStep::CreatePoll, true, Ok(StepOutcome::Completed));
            }
            Err(e) => {
                progress.record(PipelineStep::CreatePoll, true, Err(e));
            }
        }
    }

    /// rank add → rating → feed post
    async fn run_rank(&self, draft: &ValidatedDraft, progress: &mut Progress) {
        let (Some(media), Some(rank)) = (draft.media.as_ref(), draft.attachments.rank.as_ref()) else {
            let reason = if draft.media.is_none() {
                ValidationError::MissingMedia
            } else {
                ValidationError::MissingRankTarget
            };
            progress.reject(PipelineStep::RankAdd, reason);
            return;
        };
        if !self.add_to_rank(&rank.id, media, true, progress).await {
            return;
        }
        self.rate(draft, media, progress).await;
        if draft.attachments.post_to_feed {
            self.feed_post(self.feed_payload(draft, PostKind::Thought), false, progress)
                .await;
        }
    }
}
