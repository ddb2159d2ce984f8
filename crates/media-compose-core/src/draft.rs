// The in-progress composition and the state machine that governs it.
//
// Idle -> IntentChosen -> ActionChosen -> Editing -> Validating -> Submitting
//      -> {Succeeded, PartiallyFailed, Failed}
//
// Terminal states return to Idle on acknowledge/cancel. Failed and
// PartiallyFailed drop back to Editing on the next edit (or resume_editing)
// with every field intact.

use media_compose_models::{
    Action, Attachments, Episode, EpisodeSelection, Intent, ListTarget, MediaReference, RankTarget, Rating,
    Season, Visibility,
};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::error::{DraftError, SubmitError, ValidationError};
use crate::pipeline::SubmissionStatus;

pub const DEFAULT_MAX_POLL_OPTIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Idle,
    IntentChosen,
    ActionChosen,
    Editing,
    Validating,
    Submitting,
    Succeeded,
    PartiallyFailed,
    Failed,
}

impl DraftState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftState::Idle => "idle",
            DraftState::IntentChosen => "intent_chosen",
            DraftState::ActionChosen => "action_chosen",
            DraftState::Editing => "editing",
            DraftState::Validating => "validating",
            DraftState::Submitting => "submitting",
            DraftState::Succeeded => "succeeded",
            DraftState::PartiallyFailed => "partially_failed",
            DraftState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DraftState::Succeeded | DraftState::PartiallyFailed | DraftState::Failed
        )
    }

    /// Submission underway; nothing may change.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, DraftState::Validating | DraftState::Submitting)
    }
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token for a season fetch started on behalf of the draft. Results are only
/// applied while the draft still points at the same media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRequest {
    pub generation: u64,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRequest {
    pub generation: u64,
    pub parent_id: String,
    pub season: u32,
}

/// A draft that passed validation, frozen for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ValidatedDraft {
    pub action: Action,
    pub content: String,
    pub contains_spoilers: bool,
    pub visibility: Visibility,
    pub media: Option<MediaReference>,
    pub episode: Option<EpisodeSelection>,
    pub rating: Option<Rating>,
    /// Trimmed, empty entries removed
    pub poll_options: Vec<String>,
    pub attachments: Attachments,
}

impl ValidatedDraft {
    /// A post with a rating attached is published as a review.
    pub fn is_review(&self) -> bool {
        self.action == Action::Post && self.rating.is_some() && self.media.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionDraft {
    state: DraftState,
    intent: Option<Intent>,
    action: Option<Action>,
    content: String,
    contains_spoilers: bool,
    visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode_selection: Option<EpisodeSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<Rating>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    poll_options: Vec<String>,
    attachments: Attachments,

    #[serde(skip)]
    available_seasons: Option<Vec<Season>>,
    #[serde(skip)]
    available_episodes: Option<Vec<Episode>>,
    #[serde(skip)]
    generation: u64,
    #[serde(skip)]
    max_poll_options: usize,
}

impl Default for CompositionDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionDraft {
    pub fn new() -> Self {
        Self::with_max_poll_options(DEFAULT_MAX_POLL_OPTIONS)
    }

    pub fn with_max_poll_options(max_poll_options: usize) -> Self {
        Self {
            state: DraftState::Idle,
            intent: None,
            action: None,
            content: String::new(),
            contains_spoilers: false,
            visibility: Visibility::default(),
            media: None,
            selected_season: None,
            episode_selection: None,
            rating: None,
            poll_options: Vec::new(),
            attachments: Attachments::default(),
            available_seasons: None,
            available_episodes: None,
            generation: 0,
            max_poll_options,
        }
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn contains_spoilers(&self) -> bool {
        self.contains_spoilers
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn media(&self) -> Option<&MediaReference> {
        self.media.as_ref()
    }

    pub fn selected_season(&self) -> Option<u32> {
        self.selected_season
    }

    pub fn episode_selection(&self) -> Option<&EpisodeSelection> {
        self.episode_selection.as_ref()
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    pub fn poll_options(&self) -> &[String] {
        &self.poll_options
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Seasons of the selected TV media, once loaded.
    pub fn available_seasons(&self) -> Option<&[Season]> {
        self.available_seasons.as_deref()
    }

    pub fn available_episodes(&self) -> Option<&[Episode]> {
        self.available_episodes.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn max_poll_options(&self) -> usize {
        self.max_poll_options
    }

    /// Gate for every field edit. Moves ActionChosen to Editing and resumes
    /// a failed draft.
    fn begin_edit(&mut self) -> Result<(), DraftError> {
        match self.state {
            DraftState::Idle => Err(DraftError::NoIntent),
            DraftState::Validating | DraftState::Submitting | DraftState::Succeeded => {
                Err(DraftError::Locked(self.state))
            }
            DraftState::ActionChosen | DraftState::Failed | DraftState::PartiallyFailed => {
                self.state = DraftState::Editing;
                Ok(())
            }
            DraftState::IntentChosen | DraftState::Editing => Ok(()),
        }
    }

    /// Choose (or change) the intent. Creates the draft when Idle.
    pub fn select_intent(&mut self, intent: Intent) -> Result<(), DraftError> {
        if self.state.is_in_flight() || self.state == DraftState::Succeeded {
            return Err(DraftError::Locked(self.state));
        }
        let was_editing = matches!(
            self.state,
            DraftState::Editing | DraftState::Failed | DraftState::PartiallyFailed
        );

        if self.intent != Some(intent) {
            // Season/episode results requested under the old intent are stale
            self.generation += 1;
        }
        self.intent = Some(intent);
        if let Some(action) = self.action {
            if !intent.allows(action) {
                debug!(%intent, %action, "Clearing action incompatible with new intent");
                self.action = None;
            }
        }
        if self.action.is_none() {
            self.action = intent.default_action();
        }

        self.state = match self.action {
            None => DraftState::IntentChosen,
            Some(_) if was_editing => DraftState::Editing,
            Some(_) => DraftState::ActionChosen,
        };
        Ok(())
    }

    /// Choose an action within the current intent. Returns false, changing
    /// nothing, when the action is not reachable from the intent or the
    /// draft is locked.
    pub fn select_action(&mut self, action: Action) -> bool {
        let Some(intent) = self.intent else {
            return false;
        };
        if !intent.allows(action) {
            debug!(%intent, %action, "Ignoring action outside the intent");
            return false;
        }
        match self.state {
            DraftState::IntentChosen | DraftState::ActionChosen => self.state = DraftState::ActionChosen,
            DraftState::Editing | DraftState::Failed | DraftState::PartiallyFailed => {
                self.state = DraftState::Editing
            }
            _ => return false,
        }
        self.action = Some(action);
        true
    }

    /// Replace the media. Changing or clearing it drops the episode
    /// selection and any loaded seasons; TV media returns a season request
    /// for the caller to fulfil.
    pub fn set_media(&mut self, media: Option<MediaReference>) -> Result<Option<SeasonRequest>, DraftError> {
        self.begin_edit()?;
        if self.media == media {
            return Ok(None);
        }

        self.generation += 1;
        self.media = media;
        self.selected_season = None;
        self.episode_selection = None;
        self.available_seasons = None;
        self.available_episodes = None;

        Ok(self
            .media
            .as_ref()
            .filter(|media| media.is_tv())
            .map(|media| SeasonRequest {
                generation: self.generation,
                parent_id: media.external_id.clone(),
            }))
    }

    /// Token for (re)loading seasons of the current TV media.
    pub fn season_request(&self) -> Option<SeasonRequest> {
        self.media.as_ref().filter(|m| m.is_tv()).map(|media| SeasonRequest {
            generation: self.generation,
            parent_id: media.external_id.clone(),
        })
    }

    fn tv_parent_id(&self) -> Result<String, DraftError> {
        match &self.media {
            Some(media) if media.is_tv() => Ok(media.external_id.clone()),
            _ => Err(DraftError::NotTv),
        }
    }

    pub fn select_season(&mut self, season: u32) -> Result<EpisodeRequest, DraftError> {
        let parent_id = self.tv_parent_id()?;
        self.begin_edit()?;
        if self.selected_season != Some(season) {
            self.selected_season = Some(season);
            self.available_episodes = None;
            if self
                .episode_selection
                .as_ref()
                .is_some_and(|selection| selection.season != season)
            {
                self.episode_selection = None;
            }
        }
        Ok(EpisodeRequest {
            generation: self.generation,
            parent_id,
            season,
        })
    }

    pub fn select_episode(&mut self, selection: Option<EpisodeSelection>) -> Result<(), DraftError> {
        if selection.is_some() {
            self.tv_parent_id()?;
        }
        self.begin_edit()?;
        if let Some(ref selection) = selection {
            if self.selected_season != Some(selection.season) {
                self.selected_season = Some(selection.season);
                self.available_episodes = None;
            }
        }
        self.episode_selection = selection;
        Ok(())
    }

    /// Apply a season fetch result. Stale results (the media changed or the
    /// draft was reset since the request) are dropped.
    pub fn apply_seasons(&mut self, request: &SeasonRequest, seasons: Vec<Season>) -> bool {
        if request.generation != self.generation || self.tv_parent_id().ok().as_ref() != Some(&request.parent_id) {
            debug!(parent_id = %request.parent_id, "Discarding stale season result");
            return false;
        }
        self.available_seasons = Some(seasons);
        true
    }

    pub fn apply_episodes(&mut self, request: &EpisodeRequest, episodes: Vec<Episode>) -> bool {
        if request.generation != self.generation
            || self.selected_season != Some(request.season)
            || self.tv_parent_id().ok().as_ref() != Some(&request.parent_id)
        {
            debug!(parent_id = %request.parent_id, season = request.season, "Discarding stale episode result");
            return false;
        }
        self.available_episodes = Some(episodes);
        true
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.content = content.into();
        Ok(())
    }

    pub fn set_spoilers(&mut self, contains_spoilers: bool) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.contains_spoilers = contains_spoilers;
        Ok(())
    }

    pub fn set_visibility(&mut self, visibility: Visibility) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.visibility = visibility;
        Ok(())
    }

    pub fn set_rating(&mut self, rating: Option<Rating>) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.rating = rating;
        Ok(())
    }

    pub fn set_poll_options(&mut self, options: Vec<String>) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.poll_options = options;
        Ok(())
    }

    pub fn attach_list(&mut self, list: Option<ListTarget>) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.attachments.list = list;
        Ok(())
    }

    pub fn attach_rank(&mut self, rank: Option<RankTarget>) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.attachments.rank = rank;
        Ok(())
    }

    pub fn set_post_to_feed(&mut self, post_to_feed: bool) -> Result<(), DraftError> {
        self.begin_edit()?;
        self.attachments.post_to_feed = post_to_feed;
        Ok(())
    }

    fn non_empty_poll_options(&self) -> Vec<String> {
        self.poll_options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The submission rule table. Pure: no state change, no I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let action = self.action.ok_or(ValidationError::MissingAction)?;
        let has_content = !self.content.trim().is_empty();
        let has_media = self.media.is_some();

        match action {
            Action::Track => {
                if !has_media {
                    return Err(ValidationError::MissingMedia);
                }
            }
            Action::Post => match self.rating {
                // Review
                Some(rating) => {
                    if !has_media {
                        return Err(ValidationError::MissingMedia);
                    }
                    if !rating.is_positive() && !has_content {
                        return Err(ValidationError::MissingContent);
                    }
                }
                None => {
                    if !has_content && !has_media {
                        return Err(ValidationError::MissingContent);
                    }
                    // List and rank attachments are added with the media
                    let attached = self.attachments.list.is_some() || self.attachments.rank.is_some();
                    if attached && !has_media {
                        return Err(ValidationError::MissingMedia);
                    }
                }
            },
            Action::HotTake | Action::AskForRecs | Action::Challenge => {
                if !has_content {
                    return Err(ValidationError::MissingContent);
                }
            }
            Action::Poll => {
                if !has_content {
                    return Err(ValidationError::MissingContent);
                }
                let options = self.non_empty_poll_options().len();
                if options < 2 {
                    return Err(ValidationError::InsufficientOptions);
                }
                if options > self.max_poll_options {
                    return Err(ValidationError::TooManyOptions);
                }
            }
            Action::Rank => {
                if !has_media {
                    return Err(ValidationError::MissingMedia);
                }
                if self.attachments.rank.is_none() {
                    return Err(ValidationError::MissingRankTarget);
                }
            }
        }
        Ok(())
    }

    /// Validate and lock the draft for submission.
    ///
    /// On success the draft is Submitting and the returned snapshot goes to
    /// the pipeline. A validation failure returns the draft to editing.
    pub fn begin_submit(&mut self) -> Result<ValidatedDraft, SubmitError> {
        match self.state {
            DraftState::Validating | DraftState::Submitting => return Err(SubmitError::InFlight),
            DraftState::IntentChosen | DraftState::ActionChosen | DraftState::Editing => {}
            other => return Err(SubmitError::NotReady(other)),
        }

        self.state = DraftState::Validating;
        if let Err(reason) = self.validate() {
            self.state = if self.action.is_some() {
                DraftState::Editing
            } else {
                DraftState::IntentChosen
            };
            debug!(reason = %reason, "Draft failed validation");
            return Err(SubmitError::Validation(reason));
        }

        let Some(action) = self.action else {
            self.state = DraftState::IntentChosen;
            return Err(SubmitError::Validation(ValidationError::MissingAction));
        };
        self.state = DraftState::Submitting;
        Ok(ValidatedDraft {
            action,
            content: self.content.trim().to_string(),
            contains_spoilers: self.contains_spoilers,
            visibility: self.visibility,
            media: self.media.clone(),
            episode: self.episode_selection.clone(),
            rating: self.rating,
            poll_options: self.non_empty_poll_options(),
            attachments: self.attachments.clone(),
        })
    }

    /// Record the pipeline outcome. Ignored unless a submission is underway.
    pub fn finish_submit(&mut self, status: SubmissionStatus) -> bool {
        if self.state != DraftState::Submitting {
            return false;
        }
        self.state = match status {
            SubmissionStatus::Succeeded => DraftState::Succeeded,
            SubmissionStatus::PartiallyFailed => DraftState::PartiallyFailed,
            SubmissionStatus::Failed => DraftState::Failed,
        };
        true
    }

    /// Failed or PartiallyFailed back to Editing, fields untouched.
    pub fn resume_editing(&mut self) -> bool {
        if matches!(self.state, DraftState::Failed | DraftState::PartiallyFailed) {
            self.state = DraftState::Editing;
            true
        } else {
            false
        }
    }

    /// Close a terminal draft; the next composition starts from Idle.
    pub fn acknowledge(&mut self) -> bool {
        if !self.state.is_terminal() {
            return false;
        }
        self.reset();
        true
    }

    /// Discard the draft. Refused while a submission is in flight.
    pub fn cancel(&mut self) -> Result<(), DraftError> {
        if self.state.is_in_flight() {
            return Err(DraftError::Locked(self.state));
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self::with_max_poll_options(self.max_poll_options);
        self.generation = generation;
    }
}
