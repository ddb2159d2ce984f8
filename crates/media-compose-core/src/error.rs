use media_compose_backend::BackendError;
use serde::Serialize;
use thiserror::Error;

use crate::draft::DraftState;
use crate::pipeline::PipelineStep;

/// Why a draft cannot be submitted yet.
///
/// Display output is the machine-readable code; user-facing copy belongs to
/// the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationError {
    #[error("missing-action")]
    MissingAction,
    #[error("missing-media")]
    MissingMedia,
    #[error("missing-content")]
    MissingContent,
    #[error("insufficient-options")]
    InsufficientOptions,
    #[error("too-many-options")]
    TooManyOptions,
    #[error("missing-rank-target")]
    MissingRankTarget,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingAction => "missing-action",
            ValidationError::MissingMedia => "missing-media",
            ValidationError::MissingContent => "missing-content",
            ValidationError::InsufficientOptions => "insufficient-options",
            ValidationError::TooManyOptions => "too-many-options",
            ValidationError::MissingRankTarget => "missing-rank-target",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("draft is {0} and does not accept edits")]
    Locked(DraftState),

    #[error("no intent selected")]
    NoIntent,

    #[error("selected media is not a TV series")]
    NotTv,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// One submission per draft at a time
    #[error("a submission is already in flight")]
    InFlight,

    #[error("draft is {0} and cannot be submitted")]
    NotReady(DraftState),
}

/// Aggregated failure of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The primary write failed; nothing else ran.
    #[error("primary step failed: {0}")]
    Primary(BackendError),

    /// The primary write landed but some follow-up writes did not.
    #[error("partial failure: {failed:?} did not complete")]
    Partial { failed: Vec<PipelineStep> },
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ValidationError> for ComposeError {
    fn from(error: ValidationError) -> Self {
        ComposeError::Submit(SubmitError::Validation(error))
    }
}
