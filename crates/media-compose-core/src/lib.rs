pub mod attachment;
pub mod composer;
pub mod draft;
pub mod error;
pub mod genres;
pub mod metadata_cache;
pub mod optimistic;
pub mod pipeline;
pub mod resolver;
pub mod search;

pub use attachment::AttachmentResolver;
pub use composer::{Composer, ComposerSession};
pub use draft::{CompositionDraft, DraftState, EpisodeRequest, SeasonRequest, ValidatedDraft};
pub use error::{ComposeError, DraftError, PipelineError, SubmitError, ValidationError};
pub use genres::{GenreAggregator, GenreProfile};
pub use metadata_cache::{CacheLookup, EpisodeKey, HierarchicalMetadataCache};
pub use optimistic::{OptimisticMutation, OptimisticMutationManager, ReactionError, ReactionOutcome, RollbackNotice};
pub use pipeline::{PipelineStep, StepOutcome, StepResult, SubmissionPipeline, SubmissionReport, SubmissionStatus};
pub use resolver::{MediaReferenceResolver, ResolveError};
pub use search::{MediaSearch, SearchOutcome};
