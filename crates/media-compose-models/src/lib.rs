pub mod composition;
pub mod episode;
pub mod list;
pub mod media;
pub mod rating;
pub mod reaction;
pub mod status;

pub use composition::{Action, Attachments, Intent, Visibility};
pub use episode::{Episode, EpisodeSelection, Season};
pub use list::{AttachmentTarget, CatalogKind, ListCatalogEntry, ListTarget, RankTarget};
pub use media::{MediaReference, MediaType};
pub use rating::{Rating, RatingError};
pub use reaction::{ReactionKind, ReactionState, VoteChoice};
pub use status::SystemList;
