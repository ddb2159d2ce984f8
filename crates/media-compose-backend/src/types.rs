use media_compose_models::{EpisodeSelection, MediaReference, Rating, Visibility};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a "track media" write lands.
///
/// System lists are addressed by their normalized type, user-defined lists
/// by id; the backend exposes a different operation for each.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackDestination {
    System { list_type: String },
    Custom { list_id: String },
}

impl TrackDestination {
    pub fn system(list_type: impl Into<String>) -> Self {
        TrackDestination::System { list_type: list_type.into() }
    }

    pub fn custom(list_id: impl Into<String>) -> Self {
        TrackDestination::Custom { list_id: list_id.into() }
    }
}

impl fmt::Display for TrackDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackDestination::System { list_type } => write!(f, "system:{}", list_type),
            TrackDestination::Custom { list_id } => write!(f, "list:{}", list_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeSelection>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReceipt {
    /// The item was already in the destination list; nothing was written.
    pub already_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Thought,
    Review,
    /// Feed announcement of a tracked item
    Track,
    HotTake,
    AskForRecs,
    Challenge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPostPayload {
    pub kind: PostKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    pub contains_spoilers: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read paths that go stale after a write and must refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ListContents,
    Feed,
    Ratings,
    Ranks,
}
