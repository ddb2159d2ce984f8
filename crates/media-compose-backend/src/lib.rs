pub mod error;
pub mod http;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::BackendError;
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::{InMemoryBackend, Operation};
pub use traits::{CacheInvalidator, MetadataProvider, NoopInvalidator, SocialBackend};
pub use types::{FeedPostPayload, PollId, PostId, PostKind, ResourceKind, TrackDestination, TrackOptions, TrackReceipt};
