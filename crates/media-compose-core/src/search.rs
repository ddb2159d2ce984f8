// Search-as-you-type with cancel-and-restart debounce.
//
// Each call takes a new ticket. A newer call cancels an older one wherever it
// is: still in the debounce sleep or already waiting on the provider.

use media_compose_backend::{BackendError, MetadataProvider};
use media_compose_models::MediaReference;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::resolver::MediaReferenceResolver;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(Vec<MediaReference>),
    /// A newer query replaced this one
    Superseded,
    /// Query too short to search; clears any pending search
    EmptyQuery,
}

pub struct MediaSearch {
    provider: Arc<dyn MetadataProvider>,
    resolver: MediaReferenceResolver,
    debounce: Duration,
    min_query_len: usize,
    latest: watch::Sender<u64>,
}

impl MediaSearch {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            provider,
            resolver: MediaReferenceResolver::new(),
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: 1,
            latest,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
        self.min_query_len = min_query_len;
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome, BackendError> {
        let mut ticket = 0;
        self.latest.send_modify(|latest| {
            *latest += 1;
            ticket = *latest;
        });
        let mut newer = self.latest.subscribe();

        let query = query.trim();
        if query.chars().count() < self.min_query_len {
            return Ok(SearchOutcome::EmptyQuery);
        }

        let work = async {
            tokio::time::sleep(self.debounce).await;
            debug!(operation = "search", query, ticket, status = "fetching");
            let raw = self.provider.search_media(query).await?;
            Ok::<_, BackendError>(self.resolver.resolve_all(&raw))
        };

        tokio::select! {
            results = work => Ok(SearchOutcome::Results(results?)),
            _ = newer.changed() => {
                debug!(operation = "search", query, ticket, status = "superseded");
                Ok(SearchOutcome::Superseded)
            }
        }
    }
}
