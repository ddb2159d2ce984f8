// Genre profile aggregation over a user's tracked media.
//
// Lookups run in bounded batches: each batch concurrently, with a fixed pause
// between batches to stay under provider rate limits.

use futures::future::join_all;
use media_compose_backend::MetadataProvider;
use media_compose_models::MediaReference;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenreProfile {
    /// Genre name -> number of items carrying it
    pub counts: BTreeMap<String, usize>,
    /// Media whose lookup failed, by key
    pub failed: Vec<String>,
}

impl GenreProfile {
    /// Most common genres first; ties broken alphabetically.
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self.counts.iter().map(|(g, c)| (g.as_str(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }
}

pub struct GenreAggregator {
    provider: Arc<dyn MetadataProvider>,
    batch_size: usize,
    batch_delay: Duration,
}

impl GenreAggregator {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    pub async fn aggregate(&self, media: &[MediaReference]) -> GenreProfile {
        let mut profile = GenreProfile::default();
        let batches = media.chunks(self.batch_size).count();

        for (index, batch) in media.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            debug!(batch = index + 1, of = batches, size = batch.len(), "Fetching genre batch");

            let results = join_all(batch.iter().map(|item| self.provider.get_genres(item))).await;
            for (item, result) in batch.iter().zip(results) {
                match result {
                    Ok(genres) => {
                        for genre in genres {
                            let genre = genre.trim();
                            if !genre.is_empty() {
                                *profile.counts.entry(genre.to_string()).or_insert(0) += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(media = %item.key(), error = %e, "Genre lookup failed");
                        profile.failed.push(item.key());
                    }
                }
            }
        }

        info!(
            operation = "genre_profile",
            items = media.len(),
            genres = profile.counts.len(),
            failed = profile.failed.len(),
            "Genre profile aggregated"
        );
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_compose_backend::{BackendError, InMemoryBackend, Operation};
    use media_compose_models::MediaType;
    use tokio::time::Instant;

    fn movie(id: &str) -> MediaReference {
        MediaReference::new(format!("Movie {}", id), MediaType::Movie, id, "tmdb")
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_and_batch_delay() {
        let items: Vec<MediaReference> = (1..=12).map(|n| movie(&n.to_string())).collect();
        let mut backend = InMemoryBackend::new();
        for (n, item) in items.iter().enumerate() {
            let genres: &[&str] = if n % 2 == 0 { &["Drama", "Sci-Fi"] } else { &["Drama"] };
            backend = backend.with_genres(item, genres);
        }
        let backend = Arc::new(backend);
        let aggregator = GenreAggregator::new(backend.clone());

        let start = Instant::now();
        let profile = aggregator.aggregate(&items).await;

        assert_eq!(profile.counts["Drama"], 12);
        assert_eq!(profile.counts["Sci-Fi"], 6);
        assert_eq!(profile.top(1), vec![("Drama", 12)]);
        assert_eq!(backend.calls(Operation::GetGenres), 12);
        // 3 batches of at most 5 -> two pauses
        assert_eq!(start.elapsed(), DEFAULT_BATCH_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_reported_not_fatal() {
        let items = vec![movie("1"), movie("2")];
        let backend = Arc::new(InMemoryBackend::new().with_genres(&items[1], &["Horror"]));
        backend.fail_once(Operation::GetGenres, BackendError::Network("reset".into()));

        let profile = GenreAggregator::new(backend).aggregate(&items).await;

        assert_eq!(profile.failed, vec!["tmdb:1".to_string()]);
        assert_eq!(profile.counts.get("Horror"), Some(&1));
    }

    #[test]
    fn test_top_breaks_ties_alphabetically() {
        let mut profile = GenreProfile::default();
        profile.counts.insert("Western".into(), 2);
        profile.counts.insert("Comedy".into(), 2);
        profile.counts.insert("Drama".into(), 5);
        assert_eq!(profile.top(3), vec![("Drama", 5), ("Comedy", 2), ("Western", 2)]);
    }
}
