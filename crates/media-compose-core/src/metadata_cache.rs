// Session-scoped season/episode cache.
//
// One fetch per key for the lifetime of the cache. Each key owns a OnceCell so
// concurrent callers for the same key await a single in-flight request; a
// failed fetch leaves the cell empty and the next caller retries.

use media_compose_backend::{BackendError, MetadataProvider};
use media_compose_models::{Episode, Season};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub parent_id: String,
    pub season: u32,
}

impl EpisodeKey {
    pub fn new(parent_id: impl Into<String>, season: u32) -> Self {
        Self {
            parent_id: parent_id.into(),
            season,
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.parent_id, self.season)
    }
}

/// Result of a non-fetching lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    /// Never fetched, or the last fetch failed
    Unknown,
    /// Fetched; may be empty
    Cached(T),
}

type Slot<T> = Arc<OnceCell<Vec<T>>>;

pub struct HierarchicalMetadataCache {
    provider: Arc<dyn MetadataProvider>,
    seasons: Mutex<HashMap<String, Slot<Season>>>,
    episodes: Mutex<HashMap<EpisodeKey, Slot<Episode>>>,
    fetches: AtomicUsize,
}

fn slot_for<K, T>(map: &Mutex<HashMap<K, Slot<T>>>, key: K) -> Slot<T>
where
    K: std::hash::Hash + Eq,
{
    let mut map = map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    map.entry(key).or_default().clone()
}

impl HierarchicalMetadataCache {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            seasons: Mutex::new(HashMap::new()),
            episodes: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    #[instrument(skip(self), fields(provider = self.provider.provider_name()))]
    pub async fn get_seasons(&self, parent_id: &str) -> Result<Vec<Season>, BackendError> {
        let slot = slot_for(&self.seasons, parent_id.to_string());
        let seasons = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                debug!(operation = "get_seasons", status = "fetching", parent_id);
                let mut seasons = self.provider.get_seasons(parent_id).await?;
                seasons.sort_by_key(|s| s.number);
                Ok::<_, BackendError>(seasons)
            })
            .await?;
        Ok(seasons.clone())
    }

    #[instrument(skip(self), fields(provider = self.provider.provider_name()))]
    pub async fn get_episodes(&self, parent_id: &str, season: u32) -> Result<Vec<Episode>, BackendError> {
        let key = EpisodeKey::new(parent_id, season);
        let slot = slot_for(&self.episodes, key.clone());
        let episodes = slot
            .get_or_try_init(|| async {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                debug!(operation = "get_episodes", status = "fetching", key = %key);
                let mut episodes = self.provider.get_episodes(parent_id, season).await?;
                episodes.sort_by_key(|e| e.number);
                Ok::<_, BackendError>(episodes)
            })
            .await?;
        Ok(episodes.clone())
    }

    pub fn peek_seasons(&self, parent_id: &str) -> CacheLookup<Vec<Season>> {
        let map = self.seasons.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match map.get(parent_id).and_then(|slot| slot.get()) {
            Some(seasons) => CacheLookup::Cached(seasons.clone()),
            None => CacheLookup::Unknown,
        }
    }

    pub fn peek_episodes(&self, parent_id: &str, season: u32) -> CacheLookup<Vec<Episode>> {
        let map = self.episodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match map.get(&EpisodeKey::new(parent_id, season)).and_then(|slot| slot.get()) {
            Some(episodes) => CacheLookup::Cached(episodes.clone()),
            None => CacheLookup::Unknown,
        }
    }

    /// Upstream fetches issued so far (cache misses).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_compose_backend::{InMemoryBackend, Operation};
    use std::time::Duration;

    fn episode(season: u32, number: u32, title: &str) -> Episode {
        Episode {
            season,
            number,
            title: title.into(),
            air_date: None,
        }
    }

    fn got_backend() -> Arc<InMemoryBackend> {
        Arc::new(
            InMemoryBackend::new()
                .with_seasons(
                    "1399",
                    vec![
                        Season { number: 2, name: None, episode_count: Some(10) },
                        Season { number: 1, name: None, episode_count: Some(10) },
                    ],
                )
                .with_episodes("1399", 1, vec![episode(1, 2, "The Kingsroad"), episode(1, 1, "Winter Is Coming")])
                .with_episodes("1399", 2, vec![episode(2, 1, "The North Remembers")]),
        )
    }

    #[tokio::test]
    async fn test_episodes_fetched_once() {
        let backend = got_backend();
        let cache = HierarchicalMetadataCache::new(backend.clone());

        let first = cache.get_episodes("1399", 1).await.unwrap();
        let second = cache.get_episodes("1399", 1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].title, "Winter Is Coming");
        assert_eq!(backend.calls(Operation::GetEpisodes), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_a_cache_hit() {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = HierarchicalMetadataCache::new(backend.clone());

        assert_eq!(cache.peek_episodes("82856", 3), CacheLookup::Unknown);
        assert!(cache.get_episodes("82856", 3).await.unwrap().is_empty());
        assert_eq!(cache.peek_episodes("82856", 3), CacheLookup::Cached(vec![]));
        assert!(cache.get_episodes("82856", 3).await.unwrap().is_empty());

        assert_eq!(backend.calls(Operation::GetEpisodes), 1);
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_switching_seasons_does_not_refetch() {
        let backend = got_backend();
        let cache = HierarchicalMetadataCache::new(backend.clone());

        cache.get_episodes("1399", 1).await.unwrap();
        cache.get_episodes("1399", 2).await.unwrap();
        cache.get_episodes("1399", 1).await.unwrap();

        assert_eq!(backend.calls(Operation::GetEpisodes), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let backend = got_backend();
        backend.fail_once(Operation::GetSeasons, BackendError::Network("timeout".into()));
        let cache = HierarchicalMetadataCache::new(backend.clone());

        assert!(cache.get_seasons("1399").await.is_err());
        assert_eq!(cache.peek_seasons("1399"), CacheLookup::Unknown);

        let seasons = cache.get_seasons("1399").await.unwrap();
        assert_eq!(seasons.iter().map(|s| s.number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(backend.calls(Operation::GetSeasons), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_latency(Duration::from_millis(200))
                .with_episodes("1399", 1, vec![episode(1, 1, "Winter Is Coming")]),
        );
        let cache = Arc::new(HierarchicalMetadataCache::new(backend.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_episodes("1399", 1).await })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            assert_eq!(result.unwrap().unwrap().len(), 1);
        }

        assert_eq!(backend.calls(Operation::GetEpisodes), 1);
    }

    #[test]
    fn test_episode_key_format() {
        assert_eq!(EpisodeKey::new("1399", 2).to_string(), "1399-2");
    }
}
