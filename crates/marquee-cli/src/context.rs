use anyhow::{Context, Result};
use media_compose_backend::{HttpBackend, HttpBackendConfig, InMemoryBackend, NoopInvalidator};
use media_compose_config::{Config, CredentialStore, PathManager};
use media_compose_core::ComposerSession;
use media_compose_models::{Episode, ListCatalogEntry, MediaReference, MediaType, Season};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct AppContext {
    pub paths: PathManager,
    pub config_file: PathBuf,
    pub config: Config,
}

impl AppContext {
    /// Config from `--config`, or the platform location, or defaults.
    pub fn load(config_override: Option<&Path>) -> Result<Self> {
        let paths = PathManager::default();
        let config_file = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths.config_file());
        let config = Config::load_or_default(&config_file)
            .with_context(|| format!("Failed to load config from {}", config_file.display()))?;

        Ok(Self {
            paths,
            config_file,
            config,
        })
    }

    pub fn credentials(&self) -> Result<CredentialStore> {
        let credentials_file = self.paths.credentials_file();
        let mut store = CredentialStore::new(credentials_file.clone());
        store
            .load()
            .with_context(|| format!("Failed to load credentials from {}", credentials_file.display()))?;
        Ok(store)
    }

    /// A session against the configured backend, or the sample catalog when offline.
    pub fn session(&self, offline: bool) -> Result<ComposerSession> {
        if offline {
            info!(mode = "offline", "Using the in-memory sample catalog");
            let backend = Arc::new(sample_backend());
            return ComposerSession::from_config(&self.config, backend.clone(), backend.clone(), backend);
        }

        let backend_config = &self.config.backend;
        let token = self
            .credentials()?
            .resolve_api_token(backend_config.api_token.as_deref());
        debug!(authenticated = token.is_some(), base_url = %backend_config.base_url, "Connecting");

        let mut http_config = HttpBackendConfig::new(&backend_config.base_url);
        http_config.timeout = backend_config.timeout();
        if let Some(token) = token {
            http_config = http_config.with_token(token);
        }
        let backend = Arc::new(HttpBackend::new(http_config)?);
        ComposerSession::from_config(&self.config, backend.clone(), backend, Arc::new(NoopInvalidator))
    }
}

/// Small fixed catalog so every command works without an account.
pub fn sample_backend() -> InMemoryBackend {
    let dune = MediaReference::new("Dune", MediaType::Movie, "438631", "tmdb");
    let got = MediaReference::new("Game of Thrones", MediaType::Tv, "1399", "tmdb");

    InMemoryBackend::new()
        .with_search_results(vec![
            json!({"id": 438631, "title": "Dune", "media_type": "movie", "release_date": "2021-09-15",
                   "poster_path": "/d5NXSklXo0qyIYkgV94XAgMIckC.jpg"}),
            json!({"id": 693134, "title": "Dune: Part Two", "media_type": "movie", "release_date": "2024-02-27"}),
            json!({"id": 1399, "name": "Game of Thrones", "media_type": "tv", "first_air_date": "2011-04-17"}),
            json!({"key": "OL893415W", "title": "Dune", "type": "book", "author": "Frank Herbert",
                   "source": "openlibrary"}),
        ])
        .with_seasons(
            "1399",
            (1..=3)
                .map(|number| Season {
                    number,
                    name: Some(format!("Season {}", number)),
                    episode_count: Some(10),
                })
                .collect(),
        )
        .with_episodes(
            "1399",
            1,
            vec![
                sample_episode(1, 1, "Winter Is Coming"),
                sample_episode(1, 2, "The Kingsroad"),
                sample_episode(1, 3, "Lord Snow"),
            ],
        )
        .with_episodes(
            "1399",
            2,
            vec![
                sample_episode(2, 1, "The North Remembers"),
                sample_episode(2, 2, "The Night Lands"),
            ],
        )
        .with_genres(&dune, &["Science Fiction", "Adventure"])
        .with_genres(&got, &["Drama", "Sci-Fi & Fantasy"])
        .with_catalog(vec![
            ListCatalogEntry::default_list("list-finished", "Finished"),
            ListCatalogEntry::default_list("list-currently", "Currently"),
            ListCatalogEntry::default_list("list-queue", "Want To"),
            ListCatalogEntry::default_list("list-favorites", "Favorites"),
            ListCatalogEntry::default_list("list-dnf", "Did Not Finish"),
            ListCatalogEntry::user_list("list-cozy", "Cozy Rewatches", "me"),
            ListCatalogEntry::rank("rank-villains", "Best Villains", "me"),
        ])
}

fn sample_episode(season: u32, number: u32, title: &str) -> Episode {
    Episode {
        season,
        number,
        title: title.to_string(),
        air_date: None,
    }
}
