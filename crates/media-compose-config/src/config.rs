use media_compose_models::SystemList;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Prefer the credentials file; this is for containers that inject it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// System list that `track` uses when no list is attached
    #[serde(default = "default_list")]
    pub default_list: String,
    #[serde(default = "default_max_poll_options")]
    pub max_poll_options: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_genre_batch_size")]
    pub genre_batch_size: usize,
    #[serde(default = "default_genre_batch_delay_ms")]
    pub genre_batch_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "https://api.marquee.social/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_list() -> String {
    SystemList::Finished.as_str().to_string()
}

fn default_max_poll_options() -> usize {
    6
}

fn default_genre_batch_size() -> usize {
    5
}

fn default_genre_batch_delay_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            default_list: default_list(),
            max_poll_options: default_max_poll_options(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            genre_batch_size: default_genre_batch_size(),
            genre_batch_delay_ms: default_genre_batch_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json_logging(),
            file: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ComposerConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// The configured default list. Falls back to `finished` for values
    /// `validate` would reject.
    pub fn default_system_list(&self) -> SystemList {
        SystemList::from_normalized(self.default_list.trim()).unwrap_or(SystemList::Finished)
    }
}

impl MetadataConfig {
    pub fn genre_batch_delay(&self) -> Duration {
        Duration::from_millis(self.genre_batch_delay_ms)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base_url = self.backend.base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow::anyhow!("backend.base_url is required and cannot be empty"));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "backend.base_url must start with http:// or https:// (got {})",
                base_url
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(anyhow::anyhow!("backend.timeout_secs must be at least 1"));
        }

        if SystemList::from_normalized(self.composer.default_list.trim()).is_none() {
            let valid: Vec<&str> = SystemList::ALL.iter().map(|l| l.as_str()).collect();
            return Err(anyhow::anyhow!(
                "Invalid composer.default_list: {} (expected one of {})",
                self.composer.default_list,
                valid.join(", ")
            ));
        }
        if self.composer.max_poll_options < 2 {
            return Err(anyhow::anyhow!("composer.max_poll_options must be at least 2"));
        }

        if self.metadata.genre_batch_size == 0 {
            return Err(anyhow::anyhow!("metadata.genre_batch_size must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.backend.base_url = "http://localhost:8080".to_string();
        config.composer.default_list = "queue".to_string();
        config.metadata.genre_batch_size = 3;

        config.save_to_file(file.path()).unwrap();
        let loaded = Config::load_from_file(file.path()).unwrap();

        assert_eq!(loaded.backend.base_url, "http://localhost:8080");
        assert_eq!(loaded.composer.default_system_list(), SystemList::Queue);
        assert_eq!(loaded.metadata.genre_batch_size, 3);
        assert_eq!(loaded.backend.api_token, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "https://staging.marquee.social"

            [composer]
            max_poll_options = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.composer.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.composer.default_list, "finished");
        assert_eq!(config.composer.max_poll_options, 4);
        assert_eq!(config.metadata.genre_batch_delay(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.backend.base_url = "".to_string();
        assert!(config.validate().is_err());
        config.backend.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
        config.backend.base_url = "https://example.com".to_string();

        config.composer.default_list = "watched".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_list"));
        config.composer.default_list = "dnf".to_string();

        config.composer.max_poll_options = 1;
        assert!(config.validate().is_err());
        config.composer.max_poll_options = 2;

        config.metadata.genre_batch_size = 0;
        assert!(config.validate().is_err());
        config.metadata.genre_batch_size = 5;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.composer.max_poll_options, 6);
    }
}
