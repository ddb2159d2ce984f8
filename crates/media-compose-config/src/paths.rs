use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("MARQUEE_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

pub struct PathManager {
    config_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("marquee");

        Ok(Self::rooted_at(base_dir))
    }

    /// Config files at the base, logs in a subdirectory.
    pub fn rooted_at(base: PathBuf) -> Self {
        Self {
            log_dir: base.join("logs"),
            config_dir: base,
        }
    }

    pub fn from_docker_env() -> Self {
        Self::rooted_at(container_base_path())
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("marquee.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // An explicit base path, or the container directory, wins
        if std::env::var_os("MARQUEE_BASE_PATH").is_some() || container_base_path().exists() {
            return Self::from_docker_env();
        }

        // Otherwise, use platform-specific paths (e.g., ~/.config/marquee on Linux)
        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::rooted_at(dir.path().to_path_buf());

        assert_eq!(paths.config_file(), dir.path().join("config.toml"));
        assert_eq!(paths.credentials_file(), dir.path().join("credentials.toml"));
        assert_eq!(paths.log_file(), dir.path().join("logs").join("marquee.log"));

        paths.ensure_directories().unwrap();
        assert!(paths.log_dir().is_dir());
    }
}
