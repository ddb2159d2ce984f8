use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const API_TOKEN: &str = "api_token";
const API_TOKEN_ENV: &str = "MARQUEE_API_TOKEN";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Secrets kept out of config.toml, in a sibling credentials.toml.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_api_token(&self) -> Option<&String> {
        self.get(API_TOKEN)
    }

    pub fn set_api_token(&mut self, token: String) {
        self.set(API_TOKEN.to_string(), token);
    }

    /// Token to use for the backend: `MARQUEE_API_TOKEN`, then the stored
    /// token, then whatever config.toml carries.
    pub fn resolve_api_token(&self, from_config: Option<&str>) -> Option<String> {
        self.pick_api_token(std::env::var(API_TOKEN_ENV).ok(), from_config)
    }

    fn pick_api_token(&self, from_env: Option<String>, from_config: Option<&str>) -> Option<String> {
        from_env
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.get_api_token().cloned())
            .or_else(|| from_config.map(str::to_string))
    }
}
