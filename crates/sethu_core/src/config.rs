use std::path::PathBuf;
use std::time::Duration;

use crate::pagination::KNOWLEDGE_PAGE_SIZE;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_CHAT_BACKEND_URL: &str = "http://localhost:8100";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Directory holding `metadata.json` and the `articles/` bundle.
    pub data_dir: PathBuf,
    /// Base URL of the remote knowledge API. Static content only when unset.
    pub remote_api_base: Option<String>,
    pub remote_timeout: Duration,
    pub chat_backend_url: String,
    pub chat_timeout: Duration,
    /// Storage backend name: "memory" or "sqlite".
    pub storage: String,
    pub database_url: Option<String>,
    pub page_size: usize,
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_dir: PathBuf::from("data"),
            remote_api_base: None,
            remote_timeout: Duration::from_secs(10),
            chat_backend_url: DEFAULT_CHAT_BACKEND_URL.to_string(),
            chat_timeout: Duration::from_secs(15),
            storage: "memory".to_string(),
            database_url: None,
            page_size: KNOWLEDGE_PAGE_SIZE,
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    pub fn bundle_dir(&self) -> PathBuf {
        self.data_dir.join("articles")
    }

    pub fn journey_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", crate::journey::JOURNEY_STORAGE_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 15);
        assert_eq!(config.chat_timeout, Duration::from_secs(15));
        assert!(config.remote_api_base.is_none());
        assert_eq!(config.journey_path(), PathBuf::from("data/janmasethu_journey.json"));
    }
}
