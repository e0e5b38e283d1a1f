use sethu_core::{Config, ContentSource, Error, Result, SiteStorage};
use std::sync::Arc;

pub mod backends;
pub mod content;

pub use backends::*;
pub use content::{CompositeSource, MetadataTable, RemoteSource, StaticSource};

pub const DEFAULT_SQLITE_URL: &str = "sqlite://sethu.db";

/// Storage backend by name: `memory` or `sqlite`.
pub async fn create_storage(name: &str, database_url: Option<&str>) -> Result<Arc<dyn SiteStorage>> {
    match name.to_ascii_lowercase().as_str() {
        "memory" => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let url = database_url.unwrap_or(DEFAULT_SQLITE_URL);
            Ok(Arc::new(SQLiteStorage::new(url).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = database_url;
            Err(Error::Validation(
                "sqlite storage needs the `sqlite` feature".to_string(),
            ))
        }
        other => Err(Error::Validation(format!("unknown storage backend: {}", other))),
    }
}

/// The static bundle, fronted by the remote API when one is configured.
pub async fn build_content_source(config: &Config) -> Result<Arc<dyn ContentSource>> {
    let bundle = Arc::new(StaticSource::load(&config.metadata_path(), &config.bundle_dir()).await?);

    match config.remote_api_base.as_deref() {
        Some(base) => {
            let remote = RemoteSource::new(base, config.remote_timeout, bundle.metadata())?;
            tracing::info!("🌐 Remote knowledge API at {} (static fallback)", base);
            Ok(Arc::new(CompositeSource::new(Arc::new(remote), bundle)))
        }
        None => Ok(bundle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_storage_by_name() {
        assert!(create_storage("memory", None).await.is_ok());
        assert!(create_storage("Memory", None).await.is_ok());
        assert!(matches!(create_storage("chroma", None).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_build_content_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"[{"slug": "pregnancy-foods", "title": {"en": "Safe foods"}, "lens": ["nutrition"], "stage": ["pregnancy"]}]"#,
        )
        .unwrap();

        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let source = build_content_source(&config).await.unwrap();
        assert_eq!(source.name(), "static");
        assert_eq!(source.all_articles().await.unwrap().len(), 1);

        let with_remote = Config {
            remote_api_base: Some("http://127.0.0.1:9".to_string()),
            ..config
        };
        let source = build_content_source(&with_remote).await.unwrap();
        assert_eq!(source.name(), "remote");
    }

    #[tokio::test]
    async fn test_missing_catalogue_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().join("nowhere"),
            ..Config::default()
        };
        assert!(build_content_source(&config).await.is_err());
    }
}
