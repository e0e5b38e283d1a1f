use async_trait::async_trait;
use sethu_core::{Journey, JourneyRepository, Result};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Keeps the journey as a small JSON file, one per data directory.
#[derive(Debug, Clone)]
pub struct FileJourneyRepository {
    path: PathBuf,
}

impl FileJourneyRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl JourneyRepository for FileJourneyRepository {
    async fn load(&self) -> Result<Option<Journey>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.path).await?;
        match serde_json::from_str(&json) {
            Ok(journey) => Ok(Some(journey)),
            Err(e) => {
                // A corrupt file reads as "no journey"; the next save overwrites it.
                tracing::warn!("Ignoring unreadable journey file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, journey: &Journey) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(journey)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!("Saved {} journey to {}", journey.stage, self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJourneyRepository {
    journey: RwLock<Option<Journey>>,
}

impl InMemoryJourneyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JourneyRepository for InMemoryJourneyRepository {
    async fn load(&self) -> Result<Option<Journey>> {
        Ok(self.journey.read().await.clone())
    }

    async fn save(&self, journey: &Journey) -> Result<()> {
        *self.journey.write().await = Some(journey.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.journey.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sethu_core::JourneyStage;

    #[tokio::test]
    async fn test_file_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileJourneyRepository::new(dir.path().join("nested").join("janmasethu_journey.json"));

        assert!(repo.load().await.unwrap().is_none());

        let journey = Journey::new(JourneyStage::Pregnant, NaiveDate::from_ymd_opt(2026, 6, 2));
        repo.save(&journey).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(journey));

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
        repo.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("janmasethu_journey.json");
        std::fs::write(&path, "{\"stage\": \"ASTRONAUT\"}").unwrap();

        let repo = FileJourneyRepository::new(&path);
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory() {
        let repo = InMemoryJourneyRepository::new();
        repo.save(&Journey::new(JourneyStage::Ttc, None)).await.unwrap();
        assert_eq!(repo.load().await.unwrap().unwrap().stage, JourneyStage::Ttc);
        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }
}
