use async_trait::async_trait;

use crate::lead::{Lead, Story};
use crate::scraped::{Doctor, ScrapeStatus, ScrapedPost};
use crate::Result;

#[async_trait]
pub trait SiteStorage: Send + Sync {
    /// Persist a validated lead
    async fn store_lead(&self, lead: &Lead) -> Result<()>;

    /// All leads, newest first
    async fn list_leads(&self) -> Result<Vec<Lead>>;

    async fn store_story(&self, story: &Story) -> Result<()>;

    async fn list_stories(&self) -> Result<Vec<Story>>;

    /// Insert or update a post keyed by its source URL
    async fn upsert_post(&self, post: &ScrapedPost) -> Result<ScrapeStatus>;

    /// Posts, most recently inserted first
    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<ScrapedPost>>;

    async fn get_post(&self, slug: &str) -> Result<Option<ScrapedPost>>;

    /// Insert or update a doctor keyed by (source site, slug)
    async fn upsert_doctor(&self, doctor: &Doctor) -> Result<ScrapeStatus>;

    async fn list_doctors(&self) -> Result<Vec<Doctor>>;
}
