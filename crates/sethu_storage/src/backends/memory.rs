use async_trait::async_trait;
use sethu_core::{Doctor, Lead, Result, ScrapeStatus, ScrapedPost, SiteStorage, Story};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    leads: Vec<Lead>,
    stories: Vec<Story>,
    posts: Vec<ScrapedPost>,
    doctors: Vec<Doctor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_post(&mut self, post: &ScrapedPost) -> ScrapeStatus {
        match self.posts.iter_mut().find(|p| p.source_url == post.source_url) {
            Some(existing) => {
                let status = ScrapeStatus::from_hashes(Some(&existing.content_hash), &post.content_hash);
                if status == ScrapeStatus::Updated {
                    *existing = post.clone();
                }
                status
            }
            None => {
                self.posts.push(post.clone());
                ScrapeStatus::New
            }
        }
    }

    pub fn upsert_doctor(&mut self, doctor: &Doctor) -> ScrapeStatus {
        match self
            .doctors
            .iter_mut()
            .find(|d| d.source_site == doctor.source_site && d.slug == doctor.slug)
        {
            Some(existing) => {
                let status = ScrapeStatus::from_hashes(Some(&existing.content_hash), &doctor.content_hash);
                if status == ScrapeStatus::Updated {
                    *existing = doctor.clone();
                }
                status
            }
            None => {
                self.doctors.push(doctor.clone());
                ScrapeStatus::New
            }
        }
    }
}

/// Default backend. Everything is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStorage for InMemoryStorage {
    async fn store_lead(&self, lead: &Lead) -> Result<()> {
        self.store.write().await.leads.push(lead.clone());
        Ok(())
    }

    async fn list_leads(&self) -> Result<Vec<Lead>> {
        let store = self.store.read().await;
        Ok(store.leads.iter().rev().cloned().collect())
    }

    async fn store_story(&self, story: &Story) -> Result<()> {
        self.store.write().await.stories.push(story.clone());
        Ok(())
    }

    async fn list_stories(&self) -> Result<Vec<Story>> {
        let store = self.store.read().await;
        Ok(store.stories.iter().rev().cloned().collect())
    }

    async fn upsert_post(&self, post: &ScrapedPost) -> Result<ScrapeStatus> {
        Ok(self.store.write().await.upsert_post(post))
    }

    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<ScrapedPost>> {
        let store = self.store.read().await;
        Ok(store.posts.iter().rev().skip(offset).take(limit).cloned().collect())
    }

    async fn get_post(&self, slug: &str) -> Result<Option<ScrapedPost>> {
        let store = self.store.read().await;
        Ok(store.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn upsert_doctor(&self, doctor: &Doctor) -> Result<ScrapeStatus> {
        Ok(self.store.write().await.upsert_doctor(doctor))
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        let store = self.store.read().await;
        let mut doctors = store.doctors.clone();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }
}
