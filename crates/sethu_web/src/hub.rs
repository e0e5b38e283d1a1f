//! The knowledge hub: listing, lookup and recommendations over whichever
//! content source is configured.
//!
//! Recommendations ask the source for one bounded page of the target stage.
//! The hub also keeps a snapshot of the last catalogue it managed to load.
//! When the source cannot be reached, listings and recommendations are served
//! from that snapshot, so the page keeps rendering something.

use chrono::{NaiveDate, Utc};
use sethu_core::pagination::paginate;
use sethu_core::recommend::{recommendation_query, RELATED_LIMIT};
use sethu_core::{
    filter_articles, recommend, related, Article, ContentLoader, ContentSource, Journey, Language, Listing,
    LoadState, Query, Result, Stage,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const CACHE_SOURCE_NAME: &str = "cache";
/// How long a catalogue snapshot is reused for related-article lookups.
pub const CATALOGUE_TTL: Duration = Duration::from_secs(300);

pub struct KnowledgeHub {
    source: Arc<dyn ContentSource>,
    catalogue: ContentLoader<Vec<Article>>,
    refreshed_at: RwLock<Option<Instant>>,
}

impl KnowledgeHub {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            catalogue: ContentLoader::new(),
            refreshed_at: RwLock::new(None),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn catalogue_state(&self) -> LoadState {
        self.catalogue.state().await
    }

    /// Fetches the whole catalogue. A successful fetch is returned as is,
    /// even when a newer request has since taken over the snapshot; a failed
    /// one falls back to the last good snapshot, or nothing.
    pub async fn catalogue(&self) -> Vec<Article> {
        let ticket = self.catalogue.begin().await;
        match self.source.all_articles().await {
            Ok(articles) => {
                if self.catalogue.finish(ticket, Ok(articles.clone())).await {
                    *self.refreshed_at.write().await = Some(Instant::now());
                }
                articles
            }
            Err(e) => {
                self.catalogue.finish(ticket, Err(e)).await;
                self.catalogue.current().await.unwrap_or_default()
            }
        }
    }

    /// The snapshot while it is fresh, a new fetch otherwise.
    async fn snapshot(&self) -> Vec<Article> {
        let fresh = self
            .refreshed_at
            .read()
            .await
            .is_some_and(|at| at.elapsed() < CATALOGUE_TTL);
        if fresh {
            if let Some(articles) = self.catalogue.current().await {
                return articles;
            }
        }
        self.catalogue().await
    }

    async fn cached(&self) -> Vec<Article> {
        self.catalogue.current().await.unwrap_or_default()
    }

    pub async fn list(&self, query: &Query, page_size: usize) -> Result<Listing> {
        match self.source.list_articles(query, page_size).await {
            Ok(listing) => Ok(listing),
            Err(e) if e.is_unavailable() => {
                let Some(cached) = self.catalogue.current().await else {
                    return Err(e);
                };
                tracing::warn!("⚠️ {} unavailable ({}), filtering cached catalogue", self.source.name(), e);
                let matches = filter_articles(&cached, query);
                Ok(Listing {
                    source: CACHE_SOURCE_NAME.to_string(),
                    page: paginate(&matches, query.page, page_size),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, slug: &str) -> Result<Option<Article>> {
        match self.source.get_article(slug).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_unavailable() => {
                tracing::warn!("⚠️ Lookup of {} failed ({}), trying cached catalogue", slug, e);
                Ok(self.cached().await.into_iter().find(|article| article.slug == slug))
            }
            Err(e) => Err(e),
        }
    }

    /// First page of `query` with `limit` items, or `None` when the source
    /// failed.
    async fn first_page(&self, query: &Query, limit: usize) -> Option<Vec<Article>> {
        match self.source.list_articles(query, limit).await {
            Ok(listing) => {
                let mut items = listing.page.items;
                items.truncate(limit);
                Some(items)
            }
            Err(e) => {
                tracing::warn!("⚠️ Recommendations from {} failed ({}), using cached catalogue", self.source.name(), e);
                None
            }
        }
    }

    /// Recommendations for a journey. Never fails: no journey or no content
    /// means an empty list.
    pub async fn recommendations(&self, journey: Option<&Journey>, language: Language, limit: usize) -> Vec<Article> {
        let Some(journey) = journey else {
            return Vec::new();
        };
        let query = recommendation_query(journey, language, today());
        match self.first_page(&query, limit).await {
            Some(items) => items,
            None => recommend(&self.cached().await, Some(journey), language, limit, today()),
        }
    }

    pub async fn for_stage(&self, stage: Stage, language: Language, limit: usize) -> Vec<Article> {
        let query = Query::new().with_stage(Some(stage)).with_language(language);
        match self.first_page(&query, limit).await {
            Some(items) => items,
            None => {
                let mut matches = filter_articles(&self.cached().await, &query);
                matches.truncate(limit);
                matches
            }
        }
    }

    /// `None` when the article itself does not exist.
    pub async fn related(&self, slug: &str) -> Result<Option<Vec<Article>>> {
        let Some(article) = self.get(slug).await? else {
            return Ok(None);
        };
        let articles = self.snapshot().await;
        Ok(Some(related(&article, &articles, RELATED_LIMIT)))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sethu_core::{Error, JourneyStage, Lens, LocalizedText};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory source that can be switched off. The n-th fetch waits
    /// `delays_ms[n]` before answering.
    struct Flaky {
        articles: Vec<Article>,
        down: AtomicBool,
        delays_ms: Vec<u64>,
        fetches: AtomicUsize,
        full_loads: AtomicUsize,
    }

    impl Flaky {
        async fn check(&self) -> Result<()> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = self.delays_ms.get(n) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::RemoteUnavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContentSource for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn list_articles(&self, query: &Query, page_size: usize) -> Result<Listing> {
            self.check().await?;
            Ok(Listing {
                source: "flaky".to_string(),
                page: paginate(&filter_articles(&self.articles, query), query.page, page_size),
            })
        }

        async fn get_article(&self, slug: &str) -> Result<Option<Article>> {
            self.check().await?;
            Ok(self.articles.iter().find(|a| a.slug == slug).cloned())
        }

        async fn all_articles(&self) -> Result<Vec<Article>> {
            self.full_loads.fetch_add(1, Ordering::SeqCst);
            self.check().await?;
            Ok(self.articles.clone())
        }
    }

    fn slow_hub(down: bool, delays_ms: Vec<u64>) -> (KnowledgeHub, Arc<Flaky>) {
        let article = |slug: &str, lens: Lens, stage: Stage| {
            Article::new(slug, LocalizedText::en(slug), LocalizedText::en(""))
                .with_lens([lens])
                .with_stage([stage])
        };
        let source = Arc::new(Flaky {
            articles: vec![
                article("ivf-10-min", Lens::Medical, Stage::Ttc),
                article("newborn-vaccines", Lens::Medical, Stage::Newborn),
                article("iycf-6-months", Lens::Nutrition, Stage::Newborn),
                article("cost-planning-101", Lens::Financial, Stage::Ttc),
            ],
            down: AtomicBool::new(down),
            delays_ms,
            fetches: AtomicUsize::new(0),
            full_loads: AtomicUsize::new(0),
        });
        (KnowledgeHub::new(source.clone()), source)
    }

    fn hub(down: bool) -> (KnowledgeHub, Arc<Flaky>) {
        slow_hub(down, Vec::new())
    }

    #[tokio::test]
    async fn test_recommendations() {
        let (hub, source) = hub(false);
        let parent = Journey::new(JourneyStage::Parent, Some(today() - chrono::Duration::days(10)));
        let picks = hub.recommendations(Some(&parent), Language::En, 3).await;
        let slugs: Vec<&str> = picks.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newborn-vaccines", "iycf-6-months"]);

        assert!(hub.recommendations(None, Language::En, 3).await.is_empty());
        assert_eq!(hub.for_stage(Stage::Ttc, Language::En, 1).await.len(), 1);
        assert_eq!(source.full_loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlapping_requests_keep_their_results() {
        let (hub, _) = slow_hub(false, vec![20, 200]);
        let ttc = Journey::new(JourneyStage::Ttc, None);
        let (first, second) = tokio::join!(
            hub.recommendations(Some(&ttc), Language::En, 1),
            hub.recommendations(Some(&ttc), Language::En, 1)
        );
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);

        let (hub, _) = slow_hub(false, vec![20, 200]);
        let (first, second) = tokio::join!(hub.catalogue(), hub.catalogue());
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);
        assert_eq!(hub.catalogue_state().await, LoadState::Loaded);
    }

    #[tokio::test]
    async fn test_unreachable_source_serves_last_catalogue() {
        let (hub, source) = hub(false);
        assert_eq!(hub.catalogue().await.len(), 4);

        source.down.store(true, Ordering::SeqCst);
        let ttc = Journey::new(JourneyStage::Ttc, None);
        assert_eq!(hub.recommendations(Some(&ttc), Language::En, 7).await.len(), 2);
        assert_eq!(hub.for_stage(Stage::Newborn, Language::En, 1).await.len(), 1);

        assert_eq!(hub.catalogue().await.len(), 4);
        assert!(matches!(hub.catalogue_state().await, LoadState::Error(_)));

        let listing = hub.list(&Query::new().with_search("ivf"), 15).await.unwrap();
        assert_eq!(listing.source, CACHE_SOURCE_NAME);
        assert_eq!(listing.page.items.len(), 1);

        assert!(hub.get("cost-planning-101").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_source_without_snapshot() {
        let (hub, _) = hub(true);
        let ttc = Journey::new(JourneyStage::Ttc, None);
        assert!(hub.recommendations(Some(&ttc), Language::En, 3).await.is_empty());
        assert!(hub.list(&Query::new(), 15).await.is_err());
        assert_eq!(hub.get("ivf-10-min").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_related_reuses_snapshot() {
        let (hub, source) = hub(false);
        let related = hub.related("ivf-10-min").await.unwrap().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].slug, "newborn-vaccines");
        assert!(hub.related("missing").await.unwrap().is_none());

        hub.related("iycf-6-months").await.unwrap();
        assert_eq!(source.full_loads.load(Ordering::SeqCst), 1);
    }
}
