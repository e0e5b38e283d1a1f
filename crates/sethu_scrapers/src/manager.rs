use serde::Serialize;
use sethu_core::logging::Logger;
use sethu_core::{Error, Result, ScrapeStatus, SiteStorage};
use std::sync::Arc;

use crate::client::HtmlClient;
use crate::scrapers::{get_scrapers, Scraped, Scraper};

pub const DEFAULT_MAX_PAGES: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeResult {
    pub url: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScrapeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeReport {
    pub count: usize,
    pub results: Vec<ScrapeResult>,
}

impl ScrapeReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }
}

/// Crawls a source, scrapes each page and upserts the result.
pub struct ScraperManager {
    storage: Arc<dyn SiteStorage>,
    scrapers: Vec<Box<dyn Scraper>>,
}

impl ScraperManager {
    pub fn new(storage: Arc<dyn SiteStorage>) -> Result<Self> {
        Ok(Self::with_scrapers(storage, get_scrapers(HtmlClient::new()?)))
    }

    pub fn with_scrapers(storage: Arc<dyn SiteStorage>, scrapers: Vec<Box<dyn Scraper>>) -> Self {
        Self { storage, scrapers }
    }

    pub fn scrapers(&self) -> &[Box<dyn Scraper>] {
        &self.scrapers
    }

    pub fn get_scraper(&self, name: &str) -> Result<&dyn Scraper> {
        let name = name.to_ascii_lowercase();
        self.scrapers
            .iter()
            .find(|s| s.cli_names().contains(&name.as_str()))
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::NotFound(format!("scraper {}", name)))
    }

    pub fn get_scraper_for_url(&self, url: &str) -> Result<&dyn Scraper> {
        self.scrapers
            .iter()
            .find(|s| s.can_handle(url))
            .map(|s| s.as_ref())
            .ok_or_else(|| Error::Scraping(format!("No scraper found for URL: {}", url)))
    }

    async fn store(&self, scraped: &Scraped) -> Result<ScrapeStatus> {
        match scraped {
            Scraped::Post(post) => self.storage.upsert_post(post).await,
            Scraped::Doctor(doctor) => self.storage.upsert_doctor(doctor).await,
        }
    }

    async fn scrape_with(&self, scraper: &dyn Scraper, url: &str) -> Result<(Scraped, ScrapeStatus)> {
        let scraped = scraper.scrape(url).await?;
        let status = self.store(&scraped).await?;
        Ok((scraped, status))
    }

    /// Scrapes and stores a single page.
    pub async fn scrape_url(&self, url: &str) -> Result<(Scraped, ScrapeStatus)> {
        let scraper = self.get_scraper_for_url(url)?;
        self.scrape_with(scraper, url).await
    }

    /// Runs one source end to end. A failing page is recorded in the
    /// report and the run carries on.
    pub async fn scrape_source(&self, name: &str, max: usize) -> Result<ScrapeReport> {
        let scraper = self.get_scraper(name)?;
        let meta = scraper.source_metadata();
        let logger = Logger::new().with_prefix(meta.site).with_prefix(meta.name);

        let urls = scraper.collect_urls(max).await?;
        logger.info(&format!("{} Found {} pages", meta.emoji, urls.len()));

        let mut results = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            match self.scrape_with(scraper, url).await {
                Ok((scraped, status)) => {
                    logger.info(&format!("{} {} - {}", status.emoji(), scraped.title(), url));
                    results.push(ScrapeResult {
                        url: url.clone(),
                        ok: true,
                        status: Some(status),
                        error: None,
                    });
                }
                Err(e) => {
                    logger.error(&format!("Failed to scrape {}: {}", url, e));
                    results.push(ScrapeResult {
                        url: url.clone(),
                        ok: false,
                        status: None,
                        error: Some(e.to_string()),
                    });
                }
            }
            if i + 1 < urls.len() {
                tokio::time::sleep(scraper.delay()).await;
            }
        }

        let report = ScrapeReport {
            count: results.len(),
            results,
        };
        logger.info(&format!("✅ {}/{} pages stored", report.succeeded(), report.count));
        Ok(report)
    }
}
