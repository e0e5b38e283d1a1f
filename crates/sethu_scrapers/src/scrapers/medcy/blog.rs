use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use sethu_core::{Error, Result, ScrapedPost};
use std::time::Duration;

use super::{BASE_URL, SITE};
use crate::client::HtmlClient;
use crate::sanitize::{sanitize_html, BLOG_RULES};
use crate::scrapers::utils;
use crate::scrapers::{Scraped, Scraper, SourceMetadata};

const EXCERPT_CHARS: usize = 240;
const CONTENT_SELECTORS: &[&str] = &[".entry-content", ".post-content", ".single-post .content", "article"];

#[derive(Debug, Clone)]
pub struct MedcyBlogScraper {
    client: HtmlClient,
}

impl MedcyBlogScraper {
    pub fn new(client: HtmlClient) -> Self {
        Self { client }
    }

    pub fn listing_url() -> String {
        format!("{}/blog/", BASE_URL)
    }
}

/// A post lives at exactly `/blog/<slug>` on the clinic's domain.
pub fn is_post_url(url: &str) -> bool {
    let Ok(parsed) = utils::parse_url(url) else {
        return false;
    };
    if !utils::host_is(&parsed, SITE) {
        return false;
    }
    let segments = utils::path_segments(&parsed);
    segments
        .iter()
        .position(|s| s == "blog")
        .is_some_and(|i| segments.len() == i + 2)
}

/// Post links on a listing page, fragments stripped, first `max` kept.
pub fn parse_post_urls(listing_url: &str, html: &str, max: usize) -> Result<Vec<String>> {
    let base = utils::parse_url(listing_url)?;
    let document = Html::parse_document(html);
    let urls = utils::links(&document, &base)?
        .into_iter()
        .filter(|url| is_post_url(url))
        .map(|url| url.split('#').next().unwrap_or_default().to_string());
    Ok(utils::dedupe(urls).into_iter().take(max).collect())
}

pub fn parse_post(url: &str, html: &str) -> Result<ScrapedPost> {
    let base = utils::parse_url(url)?;
    let document = Html::parse_document(html);

    let title = match utils::first_text(&document, "h1.entry-title")? {
        Some(title) => title,
        None => match utils::meta_content(&document, r#"meta[property="og:title"]"#)? {
            Some(title) => title,
            None => utils::first_text(&document, "title")?
                .ok_or_else(|| Error::Scraping(format!("No title found at {}", url)))?,
        },
    };

    let content = utils::first_match(&document, CONTENT_SELECTORS)?;

    let image_url = match utils::meta_content(&document, r#"meta[property="og:image"]"#)? {
        Some(image) => Some(image),
        None => match utils::meta_content(&document, r#"meta[name="twitter:image"]"#)? {
            Some(image) => Some(image),
            None => match content {
                Some(content) => utils::first_image(content, &base)?,
                None => None,
            },
        },
    };

    let first_paragraph = match content {
        Some(content) => utils::first_text_in(content, "p")?,
        None => None,
    };
    let excerpt = match first_paragraph {
        Some(p) => Some(p),
        None => utils::first_text(&document, "p")?,
    }
    .map(|p| utils::truncate_chars(&p, EXCERPT_CHARS));

    let content_html = content
        .map(|content| sanitize_html(content, &BLOG_RULES))
        .unwrap_or_default();

    Ok(ScrapedPost {
        source_site: SITE.to_string(),
        slug: utils::slug_from_url(url),
        title,
        excerpt,
        content_hash: utils::content_hash(&content_html),
        content_html,
        image_url,
        source_url: url.to_string(),
        scraped_at: Utc::now(),
    })
}

#[async_trait]
impl Scraper for MedcyBlogScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Medcy IVF Blog",
            emoji: "📝",
            site: SITE,
        }
    }

    fn can_handle(&self, url: &str) -> bool {
        is_post_url(url)
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["medcy-blog", "medcy"]
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(1200)
    }

    async fn collect_urls(&self, max: usize) -> Result<Vec<String>> {
        let listing = Self::listing_url();
        let html = self.client.get_html(&listing).await?;
        parse_post_urls(&listing, &html, max)
    }

    async fn scrape(&self, url: &str) -> Result<Scraped> {
        let html = self.client.get_html(url).await?;
        Ok(Scraped::Post(parse_post(url, &html)?))
    }
}
