use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use sethu_core::{Doctor, Result, ScrapedPost};
use std::time::Duration;

use crate::client::HtmlClient;

pub mod medcy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub emoji: &'static str,
    pub site: &'static str,
}

/// What one scraped page turned into.
#[derive(Debug, Clone)]
pub enum Scraped {
    Post(ScrapedPost),
    Doctor(Doctor),
}

impl Scraped {
    pub fn title(&self) -> &str {
        match self {
            Scraped::Post(post) => &post.title,
            Scraped::Doctor(doctor) => &doctor.name,
        }
    }
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Names accepted by `scrape source <name>`
    fn cli_names(&self) -> Vec<&str>;

    /// Pause between consecutive page fetches
    fn delay(&self) -> Duration;

    /// Finds up to `max` page URLs worth scraping
    async fn collect_urls(&self, max: usize) -> Result<Vec<String>>;

    async fn scrape(&self, url: &str) -> Result<Scraped>;
}

/// Every scraper we ship, sharing one HTTP client.
pub fn get_scrapers(client: HtmlClient) -> Vec<Box<dyn Scraper>> {
    vec![
        Box::new(medcy::MedcyBlogScraper::new(client.clone())),
        Box::new(medcy::MedcyDoctorsScraper::new(client)),
    ]
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use sethu_core::Error;
    use sha2::{Digest, Sha256};
    use url::Url;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::Scraping(format!("Failed to parse URL {}: {}", url, e)))
    }

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {}: {:?}", css, e)))
    }

    /// Trimmed text of the first element matching `css` that has any.
    pub fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
        let selector = selector(css)?;
        Ok(document
            .select(&selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty()))
    }

    pub fn first_text_in(element: ElementRef<'_>, css: &str) -> Result<Option<String>> {
        let selector = selector(css)?;
        Ok(element
            .select(&selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty()))
    }

    /// `content` of the first `<meta>` matching `css`.
    pub fn meta_content(document: &Html, css: &str) -> Result<Option<String>> {
        let selector = selector(css)?;
        Ok(document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string))
    }

    /// First element matching any of `candidates`, tried in order.
    pub fn first_match<'a>(document: &'a Html, candidates: &[&str]) -> Result<Option<ElementRef<'a>>> {
        for css in candidates {
            if let Some(el) = document.select(&selector(css)?).next() {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    /// `src` of the first image inside `element`, resolved against `base`.
    pub fn first_image(element: ElementRef<'_>, base: &Url) -> Result<Option<String>> {
        let selector = selector("img[src]")?;
        Ok(element
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| resolve(base, src)))
    }

    pub fn resolve(base: &Url, href: &str) -> Option<String> {
        base.join(href.trim()).ok().map(|url| url.to_string())
    }

    /// Every `href` on the page, resolved against `base`.
    pub fn links(document: &Html, base: &Url) -> Result<Vec<String>> {
        let selector = selector("a[href]")?;
        Ok(document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(base, href))
            .collect())
    }

    /// Drops the fragment and any `utm_*` tracking parameters.
    pub fn normalize_url(url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        parsed.set_fragment(None);
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !key.starts_with("utm_"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
        parsed.to_string()
    }

    /// Non-empty path segments of `url`.
    pub fn path_segments(url: &Url) -> Vec<String> {
        url.path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Last path segment, or the URL itself when it has none.
    pub fn slug_from_url(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| path_segments(&u).pop())
            .unwrap_or_else(|| url.to_string())
    }

    pub fn host_is(url: &Url, site: &str) -> bool {
        url.host_str()
            .map(|host| {
                let host = host.to_ascii_lowercase();
                host == site || host.ends_with(&format!(".{}", site))
            })
            .unwrap_or(false)
    }

    /// Hex SHA-256 of the trimmed input.
    pub fn content_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// At most `max` characters, never splitting a character.
    pub fn truncate_chars(text: &str, max: usize) -> String {
        text.chars().take(max).collect()
    }

    /// Order-preserving dedupe.
    pub fn dedupe(urls: impl IntoIterator<Item = String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::utils;
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(utils::parse_url("https://medcyivf.in/blog/").is_ok());
        assert!(utils::parse_url("invalid-url").is_err());
    }

    #[test]
    fn test_first_text_and_meta() {
        let html = r#"
            <html><head>
                <meta property="og:title" content="  IVF success rates  ">
                <meta property="og:image" content="">
            </head><body>
                <h1 class="entry-title">   </h1>
                <h1>Understanding   AMH</h1>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(utils::first_text(&document, "h1").unwrap().as_deref(), Some("Understanding AMH"));
        assert_eq!(utils::first_text(&document, "h1.entry-title").unwrap(), None);
        assert_eq!(
            utils::meta_content(&document, r#"meta[property="og:title"]"#).unwrap().as_deref(),
            Some("IVF success rates")
        );
        assert_eq!(utils::meta_content(&document, r#"meta[property="og:image"]"#).unwrap(), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            utils::normalize_url("https://medcyivf.in/doctors/dr-rao/?utm_source=fb&utm_medium=ad#book"),
            "https://medcyivf.in/doctors/dr-rao/"
        );
        assert_eq!(
            utils::normalize_url("https://medcyivf.in/team/x/?lang=te&utm_campaign=y"),
            "https://medcyivf.in/team/x/?lang=te"
        );
        assert_eq!(utils::normalize_url("not a url"), "not a url");
    }

    #[test]
    fn test_slug_and_host() {
        assert_eq!(utils::slug_from_url("https://medcyivf.in/blog/ivf-myths/"), "ivf-myths");
        let url = utils::parse_url("https://www.medcyivf.in/blog/x").unwrap();
        assert!(utils::host_is(&url, "medcyivf.in"));
        let other = utils::parse_url("https://notmedcyivf.in/blog/x").unwrap();
        assert!(!utils::host_is(&other, "medcyivf.in"));
    }

    #[test]
    fn test_content_hash_ignores_outer_whitespace() {
        assert_eq!(utils::content_hash("<p>a</p>"), utils::content_hash("  <p>a</p>\n"));
        assert_ne!(utils::content_hash("<p>a</p>"), utils::content_hash("<p>b</p>"));
        assert_eq!(utils::content_hash("").len(), 64);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(utils::truncate_chars("నమస్కారం", 3).chars().count(), 3);
        assert_eq!(
            utils::dedupe(vec!["b".to_string(), "a".to_string(), "b".to_string()]),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_get_scrapers() {
        let scrapers = get_scrapers(HtmlClient::new().unwrap());
        assert_eq!(scrapers.len(), 2);
        assert!(scrapers.iter().any(|s| s.cli_names().contains(&"medcy-blog")));
        assert!(scrapers.iter().any(|s| s.can_handle("https://medcyivf.in/doctors/dr-rao/")));
    }
}
