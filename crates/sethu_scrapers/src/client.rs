use reqwest::Client;
use sethu_core::{Error, Result};
use std::time::Duration;

pub const USER_AGENT: &str = "JanmaSethuBot/1.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Shared HTTP client for fetching pages to scrape.
#[derive(Debug, Clone)]
pub struct HtmlClient {
    client: Client,
}

impl HtmlClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_html(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("HTTP {} for {}", status.as_u16(), url)));
        }
        Ok(response.text().await?)
    }
}
