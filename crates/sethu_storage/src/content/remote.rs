use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use sethu_core::pagination::{total_pages, Page, Pagination};
use sethu_core::types::{parse_tags, ArticleSection, DEFAULT_READ_TIME_MINUTES};
use sethu_core::{Article, ContentSource, Error, Listing, LocalizedText, Query, Result};

use super::metadata::MetadataTable;

pub const REMOTE_SOURCE_NAME: &str = "remote";
const ALL_ARTICLES_PAGE_SIZE: usize = 100;
const ALL_ARTICLES_MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct RemoteListing {
    #[serde(default)]
    pagination: Option<RemotePagination>,
    #[serde(default)]
    items: Vec<RemoteArticle>,
}

#[derive(Debug, Deserialize)]
struct RemotePagination {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    per_page: Option<usize>,
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    has_more: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RemoteArticle {
    slug: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    lens: Option<String>,
    #[serde(default)]
    life_stage: Option<String>,
    #[serde(default)]
    read_time_minutes: Option<u32>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    content: Option<Value>,
}

/// The hosted knowledge API. Filtering and pagination happen server-side;
/// text comes back in English only.
pub struct RemoteSource {
    client: Client,
    base: Url,
    metadata: Arc<MetadataTable>,
}

impl RemoteSource {
    pub fn new(base: &str, timeout: Duration, metadata: Arc<MetadataTable>) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| Error::Validation(format!("bad remote API url {}: {}", base, e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base, metadata })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Validation(format!("remote API url cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, params: &[(&str, String)]) -> Result<reqwest::Response> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(params)
            .header("Accept", "application/json")
            .header("ngrok-skip-browser-warning", "true")
            .send()
            .await?;
        Ok(response)
    }

    async fn fetch_page(&self, query: &Query, page_size: usize) -> Result<RemoteListing> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(stage) = query.stage {
            params.push(("lifeStage", stage.as_str().to_string()));
        }
        if let Some(lens) = query.lens {
            params.push(("perspective", lens.as_str().to_string()));
        }
        if !query.search.is_empty() {
            params.push(("search", query.search.clone()));
        }
        params.push(("page", query.page.max(1).to_string()));
        params.push(("perPage", page_size.to_string()));

        let url = self.endpoint(&["api", "knowledge", "articles"])?;
        let response = self.get(url.clone(), &params).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!("HTTP {} from {}", status, url)));
        }
        Ok(response.json().await?)
    }

    fn to_article(&self, remote: RemoteArticle) -> Article {
        let mut lens = parse_tags(remote.lens.iter().flat_map(|l| l.split(',')));
        if lens.is_empty() {
            lens = self.metadata.lens(&remote.slug);
        }
        let mut stage = parse_tags(remote.life_stage.iter().flat_map(|s| s.split(',')));
        if stage.is_empty() {
            stage = self.metadata.stage(&remote.slug);
        }

        let sections = remote
            .content
            .and_then(|content| serde_json::from_value::<Vec<ArticleSection>>(content).ok())
            .unwrap_or_default();

        let mut article = Article::new(remote.slug, LocalizedText::en(remote.title), LocalizedText::en(remote.summary))
            .with_lens(lens)
            .with_stage(stage);
        article.read_time_minutes = remote
            .read_time_minutes
            .filter(|&m| m > 0)
            .unwrap_or(DEFAULT_READ_TIME_MINUTES);
        article.published_at = remote
            .published_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));
        article.sections = sections;
        article
    }
}

#[async_trait]
impl ContentSource for RemoteSource {
    fn name(&self) -> &str {
        REMOTE_SOURCE_NAME
    }

    async fn list_articles(&self, query: &Query, page_size: usize) -> Result<Listing> {
        let remote = self.fetch_page(query, page_size).await?;
        let items: Vec<Article> = remote.items.into_iter().map(|a| self.to_article(a)).collect();

        let per_page = remote
            .pagination
            .as_ref()
            .and_then(|p| p.per_page)
            .unwrap_or(page_size)
            .max(1);
        let page = remote.pagination.as_ref().and_then(|p| p.page).unwrap_or(query.page).max(1);
        let total = remote.pagination.as_ref().and_then(|p| p.total).unwrap_or(items.len());
        let has_more = remote
            .pagination
            .as_ref()
            .and_then(|p| p.has_more)
            .unwrap_or(page * per_page < total);

        Ok(Listing {
            source: REMOTE_SOURCE_NAME.to_string(),
            page: Page {
                items,
                pagination: Pagination {
                    page,
                    per_page,
                    total,
                    total_pages: total_pages(total, per_page),
                    has_more,
                },
            },
        })
    }

    async fn get_article(&self, slug: &str) -> Result<Option<Article>> {
        let url = self.endpoint(&["api", "knowledge", "articles", slug])?;
        let response = self.get(url.clone(), &[]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!("Article not found remotely: {}", slug);
                Ok(None)
            }
            status if status.is_success() => {
                let remote: RemoteArticle = response.json().await?;
                Ok(Some(self.to_article(remote)))
            }
            status => Err(Error::RemoteUnavailable(format!("HTTP {} from {}", status, url))),
        }
    }

    async fn all_articles(&self) -> Result<Vec<Article>> {
        let mut articles = Vec::new();
        for page in 1..=ALL_ARTICLES_MAX_PAGES {
            let listing = self
                .list_articles(&Query::new().with_page(page), ALL_ARTICLES_PAGE_SIZE)
                .await?;
            let done = !listing.page.pagination.has_more || listing.page.items.is_empty();
            articles.extend(listing.page.items);
            if done {
                break;
            }
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query as AxumQuery};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::get;
    use axum::{Json, Router};
    use sethu_core::{Language, Lens, Stage};
    use std::collections::HashMap;

    const METADATA: &str = r#"[
        {"slug": "newborn-vaccines", "title": {"en": "Newborn vaccines"}, "lens": ["medical"], "stage": ["newborn"]}
    ]"#;

    async fn listing(headers: HeaderMap, AxumQuery(params): AxumQuery<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(headers.get("ngrok-skip-browser-warning").unwrap(), "true");
        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let per_page: usize = params.get("perPage").and_then(|p| p.parse().ok()).unwrap_or(20);
        Json(serde_json::json!({
            "query": params.get("search"),
            "filters": {"life_stage": params.get("lifeStage"), "perspective": params.get("perspective")},
            "pagination": {"page": page, "per_page": per_page, "total": 2, "has_more": false},
            "items": [
                {"id": "1", "slug": "newborn-vaccines", "title": "Newborn vaccines", "summary": "Schedule",
                 "topic": "care", "section": "baby", "lens": "", "life_stage": null,
                 "read_time_minutes": 4, "published_at": "2024-05-01T10:00:00Z"},
                {"id": "2", "slug": "cost-planning-101", "title": "Cost planning", "summary": "Budgets",
                 "topic": "money", "section": "ivf", "lens": "financial,medical", "life_stage": "ttc",
                 "read_time_minutes": 0, "published_at": "not a date"}
            ]
        }))
    }

    async fn detail(Path(slug): Path<String>) -> std::result::Result<Json<Value>, AxumStatus> {
        match slug.as_str() {
            "cost-planning-101" => Ok(Json(serde_json::json!({
                "id": "2", "slug": "cost-planning-101", "title": "Cost planning", "summary": "Budgets",
                "lens": "financial", "life_stage": "ttc",
                "content": [{"id": "intro", "title": {"en": "Intro"},
                             "content": [{"type": "paragraph", "text": {"en": "Plan early."}}]}]
            }))),
            "broken" => Err(AxumStatus::INTERNAL_SERVER_ERROR),
            _ => Err(AxumStatus::NOT_FOUND),
        }
    }

    async fn upstream() -> String {
        let app = Router::new()
            .route("/api/knowledge/articles", get(listing))
            .route("/api/knowledge/articles/:slug", get(detail));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source(base: &str) -> RemoteSource {
        let metadata = Arc::new(MetadataTable::from_json(METADATA).unwrap());
        RemoteSource::new(base, Duration::from_secs(5), metadata).unwrap()
    }

    #[tokio::test]
    async fn test_listing_fills_missing_tags_from_metadata() {
        let base = upstream().await;
        let remote = source(&base);

        let query = Query::new().with_stage(Some(Stage::Ttc)).with_search("cost");
        let listing = remote.list_articles(&query, 15).await.unwrap();
        assert_eq!(listing.source, "remote");
        assert_eq!(listing.page.pagination.total, 2);
        assert_eq!(listing.page.pagination.total_pages, 1);

        let vaccines = &listing.page.items[0];
        assert!(vaccines.lens.contains(&Lens::Medical));
        assert!(vaccines.stage.contains(&Stage::Newborn));
        assert_eq!(vaccines.read_time_minutes, 4);
        assert!(vaccines.published_at.is_some());

        let cost = &listing.page.items[1];
        assert_eq!(cost.lens.len(), 2);
        assert_eq!(cost.read_time_minutes, DEFAULT_READ_TIME_MINUTES);
        assert!(cost.published_at.is_none());
        assert_eq!(cost.title.get(Language::Hi), "Cost planning");
    }

    #[tokio::test]
    async fn test_detail_lookup() {
        let base = upstream().await;
        let remote = source(&base);

        let article = remote.get_article("cost-planning-101").await.unwrap().unwrap();
        assert_eq!(article.sections.len(), 1);
        assert!(remote.get_article("missing").await.unwrap().is_none());

        let err = remote.get_article("broken").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = source(&format!("http://{}", addr));
        let err = remote.list_articles(&Query::new(), 15).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_rejects_bad_base() {
        let metadata = Arc::new(MetadataTable::default());
        assert!(RemoteSource::new("not a url", Duration::from_secs(1), metadata).is_err());
    }
}
