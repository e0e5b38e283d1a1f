use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sethu_core::journey::parse_journey_date;
use sethu_core::recommend::{DEFAULT_RECOMMENDATION_LIMIT, MAX_RECOMMENDATION_LIMIT};
use sethu_core::types::ArticleDetail;
use sethu_core::{
    ArticleView, Doctor, Error, Journey, JourneyStage, Language, Lead, LeadSubmission, Lens, Pagination, QueryParams,
    ScrapedPost, Stage, Story, StorySubmission,
};
use sethu_scrapers::manager::DEFAULT_MAX_PAGES;
use sethu_scrapers::ScrapeReport;
use std::sync::Arc;

use crate::error::ApiError;
use crate::proxy::{ChatRequest, BINDING_STATUS};
use crate::AppState;

pub const DEFAULT_BLOG_LIMIT: usize = 24;
pub const MAX_BLOG_LIMIT: usize = 100;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "source": state.hub.source_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct Filters {
    pub lens: String,
    pub stage: String,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub query: String,
    pub filters: Filters,
    pub language: Language,
    pub source: String,
    pub items: Vec<ArticleView>,
    pub pagination: Pagination,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<ListingResponse>> {
    let query = sethu_core::Query::from(params);
    let listing = state
        .hub
        .list(&query, state.page_size)
        .await
        .map_err(ApiError::search)?;

    let language = query.language;
    Ok(Json(ListingResponse {
        filters: Filters {
            lens: query.lens.map_or("all", |lens| lens.as_str()).to_string(),
            stage: query.stage.map_or("all", |stage| stage.as_str()).to_string(),
        },
        query: query.search,
        language,
        source: listing.source,
        items: listing.page.items.iter().map(|article| article.view(language)).collect(),
        pagination: listing.page.pagination,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    pub lang: Option<String>,
}

impl LangParams {
    fn language(&self) -> Language {
        self.lang.as_deref().map(Language::parse_or_default).unwrap_or_default()
    }
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<LangParams>,
) -> ApiResult<Json<ArticleDetail>> {
    let article = state
        .hub
        .get(&slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("article {}", slug)))?;
    Ok(Json(article.detail(params.language())))
}

pub async fn related_articles(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<LangParams>,
) -> ApiResult<Json<Vec<ArticleView>>> {
    let language = params.language();
    let related = state
        .hub
        .related(&slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("article {}", slug)))?;
    Ok(Json(related.iter().map(|article| article.view(language)).collect()))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationParams {
    pub journey: Option<String>,
    pub date: Option<String>,
    pub stage: Option<String>,
    pub lang: Option<String>,
    pub limit: Option<String>,
}

impl RecommendationParams {
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
            .clamp(1, MAX_RECOMMENDATION_LIMIT)
    }

    fn journey(&self) -> Option<Journey> {
        let stage = self.journey.as_deref()?.parse::<JourneyStage>().ok()?;
        let date = self.date.as_deref().and_then(parse_journey_date);
        Some(Journey::new(stage, date))
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub stage: Option<Stage>,
    pub items: Vec<ArticleView>,
}

/// `stage` picks a life stage directly; otherwise `journey` (+ `date`) is
/// mapped to one. Unknown values just mean no recommendations.
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendationParams>,
) -> Json<RecommendationResponse> {
    let language = params.lang.as_deref().map(Language::parse_or_default).unwrap_or_default();
    let limit = params.limit();

    let direct = params.stage.as_deref().and_then(|raw| raw.parse::<Stage>().ok());
    let (stage, articles) = match (direct, params.journey()) {
        (Some(stage), _) => (Some(stage), state.hub.for_stage(stage, language, limit).await),
        (None, Some(journey)) => {
            let stage = journey.target_stage(chrono::Utc::now().date_naive());
            (Some(stage), state.hub.recommendations(Some(&journey), language, limit).await)
        }
        (None, None) => (None, Vec::new()),
    };

    Json(RecommendationResponse {
        stage,
        items: articles.iter().map(|article| article.view(language)).collect(),
    })
}

pub async fn life_stages() -> Json<Value> {
    let stages: Vec<Value> = Stage::ALL
        .iter()
        .map(|stage| json!({ "value": stage.as_str(), "label": stage.label() }))
        .collect();
    Json(Value::Array(stages))
}

pub async fn perspectives() -> Json<Value> {
    let lenses: Vec<Value> = Lens::ALL
        .iter()
        .map(|lens| json!({ "value": lens.as_str(), "label": lens.label() }))
        .collect();
    Json(Value::Array(lenses))
}

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(form): Json<LeadSubmission>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let lead = Lead::try_from(form)?;
    state.storage.store_lead(&lead).await?;
    tracing::info!("📥 New clinic lead {} ({})", lead.id, lead.problem_type);
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "lead": lead }))))
}

pub async fn list_leads(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Lead>>> {
    Ok(Json(state.storage.list_leads().await?))
}

pub async fn create_story(
    State(state): State<Arc<AppState>>,
    Json(form): Json<StorySubmission>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let story = Story::try_from(form)?;
    state.storage.store_story(&story).await?;
    tracing::info!("📥 New story {}", story.id);
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "story": story }))))
}

pub async fn list_stories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Story>>> {
    Ok(Json(state.storage.list_stories().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_blogs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BlogParams>,
) -> ApiResult<Json<Vec<ScrapedPost>>> {
    let limit = params.limit.unwrap_or(DEFAULT_BLOG_LIMIT).clamp(1, MAX_BLOG_LIMIT);
    let offset = params.offset.unwrap_or(0);
    Ok(Json(state.storage.list_posts(limit, offset).await?))
}

pub async fn get_blog(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> ApiResult<Json<ScrapedPost>> {
    let post = state
        .storage
        .get_post(&slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("blog {}", slug)))?;
    Ok(Json(post))
}

pub async fn list_doctors(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Doctor>>> {
    Ok(Json(state.storage.list_doctors().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub max: Option<usize>,
}

pub async fn run_scraper(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(params): Query<ScrapeParams>,
) -> ApiResult<Json<ScrapeReport>> {
    let max = params.max.unwrap_or(DEFAULT_MAX_PAGES);
    let report = state.scrapers.scrape_source(&source, max).await?;
    Ok(Json(report))
}

pub async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> ApiResult<Response> {
    let (status, body) = state.chat.chat(request).await?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(body)).into_response())
}

pub async fn proxy(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
    let upstream = state
        .chat
        .forward(method.as_str(), &path, query.as_deref(), content_type, body.to_vec())
        .await?;

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, upstream.body).into_response();
    if let Some(value) = upstream.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}

pub async fn binding_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "status": BINDING_STATUS, "target": state.chat.target() }))
}
