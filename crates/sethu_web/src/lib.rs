use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{any, get, post},
    Router,
};
use sethu_core::Result;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod handlers;
pub mod hub;
pub mod proxy;
pub mod state;

pub use error::ApiError;
pub use hub::KnowledgeHub;
pub use proxy::ChatProxy;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/knowledge/articles", get(handlers::list_articles))
        .route("/api/knowledge/articles/:slug", get(handlers::get_article))
        .route("/api/knowledge/articles/:slug/related", get(handlers::related_articles))
        .route("/api/knowledge/recommendations", get(handlers::recommendations))
        .route("/api/knowledge/life-stages", get(handlers::life_stages))
        .route("/api/knowledge/perspectives", get(handlers::perspectives))
        .route("/api/clinic-leads", post(handlers::create_lead).get(handlers::list_leads))
        .route("/api/stories", post(handlers::create_story).get(handlers::list_stories))
        .route("/api/blogs", get(handlers::list_blogs))
        .route("/api/blogs/:slug", get(handlers::get_blog))
        .route("/api/doctors", get(handlers::list_doctors))
        .route("/api/scrape/:source", post(handlers::run_scraper))
        .route("/sakhi/chat", post(handlers::chat))
        .route("/api/proxy/*path", any(handlers::proxy))
        .route("/health", get(handlers::binding_health))
        .layer(middleware::from_fn(log_latency))
        .layer(cors)
        .with_state(Arc::new(state))
}

async fn log_latency(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        "⏱️  LATENCY: {}ms | {} {} -> {}",
        start.elapsed().as_millis(),
        method,
        uri,
        response.status().as_u16()
    );
    response
}

pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("🚀 JanmaSethu gateway listening on {}", bind_addr);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use sethu_core::{Article, Error, Result};
}
