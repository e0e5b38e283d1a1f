use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sethu_core::pagination::paginate;
use sethu_core::types::{parse_read_time, ArticleSection};
use sethu_core::{filter_articles, Article, ContentSource, Language, Listing, LocalizedText, Query, Result};

use super::metadata::MetadataTable;

pub const STATIC_SOURCE_NAME: &str = "static";

/// One file of the per-article JSON bundle.
#[derive(Debug, Deserialize)]
pub struct BundleArticle {
    pub slug: String,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub overview: LocalizedText,
    #[serde(default)]
    pub metadata: BundleMetadata,
    #[serde(default)]
    pub sections: Vec<ArticleSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleMetadata {
    pub read_time: LocalizedText,
    pub reviewer: LocalizedText,
    pub sources: Vec<String>,
}

/// Bundled articles, filtered and paginated in process.
pub struct StaticSource {
    articles: Vec<Article>,
    metadata: Arc<MetadataTable>,
}

impl StaticSource {
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self {
            articles,
            metadata: Arc::new(MetadataTable::default()),
        }
    }

    /// Merges the metadata catalogue with bundle files. Bundles override
    /// text, reviewer, sources and sections; tags always come from the table.
    pub fn new(metadata: Arc<MetadataTable>, bundles: Vec<BundleArticle>) -> Self {
        let mut articles: Vec<Article> = metadata.entries().iter().map(|e| e.to_article()).collect();

        for bundle in bundles {
            let index = match articles.iter().position(|a| a.slug == bundle.slug) {
                Some(i) => i,
                None => {
                    let article = Article::new(bundle.slug.clone(), LocalizedText::new(), LocalizedText::new())
                        .with_lens(metadata.lens(&bundle.slug))
                        .with_stage(metadata.stage(&bundle.slug));
                    articles.push(article);
                    articles.len() - 1
                }
            };
            merge_bundle(&mut articles[index], bundle);
        }

        Self { articles, metadata }
    }

    /// Loads `metadata_path` plus every `*.json` under `bundle_dir`.
    /// A missing bundle directory just means no bundle.
    pub async fn load(metadata_path: &Path, bundle_dir: &Path) -> Result<Self> {
        let metadata = Arc::new(MetadataTable::load(metadata_path).await?);
        let bundles = load_bundles(bundle_dir).await?;
        let source = Self::new(metadata, bundles);
        tracing::info!(
            "📚 Static catalogue ready: {} articles ({} metadata entries)",
            source.articles.len(),
            source.metadata.len()
        );
        Ok(source)
    }

    pub fn metadata(&self) -> Arc<MetadataTable> {
        self.metadata.clone()
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }
}

fn merge_bundle(article: &mut Article, bundle: BundleArticle) {
    if !bundle.title.is_empty() {
        article.title = bundle.title;
    }
    if !bundle.overview.is_empty() {
        article.summary = bundle.overview;
    }
    if !bundle.metadata.read_time.is_empty() {
        article.read_time_minutes = parse_read_time(bundle.metadata.read_time.get(Language::En));
    }
    let reviewer = bundle.metadata.reviewer.get(Language::En);
    if !reviewer.is_empty() {
        article.reviewer = reviewer.to_string();
    }
    if !bundle.metadata.sources.is_empty() {
        article.sources = bundle.metadata.sources;
    }
    if !bundle.sections.is_empty() {
        article.sections = bundle.sections;
    }
}

async fn load_bundles(dir: &Path) -> Result<Vec<BundleArticle>> {
    if !tokio::fs::try_exists(dir).await? {
        tracing::warn!("No article bundle at {}", dir.display());
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut bundles = Vec::with_capacity(paths.len());
    for path in paths {
        let json = tokio::fs::read_to_string(&path).await?;
        match serde_json::from_str::<BundleArticle>(&json) {
            Ok(bundle) => bundles.push(bundle),
            Err(e) => tracing::warn!("Skipping malformed bundle file {}: {}", path.display(), e),
        }
    }
    Ok(bundles)
}

#[async_trait]
impl ContentSource for StaticSource {
    fn name(&self) -> &str {
        STATIC_SOURCE_NAME
    }

    async fn list_articles(&self, query: &Query, page_size: usize) -> Result<Listing> {
        let matches = filter_articles(&self.articles, query);
        Ok(Listing {
            source: STATIC_SOURCE_NAME.to_string(),
            page: paginate(&matches, query.page, page_size),
        })
    }

    async fn get_article(&self, slug: &str) -> Result<Option<Article>> {
        Ok(self.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn all_articles(&self) -> Result<Vec<Article>> {
        Ok(self.articles.clone())
    }
}
