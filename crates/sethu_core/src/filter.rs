//! Search, lens and life-stage filtering over an article collection.
//!
//! Filtering is a stable retain: the output keeps the input order and never
//! re-ranks. A dimension that is not set passes every article through.

use serde::{Deserialize, Serialize};

use crate::types::{Article, Language, Lens, Stage};

/// One search request against the knowledge hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pub search: String,
    pub lens: Option<Lens>,
    pub stage: Option<Stage>,
    pub language: Language,
    pub page: usize,
}

impl Query {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_lens(mut self, lens: Option<Lens>) -> Self {
        self.lens = lens;
        self
    }

    pub fn with_stage(mut self, stage: Option<Stage>) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// True when the filter dimensions (not the page) differ, meaning the
    /// caller has to restart pagination from page 1.
    pub fn filters_changed(&self, other: &Query) -> bool {
        self.search != other.search
            || self.lens != other.lens
            || self.stage != other.stage
            || self.language != other.language
    }

    /// Carries the page over from `previous` unless the filters moved.
    pub fn continue_from(mut self, previous: &Query) -> Self {
        if self.filters_changed(previous) {
            self.page = 1;
        }
        self
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.matches_search(article) && self.matches_lens(article) && self.matches_stage(article)
    }

    fn matches_search(&self, article: &Article) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        article.title.get(self.language).to_lowercase().contains(&needle)
            || article.summary.get(self.language).to_lowercase().contains(&needle)
    }

    fn matches_lens(&self, article: &Article) -> bool {
        self.lens.map_or(true, |lens| article.lens.contains(&lens))
    }

    fn matches_stage(&self, article: &Article) -> bool {
        self.stage.map_or(true, |stage| article.stage.contains(&stage))
    }
}

/// Raw query-string parameters of the listing page.
///
/// Parsing is permissive: unknown lens or stage values mean "all", an
/// unparseable page means page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub search: Option<String>,
    pub lens: Option<String>,
    pub stage: Option<String>,
    pub lang: Option<String>,
    pub page: Option<String>,
}

impl From<QueryParams> for Query {
    fn from(params: QueryParams) -> Self {
        let lens = params
            .lens
            .as_deref()
            .filter(|raw| !raw.eq_ignore_ascii_case("all"))
            .and_then(|raw| raw.parse().ok());
        let stage = params
            .stage
            .as_deref()
            .filter(|raw| !raw.eq_ignore_ascii_case("all"))
            .and_then(|raw| raw.parse().ok());
        let page = params
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(1);

        Query::new()
            .with_search(params.search.unwrap_or_default().trim())
            .with_lens(lens)
            .with_stage(stage)
            .with_language(params.lang.as_deref().map(Language::parse_or_default).unwrap_or_default())
            .with_page(page)
    }
}

/// Keeps the articles that satisfy every rule of `query`, in input order.
pub fn filter_articles(articles: &[Article], query: &Query) -> Vec<Article> {
    articles
        .iter()
        .filter(|article| query.matches(article))
        .cloned()
        .collect()
}
