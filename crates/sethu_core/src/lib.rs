pub mod config;
pub mod error;
pub mod filter;
pub mod journey;
pub mod lead;
pub mod loader;
pub mod logging;
pub mod pagination;
pub mod recommend;
pub mod scraped;
pub mod source;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::{filter_articles, Query, QueryParams};
pub use journey::{Journey, JourneyRepository, JourneyStage};
pub use lead::{Lead, LeadSubmission, Story, StorySubmission};
pub use loader::{ContentLoader, LoadState};
pub use pagination::{paginate, Page, Pagination};
pub use recommend::{recommend, related};
pub use scraped::{Doctor, ScrapeStatus, ScrapedPost};
pub use source::{ContentSource, Listing};
pub use storage::SiteStorage;
pub use types::{Article, ArticleView, Language, Lens, LocalizedText, Stage};

pub mod prelude {
    pub use crate::{Article, ContentSource, Error, Language, Lens, Query, Result, SiteStorage, Stage};
}
