pub mod cli;
pub mod client;
pub mod manager;
pub mod sanitize;
pub mod scrapers;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use client::HtmlClient;
pub use manager::{ScrapeReport, ScrapeResult, ScraperManager};
pub use scrapers::{Scraped, Scraper};

pub mod prelude {
    pub use super::scrapers::{Scraped, Scraper};
    pub use sethu_core::{Error, Result};
}
