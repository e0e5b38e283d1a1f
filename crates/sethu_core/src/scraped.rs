use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of upserting a scraped record, decided by its content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    New,
    Updated,
    Unchanged,
}

impl ScrapeStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            ScrapeStatus::New => "🆕",
            ScrapeStatus::Updated => "📝",
            ScrapeStatus::Unchanged => "⏭️",
        }
    }

    pub fn from_hashes(previous: Option<&str>, current: &str) -> Self {
        match previous {
            None => ScrapeStatus::New,
            Some(previous) if previous == current => ScrapeStatus::Unchanged,
            Some(_) => ScrapeStatus::Updated,
        }
    }
}

/// A blog post lifted from a partner clinic's site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub source_site: String,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content_html: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub content_hash: String,
    pub scraped_at: DateTime<Utc>,
}

/// A doctor profile lifted from a partner clinic's site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub source_site: String,
    pub slug: String,
    pub name: String,
    pub designation: Option<String>,
    pub specialties: Vec<String>,
    pub qualifications: Option<String>,
    pub experience_years: Option<u32>,
    pub languages: Vec<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub profile_url: String,
    pub about_html: Option<String>,
    pub content_hash: String,
    pub scraped_at: DateTime<Utc>,
}
