//! The static article catalogue keyed by slug.
//!
//! This is where lens and life-stage tags live. Both the static bundle and
//! the remote API lean on it when they lack tags of their own.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use sethu_core::types::{parse_read_time, parse_tags, DEFAULT_READ_TIME_MINUTES};
use sethu_core::{Article, Lens, LocalizedText, Result, Stage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    slug: String,
    #[serde(default)]
    title: LocalizedText,
    #[serde(default)]
    summary: LocalizedText,
    #[serde(default)]
    lens: Vec<String>,
    #[serde(default)]
    stage: Vec<String>,
    #[serde(default)]
    read_mins: Option<Value>,
    #[serde(default)]
    reviewed_by: String,
    #[serde(default)]
    sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub slug: String,
    pub title: LocalizedText,
    pub summary: LocalizedText,
    pub lens: BTreeSet<Lens>,
    pub stage: BTreeSet<Stage>,
    pub read_time_minutes: u32,
    pub reviewer: String,
    pub sources: Vec<String>,
}

impl MetadataEntry {
    pub fn to_article(&self) -> Article {
        let mut article = Article::new(self.slug.clone(), self.title.clone(), self.summary.clone())
            .with_lens(self.lens.iter().copied())
            .with_stage(self.stage.iter().copied());
        article.read_time_minutes = self.read_time_minutes;
        article.reviewer = self.reviewer.clone();
        article.sources = self.sources.clone();
        article
    }
}

impl From<RawEntry> for MetadataEntry {
    fn from(raw: RawEntry) -> Self {
        let read_time_minutes = match raw.read_mins {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|m| u32::try_from(m).ok())
                .filter(|&m| m > 0)
                .unwrap_or(DEFAULT_READ_TIME_MINUTES),
            Some(Value::String(s)) => parse_read_time(&s),
            _ => DEFAULT_READ_TIME_MINUTES,
        };
        Self {
            lens: parse_tags(&raw.lens),
            stage: parse_tags(&raw.stage),
            slug: raw.slug,
            title: raw.title,
            summary: raw.summary,
            read_time_minutes,
            reviewer: raw.reviewed_by,
            sources: raw.sources,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: Vec<MetadataEntry>,
    by_slug: HashMap<String, usize>,
}

impl MetadataTable {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            match table.by_slug.get(&entry.slug) {
                Some(&i) => {
                    tracing::warn!("Duplicate metadata entry for {}, keeping the last one", entry.slug);
                    table.entries[i] = entry;
                }
                None => {
                    table.by_slug.insert(entry.slug.clone(), table.entries.len());
                    table.entries.push(entry);
                }
            }
        }
        table
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        Ok(Self::new(raw.into_iter().map(MetadataEntry::from).collect()))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let table = Self::from_json(&json)?;
        tracing::debug!("Loaded {} metadata entries from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn get(&self, slug: &str) -> Option<&MetadataEntry> {
        self.by_slug.get(slug).map(|&i| &self.entries[i])
    }

    pub fn lens(&self, slug: &str) -> BTreeSet<Lens> {
        self.get(slug).map(|e| e.lens.clone()).unwrap_or_default()
    }

    pub fn stage(&self, slug: &str) -> BTreeSet<Stage> {
        self.get(slug).map(|e| e.stage.clone()).unwrap_or_default()
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
