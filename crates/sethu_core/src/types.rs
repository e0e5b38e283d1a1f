use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub const DEFAULT_READ_TIME_MINUTES: u32 = 5;

/// Content locale. Independent of whatever language the UI chrome is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Te,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Te];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
        }
    }

    /// Lenient parse used for query strings: anything unknown is English.
    pub fn parse_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "hi" => Ok(Language::Hi),
            "te" => Ok(Language::Te),
            other => Err(Error::Validation(format!("unknown language: {}", other))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Perspective an article is written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lens {
    Medical,
    Social,
    Financial,
    Nutrition,
}

impl Lens {
    pub const ALL: [Lens; 4] = [Lens::Medical, Lens::Social, Lens::Financial, Lens::Nutrition];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lens::Medical => "medical",
            Lens::Social => "social",
            Lens::Financial => "financial",
            Lens::Nutrition => "nutrition",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lens::Medical => "Medical",
            Lens::Social => "Social & Emotional",
            Lens::Financial => "Financial",
            Lens::Nutrition => "Nutrition & Lifestyle",
        }
    }
}

impl FromStr for Lens {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medical" => Ok(Lens::Medical),
            "social" => Ok(Lens::Social),
            "financial" => Ok(Lens::Financial),
            "nutrition" => Ok(Lens::Nutrition),
            other => Err(Error::Validation(format!("unknown lens: {}", other))),
        }
    }
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Life stage an article applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Ttc,
    Pregnancy,
    Postpartum,
    Newborn,
    EarlyYears,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Ttc,
        Stage::Pregnancy,
        Stage::Postpartum,
        Stage::Newborn,
        Stage::EarlyYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ttc => "ttc",
            Stage::Pregnancy => "pregnancy",
            Stage::Postpartum => "postpartum",
            Stage::Newborn => "newborn",
            Stage::EarlyYears => "early-years",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Ttc => "Trying to Conceive",
            Stage::Pregnancy => "Pregnancy",
            Stage::Postpartum => "Postpartum",
            Stage::Newborn => "Newborn",
            Stage::EarlyYears => "Early Years",
        }
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ttc" => Ok(Stage::Ttc),
            "pregnancy" => Ok(Stage::Pregnancy),
            "postpartum" => Ok(Stage::Postpartum),
            "newborn" => Ok(Stage::Newborn),
            "early-years" => Ok(Stage::EarlyYears),
            other => Err(Error::Validation(format!("unknown life stage: {}", other))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses raw tag strings into a tag set, dropping anything unrecognised.
pub fn parse_tags<T, I, S>(raw: I) -> BTreeSet<T>
where
    T: FromStr + Ord,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|tag| match tag.as_ref().parse::<T>() {
            Ok(tag) => Some(tag),
            Err(_) => {
                tracing::warn!("Dropping unrecognised tag {:?}", tag.as_ref());
                None
            }
        })
        .collect()
}

/// Per-language text. Unknown language keys are ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct LocalizedText(BTreeMap<Language, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn en(text: impl Into<String>) -> Self {
        Self::new().with(Language::En, text)
    }

    pub fn with(mut self, language: Language, text: impl Into<String>) -> Self {
        self.0.insert(language, text.into());
        self
    }

    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        self.0.insert(language, text.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|text| text.trim().is_empty())
    }

    /// Text for `language`, falling back to English, then to any language that has text.
    pub fn get(&self, language: Language) -> &str {
        let non_empty = |lang: &Language| self.0.get(lang).filter(|text| !text.trim().is_empty());

        non_empty(&language)
            .or_else(|| non_empty(&Language::En))
            .or_else(|| self.0.values().find(|text| !text.trim().is_empty()))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl From<BTreeMap<String, String>> for LocalizedText {
    fn from(raw: BTreeMap<String, String>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(code, text)| code.parse::<Language>().ok().map(|lang| (lang, text)))
                .collect(),
        )
    }
}

impl From<LocalizedText> for BTreeMap<String, String> {
    fn from(text: LocalizedText) -> Self {
        text.0
            .into_iter()
            .map(|(lang, text)| (lang.code().to_string(), text))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Subheading,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LocalizedText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: LocalizedText,
    pub summary: LocalizedText,
    #[serde(default)]
    pub lens: BTreeSet<Lens>,
    #[serde(default)]
    pub stage: BTreeSet<Stage>,
    #[serde(default = "default_read_time")]
    pub read_time_minutes: u32,
    #[serde(default)]
    pub reviewer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub sections: Vec<ArticleSection>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

fn default_read_time() -> u32 {
    DEFAULT_READ_TIME_MINUTES
}

impl Article {
    pub fn new(slug: impl Into<String>, title: LocalizedText, summary: LocalizedText) -> Self {
        Self {
            slug: slug.into(),
            title,
            summary,
            lens: BTreeSet::new(),
            stage: BTreeSet::new(),
            read_time_minutes: DEFAULT_READ_TIME_MINUTES,
            reviewer: String::new(),
            sources: Vec::new(),
            sections: Vec::new(),
            published_at: None,
        }
    }

    pub fn with_lens(mut self, lens: impl IntoIterator<Item = Lens>) -> Self {
        self.lens.extend(lens);
        self
    }

    pub fn with_stage(mut self, stage: impl IntoIterator<Item = Stage>) -> Self {
        self.stage.extend(stage);
        self
    }

    pub fn view(&self, language: Language) -> ArticleView {
        ArticleView {
            slug: self.slug.clone(),
            title: self.title.get(language).to_string(),
            summary: self.summary.get(language).to_string(),
            lens: self.lens.iter().copied().collect(),
            stage: self.stage.iter().copied().collect(),
            read_time_minutes: self.read_time_minutes,
            reviewer: self.reviewer.clone(),
        }
    }

    pub fn detail(&self, language: Language) -> ArticleDetail {
        ArticleDetail {
            article: self.view(language),
            sources: self.sources.clone(),
            sections: self
                .sections
                .iter()
                .map(|section| SectionView {
                    id: section.id.clone(),
                    title: section.title.get(language).to_string(),
                    content: section
                        .content
                        .iter()
                        .map(|block| BlockView {
                            kind: block.kind,
                            text: block.text.as_ref().map(|t| t.get(language).to_string()),
                            items: block.items.iter().map(|i| i.get(language).to_string()).collect(),
                        })
                        .collect(),
                })
                .collect(),
            published_at: self.published_at,
        }
    }
}

/// Reads the leading whole number out of strings like "6 min read".
pub fn parse_read_time(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(minutes) if minutes > 0 => minutes,
        _ => DEFAULT_READ_TIME_MINUTES,
    }
}

/// Card-sized, single-language projection of an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub lens: Vec<Lens>,
    pub stage: Vec<Stage>,
    pub read_time_minutes: u32,
    pub reviewer: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: ArticleView,
    pub sources: Vec<String>,
    pub sections: Vec<SectionView>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub content: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localized_fallback() {
        let text = LocalizedText::en("IVF Basics").with(Language::Hi, "IVF की मूल बातें");
        assert_eq!(text.get(Language::Hi), "IVF की मूल बातें");
        assert_eq!(text.get(Language::Te), "IVF Basics");

        let only_telugu = LocalizedText::new().with(Language::Te, "ఫస్ట్ ట్రైమెస్టర్ స్కాన్");
        assert_eq!(only_telugu.get(Language::En), "ఫస్ట్ ట్రైమెస్టర్ స్కాన్");

        let blank_te = LocalizedText::en("Partner playbook").with(Language::Te, "  ");
        assert_eq!(blank_te.get(Language::Te), "Partner playbook");
    }

    #[test]
    fn test_localized_ignores_unknown_languages() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"en": "Cost planning 101", "ta": "செலவு"}"#).unwrap();
        assert_eq!(text.get(Language::En), "Cost planning 101");
        let back = serde_json::to_value(&text).unwrap();
        assert_eq!(back, serde_json::json!({"en": "Cost planning 101"}));
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!("Early-Years".parse::<Stage>().unwrap(), Stage::EarlyYears);
        assert_eq!("early_years".parse::<Stage>().unwrap(), Stage::EarlyYears);
        assert_eq!(" NUTRITION ".parse::<Lens>().unwrap(), Lens::Nutrition);
        assert!("spiritual".parse::<Lens>().is_err());

        let lens: BTreeSet<Lens> = parse_tags(["medical", "medical", "astrology", "social"]);
        assert_eq!(lens.into_iter().collect::<Vec<_>>(), vec![Lens::Medical, Lens::Social]);
    }

    #[test]
    fn test_tag_serialization() {
        assert_eq!(serde_json::to_string(&Stage::EarlyYears).unwrap(), "\"early-years\"");
        assert_eq!(serde_json::to_string(&Lens::Financial).unwrap(), "\"financial\"");
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse_or_default("TE"), Language::Te);
        assert_eq!(Language::parse_or_default("fr"), Language::En);
    }

    #[test]
    fn test_parse_read_time() {
        assert_eq!(parse_read_time("6 min read"), 6);
        assert_eq!(parse_read_time("12"), 12);
        assert_eq!(parse_read_time("about 4 minutes"), 5);
        assert_eq!(parse_read_time("0 min"), 5);
        assert_eq!(parse_read_time(""), 5);
    }

    #[test]
    fn test_article_defaults_on_load() {
        let article: Article = serde_json::from_str(
            r#"{"slug": "a", "title": {"en": "A"}, "summary": {"en": "S"}}"#,
        )
        .unwrap();
        assert_eq!(article.read_time_minutes, DEFAULT_READ_TIME_MINUTES);
        assert!(article.lens.is_empty());
        assert!(article.stage.is_empty());
    }

    #[test]
    fn test_view_is_localized() {
        let article = Article::new(
            "ivf-10-min",
            LocalizedText::en("IVF in 10 Minutes").with(Language::Te, "10 నిమిషాల్లో IVF"),
            LocalizedText::en("Overview from testing to transfer."),
        )
        .with_lens([Lens::Medical, Lens::Financial])
        .with_stage([Stage::Ttc]);

        let view = article.view(Language::Te);
        assert_eq!(view.title, "10 నిమిషాల్లో IVF");
        assert_eq!(view.summary, "Overview from testing to transfer.");
        assert_eq!(view.lens, vec![Lens::Medical, Lens::Financial]);
    }
}
