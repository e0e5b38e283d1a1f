use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::types::Stage;
use crate::{Error, Result};

/// Key under which a user's journey is persisted.
pub const JOURNEY_STORAGE_KEY: &str = "janmasethu_journey";

/// A PARENT journey counts as newborn until the child is this many days old.
pub const NEWBORN_WINDOW_DAYS: i64 = 90;

/// Where the user says they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStage {
    Ttc,
    Pregnant,
    Parent,
}

impl JourneyStage {
    pub fn label(&self) -> &'static str {
        match self {
            JourneyStage::Ttc => "Trying to Conceive",
            JourneyStage::Pregnant => "Pregnant",
            JourneyStage::Parent => "Parent",
        }
    }
}

impl FromStr for JourneyStage {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TTC" => Ok(JourneyStage::Ttc),
            "PREGNANT" => Ok(JourneyStage::Pregnant),
            "PARENT" => Ok(JourneyStage::Parent),
            other => Err(Error::Validation(format!("unknown journey stage: {}", other))),
        }
    }
}

impl fmt::Display for JourneyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JourneyStage::Ttc => "TTC",
            JourneyStage::Pregnant => "PREGNANT",
            JourneyStage::Parent => "PARENT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub stage: JourneyStage,
    /// Cycle start for TTC, LMP for PREGNANT, date of birth for PARENT.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_date",
        deserialize_with = "deserialize_date"
    )]
    pub date: Option<NaiveDate>,
    /// Milliseconds since the epoch.
    #[serde(rename = "lastUpdated")]
    pub last_updated: i64,
}

impl Journey {
    pub fn new(stage: JourneyStage, date: Option<NaiveDate>) -> Self {
        Self {
            stage,
            date,
            last_updated: Utc::now().timestamp_millis(),
        }
    }

    /// The life-stage category recommendations are drawn from.
    pub fn target_stage(&self, today: NaiveDate) -> Stage {
        match self.stage {
            JourneyStage::Ttc => Stage::Ttc,
            JourneyStage::Pregnant => Stage::Pregnancy,
            JourneyStage::Parent => match self.date {
                Some(born) if (today - born).num_days() >= NEWBORN_WINDOW_DAYS => Stage::EarlyYears,
                _ => Stage::Newborn,
            },
        }
    }

    /// How the backend should interpret `date`.
    pub fn date_type(&self) -> &'static str {
        match self.stage {
            JourneyStage::Ttc => "CYCLE_START",
            JourneyStage::Pregnant => "LMP",
            JourneyStage::Parent => "BIRTH_DATE",
        }
    }
}

/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp.
pub fn parse_journey_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc).date_naive()))
}

fn serialize_date<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_journey_date(text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid journey date: {}", text))),
    }
}

/// Persistence for the single current journey.
#[async_trait]
pub trait JourneyRepository: Send + Sync {
    async fn load(&self) -> Result<Option<Journey>>;
    async fn save(&self, journey: &Journey) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}
