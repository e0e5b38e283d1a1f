use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const DEFAULT_LEAD_PRIORITY: &str = "Medium";
pub const DEFAULT_LEAD_STATUS: &str = "new";

/// Body of the clinic lead form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadSubmission {
    pub name: String,
    pub phone: String,
    pub age: String,
    pub gender: String,
    pub problem_type: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub age: u32,
    pub gender: String,
    pub problem_type: String,
    pub source: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LeadSubmission> for Lead {
    type Error = Error;

    fn try_from(form: LeadSubmission) -> Result<Self> {
        let required = [
            ("name", &form.name),
            ("phone", &form.phone),
            ("age", &form.age),
            ("gender", &form.gender),
            ("problemType", &form.problem_type),
            ("source", &form.source),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!("missing fields: {}", missing.join(", "))));
        }

        let age = form
            .age
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Validation(format!("age must be a whole number, got {:?}", form.age)))?;

        Ok(Lead {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            phone: form.phone.trim().to_string(),
            age,
            gender: form.gender.trim().to_string(),
            problem_type: form.problem_type.trim().to_string(),
            source: form.source.trim().to_string(),
            priority: DEFAULT_LEAD_PRIORITY.to_string(),
            status: DEFAULT_LEAD_STATUS.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Body of the "share your story" form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorySubmission {
    pub name: String,
    pub anonymous: bool,
    pub city: String,
    pub age: String,
    pub relationship_status: String,
    pub challenge: String,
    pub selected_treatments: Vec<String>,
    pub journey_duration: String,
    pub selected_emotions: Vec<String>,
    pub emotional_experience: String,
    pub outcome: String,
    pub message_to_others: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    #[serde(flatten)]
    pub submission: StorySubmission,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StorySubmission> for Story {
    type Error = Error;

    fn try_from(mut form: StorySubmission) -> Result<Self> {
        if !form.anonymous && form.name.trim().is_empty() {
            return Err(Error::Validation("name is required unless the story is anonymous".into()));
        }
        let has_story = [&form.challenge, &form.emotional_experience, &form.message_to_others]
            .iter()
            .any(|text| !text.trim().is_empty());
        if !has_story {
            return Err(Error::Validation("a story needs some text to share".into()));
        }
        if form.anonymous {
            form.name.clear();
        }

        Ok(Story {
            id: Uuid::new_v4().to_string(),
            submission: form,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_form() -> LeadSubmission {
        LeadSubmission {
            name: "Priya".into(),
            phone: "+91 98765 43210".into(),
            age: "31".into(),
            gender: "Female".into(),
            problem_type: "PCOS/PCOD".into(),
            source: "Website".into(),
        }
    }

    #[test]
    fn test_lead_defaults() {
        let lead = Lead::try_from(lead_form()).unwrap();
        assert_eq!(lead.age, 31);
        assert_eq!(lead.priority, "Medium");
        assert_eq!(lead.status, "new");
        assert!(!lead.id.is_empty());
    }

    #[test]
    fn test_lead_requires_every_field() {
        let form = LeadSubmission {
            phone: " ".into(),
            source: String::new(),
            ..lead_form()
        };
        let err = Lead::try_from(form).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: missing fields: phone, source");
    }

    #[test]
    fn test_lead_age_must_be_numeric() {
        let form = LeadSubmission {
            age: "thirty".into(),
            ..lead_form()
        };
        assert!(matches!(Lead::try_from(form), Err(Error::Validation(_))));
    }

    #[test]
    fn test_lead_form_json_names() {
        let form: LeadSubmission = serde_json::from_str(
            r#"{"name": "A", "phone": "1", "age": "30", "gender": "Male", "problemType": "Male Factor", "source": "Other"}"#,
        )
        .unwrap();
        assert_eq!(form.problem_type, "Male Factor");
    }

    #[test]
    fn test_anonymous_story_drops_name() {
        let story = Story::try_from(StorySubmission {
            name: "Lakshmi".into(),
            anonymous: true,
            message_to_others: "Keep going.".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(story.submission.name.is_empty());
    }

    #[test]
    fn test_story_validation() {
        let unnamed = StorySubmission {
            challenge: "Two failed IUIs".into(),
            ..Default::default()
        };
        assert!(Story::try_from(unnamed).is_err());

        let empty = StorySubmission {
            name: "Kavya".into(),
            ..Default::default()
        };
        assert!(Story::try_from(empty).is_err());
    }
}
