use chrono::NaiveDate;

use crate::filter::{filter_articles, Query};
use crate::journey::Journey;
use crate::types::{Article, Language};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;
pub const MAX_RECOMMENDATION_LIMIT: usize = 7;
pub const RELATED_LIMIT: usize = 3;

/// The query a journey turns into: its target stage and nothing else.
pub fn recommendation_query(journey: &Journey, language: Language, today: NaiveDate) -> Query {
    Query::new()
        .with_stage(Some(journey.target_stage(today)))
        .with_language(language)
}

/// Up to `limit` articles for the journey's stage, in catalogue order.
/// No journey means no recommendations.
pub fn recommend(
    articles: &[Article],
    journey: Option<&Journey>,
    language: Language,
    limit: usize,
    today: NaiveDate,
) -> Vec<Article> {
    let Some(journey) = journey else {
        return Vec::new();
    };
    let query = recommendation_query(journey, language, today);
    let mut matches = filter_articles(articles, &query);
    matches.truncate(limit);
    matches
}

/// Articles sharing at least one lens with `article`, excluding itself.
pub fn related(article: &Article, articles: &[Article], limit: usize) -> Vec<Article> {
    articles
        .iter()
        .filter(|other| other.slug != article.slug)
        .filter(|other| other.lens.iter().any(|lens| article.lens.contains(lens)))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyStage;
    use crate::types::{Lens, LocalizedText, Stage};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn catalogue() -> Vec<Article> {
        let article = |slug: &str, lens: Lens, stage: Stage| {
            Article::new(slug, LocalizedText::en(slug), LocalizedText::en(""))
                .with_lens([lens])
                .with_stage([stage])
        };
        vec![
            article("ivf-10-min", Lens::Medical, Stage::Ttc),
            article("newborn-vaccines", Lens::Medical, Stage::Newborn),
            article("iycf-6-months", Lens::Nutrition, Stage::EarlyYears),
            article("cost-planning-101", Lens::Financial, Stage::Ttc),
            article("when-to-see-specialist", Lens::Medical, Stage::Ttc),
            article("embryo-grading-basics", Lens::Medical, Stage::Ttc),
        ]
    }

    fn slugs(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.slug.as_str()).collect()
    }

    #[test]
    fn test_no_journey_no_recommendations() {
        assert!(recommend(&catalogue(), None, Language::En, 3, today()).is_empty());
    }

    #[test]
    fn test_ttc_recommendations_are_truncated() {
        let journey = Journey::new(JourneyStage::Ttc, None);
        let picks = recommend(&catalogue(), Some(&journey), Language::En, 3, today());
        assert_eq!(
            slugs(&picks),
            vec!["ivf-10-min", "cost-planning-101", "when-to-see-specialist"]
        );
    }

    #[test]
    fn test_parent_recommendations_follow_child_age() {
        let infant = Journey::new(JourneyStage::Parent, Some(today() - Duration::days(10)));
        let picks = recommend(&catalogue(), Some(&infant), Language::En, 5, today());
        assert_eq!(slugs(&picks), vec!["newborn-vaccines"]);

        let toddler = Journey::new(JourneyStage::Parent, Some(today() - Duration::days(200)));
        let picks = recommend(&catalogue(), Some(&toddler), Language::En, 5, today());
        assert_eq!(slugs(&picks), vec!["iycf-6-months"]);
    }

    #[test]
    fn test_related_shares_a_lens() {
        let articles = catalogue();
        let related = related(&articles[0], &articles, RELATED_LIMIT);
        assert_eq!(
            slugs(&related),
            vec!["newborn-vaccines", "when-to-see-specialist", "embryo-grading-basics"]
        );
    }
}
