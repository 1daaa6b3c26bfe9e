use watchfeed_common::{JobPosting, JobPreferences, WorkLocationType};

use crate::traits::{JobMatcher, MatchResult};

/// Weight of each preference criterion. Only criteria the user actually set
/// count toward the denominator.
const KEYWORD_WEIGHT: f64 = 60.0;
const LOCATION_WEIGHT: f64 = 25.0;
const WORK_TYPE_WEIGHT: f64 = 15.0;

/// Plain substring matcher used when no taxonomy engine is plugged in.
///
/// Keywords are scored by the fraction found in the title; location and work
/// arrangement are all-or-nothing. No preferences at all scores 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

impl JobMatcher for KeywordMatcher {
    fn score(&self, job: &JobPosting, preferences: &JobPreferences) -> MatchResult {
        if preferences.is_empty() {
            return MatchResult {
                score: 100,
                reasons: vec!["No preferences set".to_string()],
            };
        }

        let mut earned = 0.0;
        let mut possible = 0.0;
        let mut reasons = Vec::new();

        let title = job.title.to_lowercase();
        let location = job.location.as_deref().unwrap_or_default().to_lowercase();

        if !preferences.keywords.is_empty() {
            possible += KEYWORD_WEIGHT;
            let hits: Vec<&str> = preferences
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
                .collect();
            if !hits.is_empty() {
                earned += KEYWORD_WEIGHT * hits.len() as f64 / preferences.keywords.len() as f64;
                reasons.push(format!("Title matches: {}", hits.join(", ")));
            }
        }

        if !preferences.locations.is_empty() {
            possible += LOCATION_WEIGHT;
            if let Some(hit) = preferences
                .locations
                .iter()
                .find(|l| !l.trim().is_empty() && location.contains(&l.trim().to_lowercase()))
            {
                earned += LOCATION_WEIGHT;
                reasons.push(format!("Location: {hit}"));
            }
        }

        if !preferences.work_location_types.is_empty() {
            possible += WORK_TYPE_WEIGHT;
            let inferred = WorkLocationType::infer(&location).or_else(|| WorkLocationType::infer(&title));
            if let Some(kind) = inferred.filter(|k| preferences.work_location_types.contains(k)) {
                earned += WORK_TYPE_WEIGHT;
                reasons.push(format!("Work type: {kind}"));
            }
        }

        let score = (earned / possible * 100.0).round().clamp(0.0, 100.0) as u8;
        MatchResult { score, reasons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, location: Option<&str>) -> JobPosting {
        JobPosting {
            id: "j".into(),
            title: title.into(),
            posted_at: None,
            location: location.map(String::from),
            url: "https://jobs.example.com/j".into(),
        }
    }

    fn keywords(words: &[&str]) -> JobPreferences {
        JobPreferences {
            keywords: words.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn all_keywords_in_title_scores_full() {
        let result = KeywordMatcher.score(&job("Senior Software Engineer", None), &keywords(&["senior", "engineer"]));
        assert_eq!(result.score, 100);
        assert_eq!(result.reasons, vec!["Title matches: senior, engineer".to_string()]);
    }

    #[test]
    fn no_keyword_hit_scores_zero() {
        let result = KeywordMatcher.score(&job("Junior Developer", None), &keywords(&["senior", "engineer"]));
        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn half_the_keywords_reaches_the_cutoff() {
        let result = KeywordMatcher.score(&job("Staff Engineer", None), &keywords(&["senior", "engineer"]));
        assert_eq!(result.score, 50);
    }

    #[test]
    fn empty_preferences_match_everything() {
        let result = KeywordMatcher.score(&job("Anything", None), &JobPreferences::default());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn location_and_work_type_contribute() {
        let prefs = JobPreferences {
            keywords: vec!["rust".into()],
            locations: vec!["Berlin".into()],
            work_location_types: vec![WorkLocationType::Remote],
        };
        let result = KeywordMatcher.score(&job("Backend Engineer", Some("Berlin, Germany (Remote)")), &prefs);
        // 25 + 15 of 100
        assert_eq!(result.score, 40);
        assert_eq!(result.reasons.len(), 2);
    }
}
