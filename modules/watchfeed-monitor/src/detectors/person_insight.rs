use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use watchfeed_common::{
    CurrentRole, FeedItem, FeedPayload, InsightKind, MonitorConfig, MonitoredCompany,
    MonitoredPerson, PersonInsightPayload, PersonProfile, PersonSnapshot,
};
use watchfeed_store::find_by_name;

use super::truncate_text;

/// Phrases in an activity preview that suggest the person is hiring.
pub const HIRING_KEYWORDS: &[&str] = &[
    "hiring",
    "we're hiring",
    "join our team",
    "open role",
    "open position",
    "job opening",
    "recruiting",
    "looking to hire",
];

const SENIOR_ROLE_PATTERN: &str = r"(?i)\b(senior|lead|manager|director|head|vp|chief)\b";

/// Compares a watched person's profile with the last snapshot and emits at
/// most one insight per call.
///
/// A role change takes priority over activity. When the employer changed the
/// item needs a target company or a senior title; a title change at the same
/// employer needs both. With no usable prior role, or nothing changed, recent
/// activity is scanned for hiring posts instead.
pub struct PersonInsightDetector {
    senior_role: Regex,
    config: MonitorConfig,
}

impl PersonInsightDetector {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        Ok(Self {
            senior_role: Regex::new(SENIOR_ROLE_PATTERN)?,
            config,
        })
    }

    pub fn is_senior_role(&self, title: &str) -> bool {
        self.senior_role.is_match(title)
    }

    pub fn detect(
        &self,
        person: &MonitoredPerson,
        profile: &PersonProfile,
        prior: Option<&PersonSnapshot>,
        companies: &[MonitoredCompany],
        now: DateTime<Utc>,
    ) -> Option<FeedItem> {
        let prior_role = prior.and_then(|s| s.profile.current_role.as_ref());

        let (Some(before), Some(after)) = (prior_role, profile.current_role.as_ref()) else {
            return self.scan_activity(person, profile, companies, now);
        };

        let is_target_company = find_by_name(companies, &after.company).is_some();
        let is_senior_role = self.is_senior_role(&after.title);

        if !same_text(&before.company, &after.company) {
            if !(is_target_company || is_senior_role) {
                debug!(person_id = person.id.as_str(), "Job change not notable");
                return None;
            }
            let text = format!("{} started a new role: {}", person_name(person, profile), describe(after));
            return Some(self.insight(
                person,
                profile,
                InsightKind::JobChange,
                text,
                None,
                (is_target_company, is_senior_role),
                now,
            ));
        }

        if !same_text(&before.title, &after.title) {
            if !(is_target_company && is_senior_role) {
                debug!(person_id = person.id.as_str(), "Title change not notable");
                return None;
            }
            let text = format!("{} was promoted to {}", person_name(person, profile), describe(after));
            return Some(self.insight(
                person,
                profile,
                InsightKind::Promotion,
                text,
                None,
                (is_target_company, is_senior_role),
                now,
            ));
        }

        self.scan_activity(person, profile, companies, now)
    }

    /// First activity preview containing a hiring keyword.
    fn scan_activity(
        &self,
        person: &MonitoredPerson,
        profile: &PersonProfile,
        companies: &[MonitoredCompany],
        now: DateTime<Utc>,
    ) -> Option<FeedItem> {
        let activity = profile.recent_activity.iter().find(|a| {
            let preview = a.preview.to_lowercase();
            HIRING_KEYWORDS.iter().any(|k| preview.contains(k))
        })?;

        let flags = match &profile.current_role {
            Some(role) => (
                find_by_name(companies, &role.company).is_some(),
                self.is_senior_role(&role.title),
            ),
            None => (false, false),
        };

        Some(self.insight(
            person,
            profile,
            InsightKind::HiringActivity,
            truncate_text(&activity.preview, self.config.insight_text_limit),
            activity.url.clone(),
            flags,
            now,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn insight(
        &self,
        person: &MonitoredPerson,
        profile: &PersonProfile,
        insight: InsightKind,
        text: String,
        source_url: Option<String>,
        (is_target_company, is_senior_role): (bool, bool),
        now: DateTime<Utc>,
    ) -> FeedItem {
        info!(person_id = person.id.as_str(), insight = %insight, "Person insight detected");
        FeedItem::new(
            FeedPayload::PersonInsight(PersonInsightPayload {
                person_id: person.id.clone(),
                person_name: person_name(person, profile).to_string(),
                insight,
                text,
                source_url,
                is_target_company,
                is_senior_role,
            }),
            now,
        )
    }
}

fn person_name<'a>(person: &'a MonitoredPerson, profile: &'a PersonProfile) -> &'a str {
    if profile.name.trim().is_empty() {
        &person.name
    } else {
        profile.name.trim()
    }
}

fn describe(role: &CurrentRole) -> String {
    format!("{} at {}", role.title.trim(), role.company.trim())
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
