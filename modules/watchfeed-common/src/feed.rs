//! Feed items: one common envelope plus a tagged payload per notification type.
//!
//! Only `read` changes after creation. The envelope serializes flat with a
//! `type` tag, e.g. `{"id": ..., "timestamp": ..., "read": false, "type": "job_alert", ...}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(flatten)]
    pub payload: FeedPayload,
}

impl FeedItem {
    pub fn new(payload: FeedPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            read: false,
            payload,
        }
    }

    pub fn kind(&self) -> FeedItemKind {
        self.payload.kind()
    }

    /// Company this item is about, when it has one.
    pub fn company_id(&self) -> Option<&str> {
        match &self.payload {
            FeedPayload::JobAlert(p) => Some(&p.company_id),
            FeedPayload::HiringHeat(p) => Some(&p.company_id),
            FeedPayload::CompanyUpdate(p) => Some(&p.company_id),
            FeedPayload::WarmPath(p) => Some(&p.company_id),
            FeedPayload::ConnectionUpdate(_) | FeedPayload::PersonInsight(_) => None,
        }
    }

    /// Identity used by the feed store to refuse duplicate inserts.
    ///
    /// Windowed types (hiring heat, warm path) return `None`: their dedup is
    /// time-bounded and handled by the detectors. So do role changes.
    pub fn dedup_key(&self) -> Option<String> {
        match &self.payload {
            FeedPayload::JobAlert(p) => Some(format!("job_alert:{}:{}", p.company_id, p.job_id)),
            FeedPayload::CompanyUpdate(p) => {
                Some(format!("company_update:{}:{}", p.company_id, p.source_url))
            }
            FeedPayload::ConnectionUpdate(p) => {
                Some(format!("connection_update:{}:{}", p.path_id, p.person_url))
            }
            FeedPayload::PersonInsight(p) => match p.insight {
                InsightKind::HiringActivity => Some(format!(
                    "person_insight:{}:{}:{}",
                    p.person_id,
                    p.insight,
                    p.source_url.as_deref().unwrap_or(&p.text)
                )),
                // Role changes are deduped by the snapshot diff; a person can
                // move back to an employer they held before.
                InsightKind::JobChange | InsightKind::Promotion => None,
            },
            FeedPayload::HiringHeat(_) | FeedPayload::WarmPath(_) => None,
        }
    }

    /// One-line summary for listings and logs.
    pub fn headline(&self) -> String {
        match &self.payload {
            FeedPayload::JobAlert(p) => format!(
                "{} is hiring: {} ({}% match)",
                p.company_name, p.job_title, p.match_score
            ),
            FeedPayload::HiringHeat(p) => format!(
                "{} hiring is {}: {} new roles in {} days",
                p.company_name, p.heat_level, p.job_count, p.window_days
            ),
            FeedPayload::CompanyUpdate(p) => format!("{} posted: {}", p.company_name, p.preview),
            FeedPayload::ConnectionUpdate(p) => p.message.clone(),
            FeedPayload::WarmPath(p) => format!(
                "{} can introduce you at {}",
                p.connector_name, p.company_name
            ),
            FeedPayload::PersonInsight(p) => format!("{}: {}", p.person_name, p.text),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedPayload {
    JobAlert(JobAlertPayload),
    HiringHeat(HiringHeatPayload),
    CompanyUpdate(CompanyUpdatePayload),
    ConnectionUpdate(ConnectionUpdatePayload),
    WarmPath(WarmPathPayload),
    PersonInsight(PersonInsightPayload),
}

impl FeedPayload {
    pub fn kind(&self) -> FeedItemKind {
        match self {
            FeedPayload::JobAlert(_) => FeedItemKind::JobAlert,
            FeedPayload::HiringHeat(_) => FeedItemKind::HiringHeat,
            FeedPayload::CompanyUpdate(_) => FeedItemKind::CompanyUpdate,
            FeedPayload::ConnectionUpdate(_) => FeedItemKind::ConnectionUpdate,
            FeedPayload::WarmPath(_) => FeedItemKind::WarmPath,
            FeedPayload::PersonInsight(_) => FeedItemKind::PersonInsight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedItemKind {
    JobAlert,
    HiringHeat,
    CompanyUpdate,
    ConnectionUpdate,
    WarmPath,
    PersonInsight,
}

impl std::fmt::Display for FeedItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedItemKind::JobAlert => write!(f, "job_alert"),
            FeedItemKind::HiringHeat => write!(f, "hiring_heat"),
            FeedItemKind::CompanyUpdate => write!(f, "company_update"),
            FeedItemKind::ConnectionUpdate => write!(f, "connection_update"),
            FeedItemKind::WarmPath => write!(f, "warm_path"),
            FeedItemKind::PersonInsight => write!(f, "person_insight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAlertPayload {
    pub company_id: String,
    pub company_name: String,
    pub job_id: String,
    pub job_title: String,
    pub job_url: String,
    #[serde(default)]
    pub location: Option<String>,
    pub match_score: u8,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    Warming,
    Hot,
    VeryHot,
}

impl std::fmt::Display for HeatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeatLevel::Warming => write!(f, "warming"),
            HeatLevel::Hot => write!(f, "hot"),
            HeatLevel::VeryHot => write!(f, "very_hot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringHeatPayload {
    pub company_id: String,
    pub company_name: String,
    pub heat_level: HeatLevel,
    pub job_count: usize,
    pub internship_count: usize,
    pub top_job_titles: Vec<String>,
    pub window_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdatePayload {
    pub company_id: String,
    pub company_name: String,
    pub update_id: String,
    pub preview: String,
    pub source_url: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionUpdatePayload {
    pub path_id: String,
    pub person_name: String,
    pub person_url: String,
    pub step_index: usize,
    pub path_complete: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmPathPayload {
    pub company_id: String,
    pub company_name: String,
    pub company_url: String,
    #[serde(default)]
    pub company_logo: Option<String>,
    pub connector_name: String,
    pub connector_url: String,
    #[serde(default)]
    pub connector_title: Option<String>,
    #[serde(default)]
    pub connector_photo: Option<String>,
    pub path_length: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    HiringActivity,
    JobChange,
    Promotion,
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightKind::HiringActivity => write!(f, "hiring_activity"),
            InsightKind::JobChange => write!(f, "job_change"),
            InsightKind::Promotion => write!(f, "promotion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonInsightPayload {
    pub person_id: String,
    pub person_name: String,
    pub insight: InsightKind,
    pub text: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub is_target_company: bool,
    #[serde(default)]
    pub is_senior_role: bool,
}

// ---------------------------------------------------------------------------
// Aggregate stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedStats {
    pub total: usize,
    pub unread: usize,
    pub by_kind: BTreeMap<FeedItemKind, usize>,
}

impl FeedStats {
    pub fn from_items(items: &[FeedItem]) -> Self {
        let mut stats = FeedStats {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            if !item.read {
                stats.unread += 1;
            }
            *stats.by_kind.entry(item.kind()).or_insert(0) += 1;
        }
        stats
    }
}

impl std::fmt::Display for FeedStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feed items: {} ({} unread)", self.total, self.unread)?;
        for (kind, count) in &self.by_kind {
            writeln!(f, "  {kind:<18} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat_item() -> FeedItem {
        FeedItem::new(
            FeedPayload::HiringHeat(HiringHeatPayload {
                company_id: "c1".into(),
                company_name: "Acme".into(),
                heat_level: HeatLevel::Hot,
                job_count: 6,
                internship_count: 1,
                top_job_titles: vec!["Intern".into()],
                window_days: 7,
            }),
            Utc::now(),
        )
    }

    #[test]
    fn envelope_serializes_flat_with_type_tag() {
        let item = heat_item();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "hiring_heat");
        assert_eq!(json["heat_level"], "hot");
        assert_eq!(json["read"], false);
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn envelope_parses_back_into_the_same_variant() {
        let item = heat_item();
        let json = serde_json::to_string(&item).unwrap();
        let parsed: FeedItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
        assert_eq!(parsed.kind(), FeedItemKind::HiringHeat);
    }

    #[test]
    fn windowed_kinds_have_no_dedup_key() {
        assert!(heat_item().dedup_key().is_none());
    }

    fn insight_item(insight: InsightKind, source_url: Option<&str>) -> FeedItem {
        FeedItem::new(
            FeedPayload::PersonInsight(PersonInsightPayload {
                person_id: "p1".into(),
                person_name: "Dana".into(),
                insight,
                text: "Dana started a new role as Engineer at Acme Corp".into(),
                source_url: source_url.map(Into::into),
                is_target_company: true,
                is_senior_role: false,
            }),
            Utc::now(),
        )
    }

    #[test]
    fn role_changes_have_no_dedup_key() {
        assert!(insight_item(InsightKind::JobChange, None).dedup_key().is_none());
        assert!(insight_item(InsightKind::Promotion, None).dedup_key().is_none());
        assert_eq!(
            insight_item(InsightKind::HiringActivity, Some("https://example.com/post/1")).dedup_key(),
            Some("person_insight:p1:hiring_activity:https://example.com/post/1".into())
        );
    }

    #[test]
    fn stats_count_unread_and_kinds() {
        let mut read = heat_item();
        read.read = true;
        let stats = FeedStats::from_items(&[heat_item(), read]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unread, 1);
        assert_eq!(stats.by_kind.get(&FeedItemKind::HiringHeat), Some(&2));
    }
}
