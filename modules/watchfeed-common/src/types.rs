use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Watchlist Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkLocationType {
    Remote,
    Hybrid,
    OnSite,
}

impl WorkLocationType {
    /// Infer the work arrangement from a scraped location string.
    pub fn infer(location: &str) -> Option<Self> {
        let lower = location.to_lowercase();
        if lower.contains("remote") {
            Some(Self::Remote)
        } else if lower.contains("hybrid") {
            Some(Self::Hybrid)
        } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("on site")
        {
            Some(Self::OnSite)
        } else {
            None
        }
    }
}

impl std::fmt::Display for WorkLocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkLocationType::Remote => write!(f, "remote"),
            WorkLocationType::Hybrid => write!(f, "hybrid"),
            WorkLocationType::OnSite => write!(f, "on-site"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPreferences {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub work_location_types: Vec<WorkLocationType>,
}

impl JobPreferences {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.locations.is_empty() && self.work_location_types.is_empty()
    }

    /// Per-company override, falling back to the global preferences field by field.
    pub fn merged(company: Option<&JobPreferences>, global: &JobPreferences) -> JobPreferences {
        let Some(company) = company else {
            return global.clone();
        };
        JobPreferences {
            keywords: pick(&company.keywords, &global.keywords),
            locations: pick(&company.locations, &global.locations),
            work_location_types: pick(&company.work_location_types, &global.work_location_types),
        }
    }
}

fn pick<T: Clone>(own: &[T], fallback: &[T]) -> Vec<T> {
    if own.is_empty() {
        fallback.to_vec()
    } else {
        own.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredCompany {
    pub id: String,
    pub name: String,
    pub company_url: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub job_alert_enabled: bool,
    #[serde(default)]
    pub job_preferences: Option<JobPreferences>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredPerson {
    pub id: String,
    pub name: String,
    pub profile_url: String,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

// --- Scraped Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPost {
    pub id: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRole {
    pub title: String,
    pub company: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub preview: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub current_role: Option<CurrentRole>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityItem>,
}

/// One first-degree connection as listed on the connections page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub profile_url: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

// --- Snapshots ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub company_id: String,
    pub last_checked: DateTime<Utc>,
    pub jobs: Vec<JobPosting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub company_id: String,
    pub last_checked: DateTime<Utc>,
    pub updates: Vec<CompanyPost>,
}

/// The slice of a profile that person-insight diffs against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub current_role: Option<CurrentRole>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityItem>,
}

impl From<&PersonProfile> for ProfileRecord {
    fn from(profile: &PersonProfile) -> Self {
        Self {
            current_role: profile.current_role.clone(),
            recent_activity: profile.recent_activity.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSnapshot {
    pub person_id: String,
    pub last_checked: DateTime<Utc>,
    pub profile: ProfileRecord,
}

// --- Connection Paths ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub name: String,
    pub profile_url: String,
    pub degree: u8,
    #[serde(default)]
    pub connected: bool,
}

/// An ordered route of introductions toward a target person.
///
/// `completed_steps` and `is_complete` are derived from `steps`; call
/// [`ConnectionPath::recompute`] after touching any step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPath {
    pub id: String,
    pub target_name: String,
    #[serde(default)]
    pub target_company: Option<String>,
    pub steps: Vec<PathStep>,
    #[serde(default)]
    pub total_steps: usize,
    #[serde(default)]
    pub completed_steps: usize,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
}

impl ConnectionPath {
    pub fn new(
        id: impl Into<String>,
        target_name: impl Into<String>,
        steps: Vec<PathStep>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut path = Self {
            id: id.into(),
            target_name: target_name.into(),
            target_company: None,
            total_steps: steps.len(),
            steps,
            completed_steps: 0,
            is_complete: false,
            last_updated: now,
        };
        path.recompute();
        path
    }

    pub fn recompute(&mut self) {
        self.total_steps = self.steps.len();
        self.completed_steps = self.steps.iter().filter(|s| s.connected).count();
        self.is_complete = self.completed_steps == self.total_steps;
    }

    /// Mark one step connected. Returns false when the index is out of range.
    pub fn mark_connected(&mut self, step_index: usize, now: DateTime<Utc>) -> bool {
        let Some(step) = self.steps.get_mut(step_index) else {
            return false;
        };
        step.connected = true;
        self.recompute();
        self.last_updated = now;
        true
    }
}

// --- Dedup Ledger Rows ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarmPathKey {
    pub company_url: String,
    pub person_url: String,
    pub path_length: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmPathDedupeEntry {
    #[serde(flatten)]
    pub key: WarmPathKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAcceptance {
    pub path_id: String,
    pub person_url: String,
    pub logged_at: DateTime<Utc>,
}
