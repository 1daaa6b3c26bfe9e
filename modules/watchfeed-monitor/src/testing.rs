// Test mocks for the monitor.
//
// - MockScraper (PageScraper): canned scrape results per company id
// - FlakyStore (KeyValueStore): wrapper that fails reads/writes by key prefix
//
// Plus fixture builders for companies, jobs, posts, connections, paths and
// profiles.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use watchfeed_common::{
    CompanyPost, Connection, ConnectionPath, CurrentRole, JobPosting, JobPreferences,
    MonitoredCompany, MonitoredPerson, PathStep, PersonProfile, WatchfeedError,
};
use watchfeed_store::{KeyValueStore, MemoryStore};

use crate::traits::PageScraper;

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// Canned page scraper. Unregistered companies scrape as empty.
/// Builder pattern: `.on_jobs()`, `.on_updates()`, `.on_profile()`,
/// `.on_connections()`, `.failing()`.
#[derive(Default)]
pub struct MockScraper {
    jobs: HashMap<String, Vec<JobPosting>>,
    updates: HashMap<String, Vec<CompanyPost>>,
    profile: Option<PersonProfile>,
    connections: Vec<Connection>,
    failing: bool,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_jobs(mut self, company_id: &str, jobs: Vec<JobPosting>) -> Self {
        self.jobs.insert(company_id.to_string(), jobs);
        self
    }

    pub fn on_updates(mut self, company_id: &str, updates: Vec<CompanyPost>) -> Self {
        self.updates.insert(company_id.to_string(), updates);
        self
    }

    pub fn on_profile(mut self, profile: PersonProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn on_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    /// Every scrape returns an error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.failing {
            return Err(WatchfeedError::Scrape(format!("{what} unavailable")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl PageScraper for MockScraper {
    async fn jobs_for_company(&self, company_id: &str) -> Result<Vec<JobPosting>> {
        self.check("jobs")?;
        Ok(self.jobs.get(company_id).cloned().unwrap_or_default())
    }

    async fn updates_for_company(&self, company_id: &str) -> Result<Vec<CompanyPost>> {
        self.check("updates")?;
        Ok(self.updates.get(company_id).cloned().unwrap_or_default())
    }

    async fn profile_for_person(&self) -> Result<Option<PersonProfile>> {
        self.check("profile")?;
        Ok(self.profile.clone())
    }

    async fn current_connections(&self) -> Result<Vec<Connection>> {
        self.check("connections")?;
        Ok(self.connections.clone())
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// Store that errors on any read or write touching a key with one of the
/// configured prefixes. Everything else passes through to `inner`.
pub struct FlakyStore {
    inner: Arc<dyn KeyValueStore>,
    failing_reads: Vec<String>,
    failing_writes: Vec<String>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::over(Arc::new(MemoryStore::new()))
    }

    /// Wrap a store that may already hold state, e.g. a seeded baseline.
    pub fn over(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            failing_reads: Vec::new(),
            failing_writes: Vec::new(),
        }
    }

    pub fn fail_reads_of(mut self, prefix: &str) -> Self {
        self.failing_reads.push(prefix.to_string());
        self
    }

    pub fn fail_writes_of(mut self, prefix: &str) -> Self {
        self.failing_writes.push(prefix.to_string());
        self
    }

    fn matches<'a>(prefixes: &[String], mut keys: impl Iterator<Item = &'a str>) -> Option<String> {
        keys.find(|k| prefixes.iter().any(|p| k.starts_with(p.as_str())))
            .map(str::to_string)
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        if let Some(key) = Self::matches(&self.failing_reads, keys.iter().copied()) {
            bail!("FlakyStore: read of {key} failed");
        }
        self.inner.get(keys).await
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
        if let Some(key) = Self::matches(&self.failing_writes, entries.keys().map(String::as_str)) {
            bail!("FlakyStore: write of {key} failed");
        }
        self.inner.set(entries).await
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// Watched company with alerts on. The page slug is the lowercased,
/// hyphenated name.
pub fn company(id: &str, name: &str) -> MonitoredCompany {
    let slug = name.trim().to_lowercase().replace(' ', "-");
    MonitoredCompany {
        id: id.to_string(),
        name: name.to_string(),
        company_url: format!("https://www.linkedin.com/company/{slug}/"),
        logo_url: None,
        job_alert_enabled: true,
        job_preferences: None,
        last_checked: None,
    }
}

pub fn company_with_keywords(id: &str, name: &str, keywords: &[&str]) -> MonitoredCompany {
    MonitoredCompany {
        job_preferences: Some(JobPreferences {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }),
        ..company(id, name)
    }
}

pub fn job(id: &str, title: &str, days_ago: i64) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        title: title.to_string(),
        posted_at: Some(Utc::now() - Duration::days(days_ago)),
        location: None,
        url: format!("https://www.linkedin.com/jobs/view/{id}"),
    }
}

pub fn post(id: &str, days_ago: i64) -> CompanyPost {
    CompanyPost {
        id: id.to_string(),
        preview: format!("Company news {id}"),
        timestamp: Utc::now() - Duration::days(days_ago),
        url: format!("https://www.linkedin.com/feed/update/{id}"),
    }
}

pub fn profile_url(slug: &str) -> String {
    format!("https://www.linkedin.com/in/{slug}")
}

pub fn connection(slug: &str, name: &str, company: Option<&str>) -> Connection {
    Connection {
        profile_url: profile_url(slug),
        name: name.to_string(),
        title: Some("Engineer".to_string()),
        company: company.map(str::to_string),
        photo_url: None,
    }
}

/// Two unconnected steps: Alice (1st degree) then Bob (2nd degree).
pub fn alice_bob_path(id: &str) -> ConnectionPath {
    let step = |name: &str, slug: &str, degree: u8| PathStep {
        name: name.to_string(),
        profile_url: profile_url(slug),
        degree,
        connected: false,
    };
    ConnectionPath::new(
        id,
        "Taylor Target",
        vec![step("Alice", "alice", 1), step("Bob", "bob", 2)],
        Utc::now(),
    )
}

/// Watched person whose profile slug is their id.
pub fn person(id: &str, name: &str) -> MonitoredPerson {
    MonitoredPerson {
        id: id.to_string(),
        name: name.to_string(),
        profile_url: profile_url(id),
        last_checked: None,
    }
}

/// Profile with an optional `(title, company)` current role and no activity.
pub fn profile(name: &str, role: Option<(&str, &str)>) -> PersonProfile {
    PersonProfile {
        name: name.to_string(),
        headline: String::new(),
        current_role: role.map(|(title, company)| CurrentRole {
            title: title.to_string(),
            company: company.to_string(),
        }),
        photo_url: None,
        location: None,
        recent_activity: Vec::new(),
    }
}
