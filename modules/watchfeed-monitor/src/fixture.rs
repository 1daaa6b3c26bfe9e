// Recorded page scrape, used by the CLI to replay a visit offline.
//
// The file is one JSON document:
// {
//   "jobs":        { "<company id>": [JobPosting, ...] },
//   "updates":     { "<company id>": [CompanyPost, ...] },
//   "profile":     PersonProfile | null,
//   "connections": [Connection, ...]
// }
// Every section is optional.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use watchfeed_common::{CompanyPost, Connection, JobPosting, PersonProfile, WatchfeedError};

use crate::traits::PageScraper;

#[derive(Debug, Default, Deserialize)]
pub struct FixtureScraper {
    #[serde(default)]
    jobs: HashMap<String, Vec<JobPosting>>,
    #[serde(default)]
    updates: HashMap<String, Vec<CompanyPost>>,
    #[serde(default)]
    profile: Option<PersonProfile>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl FixtureScraper {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading scrape fixture {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing scrape fixture {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw).map_err(WatchfeedError::from)?)
    }
}

#[async_trait]
impl PageScraper for FixtureScraper {
    async fn jobs_for_company(&self, company_id: &str) -> Result<Vec<JobPosting>> {
        Ok(self.jobs.get(company_id).cloned().unwrap_or_default())
    }

    async fn updates_for_company(&self, company_id: &str) -> Result<Vec<CompanyPost>> {
        Ok(self.updates.get(company_id).cloned().unwrap_or_default())
    }

    async fn profile_for_person(&self) -> Result<Option<PersonProfile>> {
        Ok(self.profile.clone())
    }

    async fn current_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.clone())
    }
}
