use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use watchfeed_common::{company_slug, normalize_profile_url, JobPreferences, MonitoredCompany, MonitoredPerson};

use crate::kv::{read_json, write_json, KeyValueStore};

const COMPANIES_KEY: &str = "watchlist.companies";
const PEOPLE_KEY: &str = "watchlist.people";
const PREFERENCES_KEY: &str = "preferences.global";

/// User-curated companies and people, plus the global job preferences.
///
/// Removing an entry never touches the feed: items about it stay.
#[derive(Clone)]
pub struct WatchlistStore {
    kv: Arc<dyn KeyValueStore>,
}

impl WatchlistStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    // --- Companies ---

    pub async fn companies(&self) -> Result<Vec<MonitoredCompany>> {
        Ok(read_json(self.kv.as_ref(), COMPANIES_KEY).await?.unwrap_or_default())
    }

    /// Add a company, replacing any entry with the same id.
    pub async fn upsert_company(&self, company: MonitoredCompany) -> Result<()> {
        let mut companies = self.companies().await?;
        info!(id = company.id.as_str(), name = company.name.as_str(), "Watching company");
        match companies.iter_mut().find(|c| c.id == company.id) {
            Some(existing) => *existing = company,
            None => companies.push(company),
        }
        write_json(self.kv.as_ref(), COMPANIES_KEY, &companies).await
    }

    pub async fn remove_company(&self, id: &str) -> Result<bool> {
        let mut companies = self.companies().await?;
        let before = companies.len();
        companies.retain(|c| c.id != id);
        if companies.len() == before {
            return Ok(false);
        }
        write_json(self.kv.as_ref(), COMPANIES_KEY, &companies).await?;
        Ok(true)
    }

    pub async fn company(&self, id: &str) -> Result<Option<MonitoredCompany>> {
        Ok(self.companies().await?.into_iter().find(|c| c.id == id))
    }

    /// Case-insensitive exact name match.
    pub async fn find_company_by_name(&self, name: &str) -> Result<Option<MonitoredCompany>> {
        Ok(find_by_name(&self.companies().await?, name).cloned())
    }

    /// Match a company page slug against each watched company's canonical URL.
    pub async fn find_company_by_slug(&self, slug: &str) -> Result<Option<MonitoredCompany>> {
        Ok(self
            .companies()
            .await?
            .into_iter()
            .find(|c| company_slug(&c.company_url).as_deref() == Some(slug)))
    }

    pub async fn touch_company(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut companies = self.companies().await?;
        if let Some(company) = companies.iter_mut().find(|c| c.id == id) {
            company.last_checked = Some(now);
            write_json(self.kv.as_ref(), COMPANIES_KEY, &companies).await?;
        }
        Ok(())
    }

    // --- People ---

    pub async fn people(&self) -> Result<Vec<MonitoredPerson>> {
        Ok(read_json(self.kv.as_ref(), PEOPLE_KEY).await?.unwrap_or_default())
    }

    pub async fn upsert_person(&self, person: MonitoredPerson) -> Result<()> {
        let mut people = self.people().await?;
        info!(id = person.id.as_str(), name = person.name.as_str(), "Watching person");
        match people.iter_mut().find(|p| p.id == person.id) {
            Some(existing) => *existing = person,
            None => people.push(person),
        }
        write_json(self.kv.as_ref(), PEOPLE_KEY, &people).await
    }

    pub async fn remove_person(&self, id: &str) -> Result<bool> {
        let mut people = self.people().await?;
        let before = people.len();
        people.retain(|p| p.id != id);
        if people.len() == before {
            return Ok(false);
        }
        write_json(self.kv.as_ref(), PEOPLE_KEY, &people).await?;
        Ok(true)
    }

    pub async fn find_person_by_profile_url(&self, profile_url: &str) -> Result<Option<MonitoredPerson>> {
        let wanted = normalize_profile_url(profile_url);
        Ok(self
            .people()
            .await?
            .into_iter()
            .find(|p| normalize_profile_url(&p.profile_url) == wanted))
    }

    pub async fn touch_person(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut people = self.people().await?;
        if let Some(person) = people.iter_mut().find(|p| p.id == id) {
            person.last_checked = Some(now);
            write_json(self.kv.as_ref(), PEOPLE_KEY, &people).await?;
        }
        Ok(())
    }

    // --- Preferences ---

    pub async fn global_preferences(&self) -> Result<JobPreferences> {
        Ok(read_json(self.kv.as_ref(), PREFERENCES_KEY).await?.unwrap_or_default())
    }

    pub async fn set_global_preferences(&self, preferences: &JobPreferences) -> Result<()> {
        write_json(self.kv.as_ref(), PREFERENCES_KEY, preferences).await
    }
}

/// Case-insensitive exact name match over an already-loaded watchlist.
pub fn find_by_name<'a>(companies: &'a [MonitoredCompany], name: &str) -> Option<&'a MonitoredCompany> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    companies.iter().find(|c| c.name.trim().to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn acme() -> MonitoredCompany {
        MonitoredCompany {
            id: "c1".into(),
            name: "Acme Corp".into(),
            company_url: "https://www.linkedin.com/company/acme-corp/".into(),
            logo_url: None,
            job_alert_enabled: true,
            job_preferences: None,
            last_checked: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        watchlist.upsert_company(acme()).await.unwrap();
        watchlist
            .upsert_company(MonitoredCompany {
                name: "Acme Corporation".into(),
                ..acme()
            })
            .await
            .unwrap();

        let companies = watchlist.companies().await.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Acme Corporation");
    }

    #[tokio::test]
    async fn find_by_name_is_case_insensitive_exact() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        watchlist.upsert_company(acme()).await.unwrap();

        assert!(watchlist.find_company_by_name("acme corp").await.unwrap().is_some());
        assert!(watchlist.find_company_by_name("Acme").await.unwrap().is_none());
        assert!(watchlist.find_company_by_name("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_slug_uses_company_url() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        watchlist.upsert_company(acme()).await.unwrap();
        assert!(watchlist.find_company_by_slug("acme-corp").await.unwrap().is_some());
        assert!(watchlist.find_company_by_slug("globex").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_and_touch() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        watchlist.upsert_company(acme()).await.unwrap();

        let now = Utc::now();
        watchlist.touch_company("c1", now).await.unwrap();
        assert_eq!(watchlist.company("c1").await.unwrap().unwrap().last_checked, Some(now));

        assert!(watchlist.remove_company("c1").await.unwrap());
        assert!(!watchlist.remove_company("c1").await.unwrap());
    }

    #[tokio::test]
    async fn person_lookup_normalizes_urls() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        watchlist
            .upsert_person(MonitoredPerson {
                id: "p1".into(),
                name: "Alice".into(),
                profile_url: "https://www.linkedin.com/in/alice/".into(),
                last_checked: None,
            })
            .await
            .unwrap();

        let found = watchlist
            .find_person_by_profile_url("https://www.linkedin.com/in/Alice?trk=feed")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id), Some("p1".to_string()));
    }

    #[tokio::test]
    async fn preferences_default_to_empty() {
        let watchlist = WatchlistStore::new(Arc::new(MemoryStore::new()));
        assert!(watchlist.global_preferences().await.unwrap().is_empty());

        let prefs = JobPreferences {
            keywords: vec!["rust".into()],
            ..Default::default()
        };
        watchlist.set_global_preferences(&prefs).await.unwrap();
        assert_eq!(watchlist.global_preferences().await.unwrap(), prefs);
    }
}
