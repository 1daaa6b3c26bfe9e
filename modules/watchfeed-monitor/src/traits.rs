// Trait abstractions for the monitor's external collaborators.
//
// PageScraper: whatever reads the currently visited page (extension content
// script, headless browser, recorded fixture). Errors mean "scrape
// unavailable" and degrade the affected detector to no signal.
// JobMatcher: scores a posting against the user's preferences.
//
// Both are injected as Arc<dyn ...> so tests swap in MockScraper and a fixed
// matcher without touching detector logic.

use anyhow::Result;
use async_trait::async_trait;

use watchfeed_common::{CompanyPost, Connection, JobPosting, JobPreferences, PersonProfile};

#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Open postings for a company. Empty when nothing was found.
    async fn jobs_for_company(&self, company_id: &str) -> Result<Vec<JobPosting>>;

    /// Recent company page posts.
    async fn updates_for_company(&self, company_id: &str) -> Result<Vec<CompanyPost>>;

    /// Profile on the current page, if one could be read.
    async fn profile_for_person(&self) -> Result<Option<PersonProfile>>;

    /// First-degree connections visible on the connections page.
    async fn current_connections(&self) -> Result<Vec<Connection>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// 0..=100
    pub score: u8,
    pub reasons: Vec<String>,
}

pub trait JobMatcher: Send + Sync {
    fn score(&self, job: &JobPosting, preferences: &JobPreferences) -> MatchResult;
}
