//! Monitoring orchestrator.
//!
//! One page visit is one cycle: classify the URL, resolve it against the
//! watchlist, run the detector groups for that page kind, and publish the
//! candidates to the feed. Each group runs inside its own error boundary so
//! one failing detector never blocks its siblings.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use watchfeed_common::{
    classify_page, FeedItem, MonitorConfig, MonitoredCompany, MonitoredPerson, PageKind,
    PersonSnapshot, ProfileRecord,
};
use watchfeed_store::{
    AcceptanceLedger, FeedStore, KeyValueStore, PathStore, SnapshotStore, WarmPathLedger,
    WatchlistStore,
};

use crate::detectors::{
    CompanyUpdateDetector, ConnectionAcceptanceDetector, HiringHeatDetector, JobAlertDetector,
    PersonInsightDetector, WarmPathDetector,
};
use crate::matcher::KeywordMatcher;
use crate::stats::{CycleReport, CycleTarget};
use crate::traits::{JobMatcher, PageScraper};

/// A page the user just opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVisit {
    pub url: String,
}

impl PageVisit {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Clone, TypedBuilder)]
pub struct MonitorDeps {
    pub kv: Arc<dyn KeyValueStore>,
    pub scraper: Arc<dyn PageScraper>,
    #[builder(default = Arc::new(KeywordMatcher) as Arc<dyn JobMatcher>)]
    pub matcher: Arc<dyn JobMatcher>,
    #[builder(default)]
    pub config: MonitorConfig,
}

/// Which detector groups a company page runs.
#[derive(Debug, Clone, Copy)]
struct CompanyGroups {
    jobs: bool,
    posts: bool,
}

pub struct Monitor {
    scraper: Arc<dyn PageScraper>,
    watchlist: WatchlistStore,
    paths: PathStore,
    feed: FeedStore,
    snapshots: SnapshotStore,
    job_alert: JobAlertDetector,
    hiring_heat: HiringHeatDetector,
    company_update: CompanyUpdateDetector,
    acceptance: ConnectionAcceptanceDetector,
    person_insight: PersonInsightDetector,
}

impl Monitor {
    pub fn new(deps: MonitorDeps) -> Result<Self> {
        let MonitorDeps {
            kv,
            scraper,
            matcher,
            config,
        } = deps;

        let watchlist = WatchlistStore::new(kv.clone());
        let paths = PathStore::new(kv.clone());
        let feed = FeedStore::new(kv.clone());
        let snapshots = SnapshotStore::new(kv.clone());

        let warm_path = WarmPathDetector::new(
            watchlist.clone(),
            WarmPathLedger::new(kv.clone()),
            config.clone(),
        );

        Ok(Self {
            job_alert: JobAlertDetector::new(snapshots.clone(), matcher, config.clone()),
            hiring_heat: HiringHeatDetector::new(feed.clone(), config.clone()),
            company_update: CompanyUpdateDetector::new(snapshots.clone(), feed.clone(), config.clone()),
            acceptance: ConnectionAcceptanceDetector::new(
                paths.clone(),
                AcceptanceLedger::new(kv),
                warm_path,
            ),
            person_insight: PersonInsightDetector::new(config)?,
            scraper,
            watchlist,
            paths,
            feed,
            snapshots,
        })
    }

    pub fn feed(&self) -> &FeedStore {
        &self.feed
    }

    pub fn watchlist(&self) -> &WatchlistStore {
        &self.watchlist
    }

    pub fn paths(&self) -> &PathStore {
        &self.paths
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub async fn handle_visit(&self, visit: &PageVisit) -> CycleReport {
        self.handle_visit_at(visit, Utc::now()).await
    }

    /// Run one cycle as of `now`. Never fails: every problem is logged and
    /// reflected in the report.
    pub async fn handle_visit_at(&self, visit: &PageVisit, now: DateTime<Utc>) -> CycleReport {
        let report = match classify_page(&visit.url) {
            PageKind::CompanyHome { slug } => {
                self.company_cycle(&slug, CompanyGroups { jobs: true, posts: true }, now)
                    .await
            }
            PageKind::CompanyJobs { slug } => {
                self.company_cycle(&slug, CompanyGroups { jobs: true, posts: false }, now)
                    .await
            }
            PageKind::CompanyPosts { slug } => {
                self.company_cycle(&slug, CompanyGroups { jobs: false, posts: true }, now)
                    .await
            }
            PageKind::PersonProfile { profile_url } => self.person_cycle(&profile_url, now).await,
            PageKind::Connections => self.connections_cycle(now).await,
            PageKind::Other => {
                debug!(url = visit.url.as_str(), "Page is not monitored");
                CycleReport::default()
            }
        };

        info!(
            url = visit.url.as_str(),
            target = %report.target,
            candidates = report.total_candidates(),
            published = report.published,
            refused = report.duplicates_refused,
            failed = report.failed_detectors.len(),
            "Monitor cycle complete"
        );
        report
    }

    // --- Company pages ---

    async fn company_cycle(&self, slug: &str, groups: CompanyGroups, now: DateTime<Utc>) -> CycleReport {
        let company = match self.watchlist.find_company_by_slug(slug).await {
            Ok(Some(company)) => company,
            Ok(None) => {
                debug!(slug, "Company not on watchlist");
                return CycleReport::default();
            }
            Err(e) => {
                warn!(slug, error = %e, "Watchlist lookup failed");
                let mut report = CycleReport::default();
                report.detector_failed("watchlist");
                return report;
            }
        };

        let mut report = CycleReport::new(CycleTarget::Company {
            id: company.id.clone(),
            name: company.name.clone(),
        });
        let mut candidates = Vec::new();

        // The two groups touch disjoint snapshots; run them side by side.
        let jobs = async {
            if groups.jobs {
                Some(self.job_group(&company, now).await)
            } else {
                None
            }
        };
        let posts = async {
            if groups.posts {
                Some(self.update_group(&company, now).await)
            } else {
                None
            }
        };
        let (jobs, posts) = join(jobs, posts).await;

        match jobs {
            Some(Ok(items)) => candidates.extend(items),
            Some(Err(e)) => {
                warn!(company_id = company.id.as_str(), error = %e, "Job detectors failed");
                report.detector_failed("job_alert");
            }
            None => {}
        }
        match posts {
            Some(Ok(items)) => candidates.extend(items),
            Some(Err(e)) => {
                warn!(company_id = company.id.as_str(), error = %e, "Company update detector failed");
                report.detector_failed("company_update");
            }
            None => {}
        }

        self.publish(candidates, &mut report).await;

        if let Err(e) = self.watchlist.touch_company(&company.id, now).await {
            warn!(company_id = company.id.as_str(), error = %e, "Failed to bump lastChecked");
        }
        report
    }

    /// Job alert, then hiring heat over the same scrape. Heat is skipped when
    /// the job-alert diff failed since it needs that diff's new-job set.
    async fn job_group(&self, company: &MonitoredCompany, now: DateTime<Utc>) -> Result<Vec<FeedItem>> {
        let jobs = match self.scraper.jobs_for_company(&company.id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(company_id = company.id.as_str(), error = %e, "Job scrape unavailable");
                Vec::new()
            }
        };

        let global = match self.watchlist.global_preferences().await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(error = %e, "Global preferences unreadable, using none");
                Default::default()
            }
        };

        let outcome = self.job_alert.detect(company, &global, &jobs, now).await?;
        let mut items = outcome.alerts;
        if let Some(heat) = self
            .hiring_heat
            .detect(company, &jobs, &outcome.new_jobs, now)
            .await
        {
            items.push(heat);
        }
        Ok(items)
    }

    async fn update_group(&self, company: &MonitoredCompany, now: DateTime<Utc>) -> Result<Vec<FeedItem>> {
        let updates = match self.scraper.updates_for_company(&company.id).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(company_id = company.id.as_str(), error = %e, "Update scrape unavailable");
                Vec::new()
            }
        };
        self.company_update.detect(company, &updates, now).await
    }

    // --- Person pages ---

    async fn person_cycle(&self, profile_url: &str, now: DateTime<Utc>) -> CycleReport {
        let person = match self.watchlist.find_person_by_profile_url(profile_url).await {
            Ok(Some(person)) => person,
            Ok(None) => {
                debug!(profile_url, "Person not on watchlist");
                return CycleReport::default();
            }
            Err(e) => {
                warn!(profile_url, error = %e, "Watchlist lookup failed");
                let mut report = CycleReport::default();
                report.detector_failed("watchlist");
                return report;
            }
        };

        let mut report = CycleReport::new(CycleTarget::Person {
            id: person.id.clone(),
            name: person.name.clone(),
        });

        match self.person_group(&person, now).await {
            Ok(item) => self.publish(item.into_iter().collect(), &mut report).await,
            Err(e) => {
                warn!(person_id = person.id.as_str(), error = %e, "Person insight detector failed");
                report.detector_failed("person_insight");
            }
        }

        if let Err(e) = self.watchlist.touch_person(&person.id, now).await {
            warn!(person_id = person.id.as_str(), error = %e, "Failed to bump lastChecked");
        }
        report
    }

    async fn person_group(&self, person: &MonitoredPerson, now: DateTime<Utc>) -> Result<Option<FeedItem>> {
        let profile = match self.scraper.profile_for_person().await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(person_id = person.id.as_str(), "No profile scraped");
                return Ok(None);
            }
            Err(e) => {
                warn!(person_id = person.id.as_str(), error = %e, "Profile scrape unavailable");
                return Ok(None);
            }
        };

        let prior: Option<PersonSnapshot> = self.snapshots.get(&person.id).await?;
        let companies = self.watchlist.companies().await?;
        let item = self
            .person_insight
            .detect(person, &profile, prior.as_ref(), &companies, now);

        let snapshot = PersonSnapshot {
            person_id: person.id.clone(),
            last_checked: now,
            profile: ProfileRecord::from(&profile),
        };
        if let Err(e) = self.snapshots.set(&snapshot).await {
            warn!(person_id = person.id.as_str(), error = %e, "Person snapshot save failed");
        }
        Ok(item)
    }

    // --- Connections page ---

    async fn connections_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::new(CycleTarget::Connections);
        match self.connection_group(now).await {
            Ok(items) => self.publish(items, &mut report).await,
            Err(e) => {
                warn!(error = %e, "Connection acceptance detector failed");
                report.detector_failed("connection_acceptance");
            }
        }
        report
    }

    async fn connection_group(&self, now: DateTime<Utc>) -> Result<Vec<FeedItem>> {
        let connections = match self.scraper.current_connections().await {
            Ok(connections) => connections,
            Err(e) => {
                warn!(error = %e, "Connections scrape unavailable");
                return Ok(Vec::new());
            }
        };
        if connections.is_empty() {
            return Ok(Vec::new());
        }

        let paths = self.paths.list().await?;
        let candidates = self.acceptance.detect(&paths, &connections).await;

        let mut items = Vec::new();
        for candidate in &candidates {
            items.extend(self.acceptance.apply(candidate, now).await);
        }
        Ok(items)
    }

    // --- Publishing ---

    /// Forward candidates to the feed in order. The feed refuses items whose
    /// dedup key is already present.
    async fn publish(&self, candidates: Vec<FeedItem>, report: &mut CycleReport) {
        for item in candidates {
            let kind = item.kind();
            report.count_candidate(kind);
            match self.feed.insert(item).await {
                Ok(true) => report.published += 1,
                Ok(false) => {
                    debug!(kind = %kind, "Duplicate refused by feed");
                    report.duplicates_refused += 1;
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Feed insert failed");
                    report.publish_failures += 1;
                }
            }
        }
    }
}
