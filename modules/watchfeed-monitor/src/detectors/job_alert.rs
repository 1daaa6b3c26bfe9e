use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use watchfeed_common::{
    FeedItem, FeedPayload, JobAlertPayload, JobPosting, JobPreferences, JobSnapshot, MonitorConfig,
    MonitoredCompany,
};
use watchfeed_store::SnapshotStore;

use crate::traits::JobMatcher;

/// What one job-alert pass produced.
#[derive(Debug, Default)]
pub struct JobAlertOutcome {
    pub alerts: Vec<FeedItem>,
    /// Every job absent from the prior snapshot, before preference filtering.
    pub new_jobs: Vec<JobPosting>,
    pub first_check: bool,
    pub snapshot_written: bool,
}

/// Diffs the scraped job list against the stored snapshot and scores new
/// postings against the user's preferences.
///
/// With no prior snapshot every current job counts as new. That is the
/// opposite of the company-update detector, which only records a baseline.
pub struct JobAlertDetector {
    snapshots: SnapshotStore,
    matcher: Arc<dyn JobMatcher>,
    config: MonitorConfig,
}

impl JobAlertDetector {
    pub fn new(snapshots: SnapshotStore, matcher: Arc<dyn JobMatcher>, config: MonitorConfig) -> Self {
        Self {
            snapshots,
            matcher,
            config,
        }
    }

    pub async fn detect(
        &self,
        company: &MonitoredCompany,
        global: &JobPreferences,
        jobs: &[JobPosting],
        now: DateTime<Utc>,
    ) -> Result<JobAlertOutcome> {
        // A bad scrape must not erase a good snapshot.
        if jobs.is_empty() {
            debug!(company_id = company.id.as_str(), "No jobs scraped, snapshot left as is");
            return Ok(JobAlertOutcome::default());
        }

        let prior: Option<JobSnapshot> = self.snapshots.get(&company.id).await?;
        let first_check = prior.is_none();
        let new_jobs: Vec<JobPosting> = match &prior {
            Some(snapshot) => {
                let seen: HashSet<&str> = snapshot.jobs.iter().map(|j| j.id.as_str()).collect();
                jobs.iter().filter(|j| !seen.contains(j.id.as_str())).cloned().collect()
            }
            None => jobs.to_vec(),
        };

        let snapshot = JobSnapshot {
            company_id: company.id.clone(),
            last_checked: now,
            jobs: jobs.to_vec(),
        };
        let snapshot_written = match self.snapshots.set(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                warn!(company_id = company.id.as_str(), error = %e, "Job snapshot save failed");
                false
            }
        };

        let alerts = if company.job_alert_enabled {
            self.score_new_jobs(company, global, &new_jobs, now)
        } else {
            Vec::new()
        };

        info!(
            company_id = company.id.as_str(),
            scraped = jobs.len(),
            new = new_jobs.len(),
            alerts = alerts.len(),
            first_check,
            "Job alert check complete"
        );

        Ok(JobAlertOutcome {
            alerts,
            new_jobs,
            first_check,
            snapshot_written,
        })
    }

    fn score_new_jobs(
        &self,
        company: &MonitoredCompany,
        global: &JobPreferences,
        new_jobs: &[JobPosting],
        now: DateTime<Utc>,
    ) -> Vec<FeedItem> {
        let preferences = JobPreferences::merged(company.job_preferences.as_ref(), global);
        new_jobs
            .iter()
            .filter_map(|job| {
                let result = self.matcher.score(job, &preferences);
                if result.score < self.config.match_score_cutoff {
                    debug!(job_id = job.id.as_str(), score = result.score, "Below match cutoff");
                    return None;
                }
                Some(FeedItem::new(
                    FeedPayload::JobAlert(JobAlertPayload {
                        company_id: company.id.clone(),
                        company_name: company.name.clone(),
                        job_id: job.id.clone(),
                        job_title: job.title.clone(),
                        job_url: job.url.clone(),
                        location: job.location.clone(),
                        match_score: result.score,
                        match_reasons: result.reasons,
                    }),
                    now,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::KeywordMatcher;
    use crate::testing::*;
    use watchfeed_store::MemoryStore;

    fn detector() -> (JobAlertDetector, SnapshotStore) {
        let snapshots = SnapshotStore::new(Arc::new(MemoryStore::new()));
        let detector = JobAlertDetector::new(
            snapshots.clone(),
            Arc::new(KeywordMatcher),
            MonitorConfig::default(),
        );
        (detector, snapshots)
    }

    fn alert_ids(outcome: &JobAlertOutcome) -> Vec<String> {
        outcome
            .alerts
            .iter()
            .map(|item| match &item.payload {
                FeedPayload::JobAlert(p) => p.job_id.clone(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn first_check_treats_every_job_as_new() {
        let (detector, _) = detector();
        let company = company_with_keywords("c1", "Acme", &["senior", "engineer"]);
        let jobs = vec![job("j1", "Senior Software Engineer", 1), job("j2", "Junior Developer", 1)];

        let outcome = detector
            .detect(&company, &JobPreferences::default(), &jobs, Utc::now())
            .await
            .unwrap();

        assert!(outcome.first_check);
        assert_eq!(outcome.new_jobs.len(), 2);
        assert_eq!(alert_ids(&outcome), vec!["j1".to_string()]);
    }

    #[tokio::test]
    async fn only_unseen_ids_are_new() {
        let (detector, _) = detector();
        let company = company_with_keywords("c1", "Acme", &["engineer"]);
        let now = Utc::now();

        detector
            .detect(&company, &JobPreferences::default(), &[job("j1", "Engineer", 1)], now)
            .await
            .unwrap();
        let outcome = detector
            .detect(
                &company,
                &JobPreferences::default(),
                &[job("j1", "Engineer", 1), job("j2", "Platform Engineer", 0)],
                now,
            )
            .await
            .unwrap();

        assert!(!outcome.first_check);
        assert_eq!(alert_ids(&outcome), vec!["j2".to_string()]);
    }

    #[tokio::test]
    async fn empty_scrape_keeps_existing_snapshot() {
        let (detector, snapshots) = detector();
        let company = company_with_keywords("c1", "Acme", &["engineer"]);
        let now = Utc::now();
        detector
            .detect(&company, &JobPreferences::default(), &[job("j1", "Engineer", 1)], now)
            .await
            .unwrap();

        let outcome = detector
            .detect(&company, &JobPreferences::default(), &[], now)
            .await
            .unwrap();
        assert!(outcome.alerts.is_empty());
        assert!(!outcome.snapshot_written);

        let snap: JobSnapshot = snapshots.get("c1").await.unwrap().unwrap();
        assert_eq!(snap.jobs.len(), 1);
    }

    #[tokio::test]
    async fn disabled_alerts_still_diff_and_snapshot() {
        let (detector, snapshots) = detector();
        let mut company = company_with_keywords("c1", "Acme", &["engineer"]);
        company.job_alert_enabled = false;

        let outcome = detector
            .detect(&company, &JobPreferences::default(), &[job("j1", "Engineer", 1)], Utc::now())
            .await
            .unwrap();

        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.new_jobs.len(), 1);
        assert!(snapshots.get::<JobSnapshot>("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn global_preferences_apply_without_override() {
        let (detector, _) = detector();
        let company = company("c1", "Acme");
        let global = JobPreferences {
            keywords: vec!["designer".into()],
            ..Default::default()
        };

        let outcome = detector
            .detect(
                &company,
                &global,
                &[job("j1", "Product Designer", 1), job("j2", "Accountant", 1)],
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(alert_ids(&outcome), vec!["j1".to_string()]);
    }
}
