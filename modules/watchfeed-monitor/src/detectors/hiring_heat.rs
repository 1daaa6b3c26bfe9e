use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use watchfeed_common::{
    FeedItem, FeedItemKind, FeedPayload, HeatLevel, HiringHeatPayload, JobPosting, MonitorConfig,
    MonitoredCompany,
};
use watchfeed_store::FeedStore;

/// Titles counted as internship / early-career roles.
pub const INTERNSHIP_KEYWORDS: &[&str] = &[
    "intern",
    "internship",
    "junior",
    "entry level",
    "entry-level",
    "graduate",
    "new grad",
    "apprentice",
    "co-op",
    "trainee",
];

pub fn is_internship_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    INTERNSHIP_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Flags companies posting many new roles inside the job window.
pub struct HiringHeatDetector {
    feed: FeedStore,
    config: MonitorConfig,
}

impl HiringHeatDetector {
    pub fn new(feed: FeedStore, config: MonitorConfig) -> Self {
        Self { feed, config }
    }

    pub fn classify(&self, new_job_count: usize) -> Option<HeatLevel> {
        if new_job_count >= self.config.very_hot_threshold {
            Some(HeatLevel::VeryHot)
        } else if new_job_count >= self.config.hot_threshold {
            Some(HeatLevel::Hot)
        } else if new_job_count >= self.config.min_new_jobs {
            Some(HeatLevel::Warming)
        } else {
            None
        }
    }

    /// `current_jobs` is the full scrape; `new_jobs` is what the job-alert
    /// diff found absent from the prior snapshot (everything on a first check).
    pub async fn detect(
        &self,
        company: &MonitoredCompany,
        current_jobs: &[JobPosting],
        new_jobs: &[JobPosting],
        now: DateTime<Utc>,
    ) -> Option<FeedItem> {
        let since = now - self.config.job_window();
        let is_recent = |job: &JobPosting| job.posted_at.is_some_and(|at| at >= since);

        let recent: HashSet<&str> = current_jobs
            .iter()
            .filter(|j| is_recent(j))
            .map(|j| j.id.as_str())
            .collect();
        if recent.len() < self.config.min_new_jobs {
            return None;
        }

        let fresh: Vec<&JobPosting> = new_jobs
            .iter()
            .filter(|j| recent.contains(j.id.as_str()))
            .collect();
        let heat_level = self.classify(fresh.len())?;

        if self.already_reported(&company.id, since).await {
            debug!(company_id = company.id.as_str(), "Hiring heat already reported in window");
            return None;
        }

        let (internships, others): (Vec<&JobPosting>, Vec<&JobPosting>) =
            fresh.iter().copied().partition(|j| is_internship_title(&j.title));
        let top_job_titles: Vec<String> = internships
            .iter()
            .chain(others.iter())
            .take(self.config.max_top_titles)
            .map(|j| j.title.clone())
            .collect();

        info!(
            company_id = company.id.as_str(),
            heat = %heat_level,
            new_jobs = fresh.len(),
            internships = internships.len(),
            "Hiring heat detected"
        );

        Some(FeedItem::new(
            FeedPayload::HiringHeat(HiringHeatPayload {
                company_id: company.id.clone(),
                company_name: company.name.clone(),
                heat_level,
                job_count: fresh.len(),
                internship_count: internships.len(),
                top_job_titles,
                window_days: self.config.job_window_days,
            }),
            now,
        ))
    }

    /// Existing hiring-heat item for this company inside the window.
    /// A failed scan counts as "not reported" so a real signal is not lost.
    async fn already_reported(&self, company_id: &str, since: DateTime<Utc>) -> bool {
        match self
            .feed
            .has_recent_of_kind_for_company(FeedItemKind::HiringHeat, company_id, since)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(company_id, error = %e, "Hiring heat dedup scan failed, treating as new");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::sync::Arc;
    use watchfeed_store::MemoryStore;

    fn detector() -> (HiringHeatDetector, FeedStore) {
        let feed = FeedStore::new(Arc::new(MemoryStore::new()));
        (HiringHeatDetector::new(feed.clone(), MonitorConfig::default()), feed)
    }

    fn recent_jobs(count: usize) -> Vec<JobPosting> {
        (0..count).map(|i| job(&format!("j{i}"), &format!("Engineer {i}"), 1)).collect()
    }

    fn heat_of(item: &FeedItem) -> &HiringHeatPayload {
        match &item.payload {
            FeedPayload::HiringHeat(p) => p,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn tiers_at_exact_thresholds() {
        let acme = company("c1", "Acme");
        for (count, expected) in [
            (2, None),
            (3, Some(HeatLevel::Warming)),
            (5, Some(HeatLevel::Warming)),
            (6, Some(HeatLevel::Hot)),
            (9, Some(HeatLevel::Hot)),
            (10, Some(HeatLevel::VeryHot)),
        ] {
            let (detector, _) = detector();
            let jobs = recent_jobs(count);
            let item = detector.detect(&acme, &jobs, &jobs, Utc::now()).await;
            assert_eq!(item.as_ref().map(|i| heat_of(i).heat_level), expected, "count={count}");
        }
    }

    #[tokio::test]
    async fn stale_postings_do_not_count() {
        let (detector, _) = detector();
        let jobs = vec![
            job("a", "Engineer", 1),
            job("b", "Engineer", 2),
            job("c", "Engineer", 10),
            job("d", "Engineer", 30),
        ];
        assert!(detector.detect(&company("c1", "Acme"), &jobs, &jobs, Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn undated_postings_are_not_recent() {
        let (detector, _) = detector();
        let mut jobs = recent_jobs(3);
        jobs[0].posted_at = None;
        assert!(detector.detect(&company("c1", "Acme"), &jobs, &jobs, Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn only_new_recent_jobs_count() {
        let (detector, _) = detector();
        let jobs = recent_jobs(5);
        // Three were already in the prior snapshot.
        let new_jobs = jobs[3..].to_vec();
        assert!(detector.detect(&company("c1", "Acme"), &jobs, &new_jobs, Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn internships_lead_top_titles() {
        let (detector, _) = detector();
        let jobs = vec![
            job("a", "Staff Engineer", 1),
            job("b", "Product Manager", 1),
            job("c", "Software Engineering Intern", 1),
            job("d", "Junior Analyst", 1),
        ];
        let item = detector.detect(&company("c1", "Acme"), &jobs, &jobs, Utc::now()).await.unwrap();
        let heat = heat_of(&item);
        assert_eq!(heat.internship_count, 2);
        assert_eq!(
            heat.top_job_titles,
            vec![
                "Software Engineering Intern".to_string(),
                "Junior Analyst".to_string(),
                "Staff Engineer".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn existing_item_in_window_suppresses() {
        let (detector, feed) = detector();
        let acme = company("c1", "Acme");
        let jobs = recent_jobs(3);
        let now = Utc::now();

        let first = detector.detect(&acme, &jobs, &jobs, now).await.unwrap();
        feed.insert(first).await.unwrap();

        assert!(detector.detect(&acme, &jobs, &jobs, now).await.is_none());
        assert!(detector
            .detect(&company("c2", "Globex"), &jobs, &jobs, now)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn failed_scan_fails_open() {
        let store = Arc::new(FlakyStore::new().fail_reads_of("feed."));
        let detector = HiringHeatDetector::new(FeedStore::new(store), MonitorConfig::default());
        let jobs = recent_jobs(3);
        assert!(detector.detect(&company("c1", "Acme"), &jobs, &jobs, Utc::now()).await.is_some());
    }
}
