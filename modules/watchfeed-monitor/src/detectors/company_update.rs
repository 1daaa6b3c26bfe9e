use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use watchfeed_common::{
    CompanyPost, CompanySnapshot, CompanyUpdatePayload, FeedItem, FeedPayload, MonitorConfig,
    MonitoredCompany,
};
use watchfeed_store::{FeedStore, SnapshotStore};

/// Turns new company page posts into feed items.
///
/// The first observation of a company only records a baseline. Later checks
/// emit posts that are new since the snapshot and at most `update_window_days`
/// old, oldest first, so that prepending leaves the newest at the top.
pub struct CompanyUpdateDetector {
    snapshots: SnapshotStore,
    feed: FeedStore,
    config: MonitorConfig,
}

impl CompanyUpdateDetector {
    pub fn new(snapshots: SnapshotStore, feed: FeedStore, config: MonitorConfig) -> Self {
        Self {
            snapshots,
            feed,
            config,
        }
    }

    pub async fn detect(
        &self,
        company: &MonitoredCompany,
        updates: &[CompanyPost],
        now: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>> {
        if updates.is_empty() {
            debug!(company_id = company.id.as_str(), "No updates scraped, snapshot left as is");
            return Ok(Vec::new());
        }

        let prior: Option<CompanySnapshot> = self.snapshots.get(&company.id).await?;

        let items = match &prior {
            None => {
                info!(
                    company_id = company.id.as_str(),
                    updates = updates.len(),
                    "Company update baseline recorded"
                );
                Vec::new()
            }
            Some(snapshot) => self.new_items(company, snapshot, updates, now).await,
        };

        let snapshot = CompanySnapshot {
            company_id: company.id.clone(),
            last_checked: now,
            updates: updates.to_vec(),
        };
        if let Err(e) = self.snapshots.set(&snapshot).await {
            warn!(company_id = company.id.as_str(), error = %e, "Company snapshot save failed");
        }

        Ok(items)
    }

    async fn new_items(
        &self,
        company: &MonitoredCompany,
        prior: &CompanySnapshot,
        updates: &[CompanyPost],
        now: DateTime<Utc>,
    ) -> Vec<FeedItem> {
        let seen: HashSet<&str> = prior.updates.iter().map(|u| u.id.as_str()).collect();
        let since = now - self.config.update_window();

        let mut fresh: Vec<&CompanyPost> = updates
            .iter()
            .filter(|u| !seen.contains(u.id.as_str()))
            .filter(|u| u.timestamp >= since)
            .collect();
        fresh.sort_by_key(|u| u.timestamp);

        let mut items = Vec::with_capacity(fresh.len());
        for update in fresh {
            if self.already_in_feed(&company.id, &update.url).await {
                debug!(company_id = company.id.as_str(), url = update.url.as_str(), "Update already in feed");
                continue;
            }
            items.push(FeedItem::new(
                FeedPayload::CompanyUpdate(CompanyUpdatePayload {
                    company_id: company.id.clone(),
                    company_name: company.name.clone(),
                    update_id: update.id.clone(),
                    preview: update.preview.clone(),
                    source_url: update.url.clone(),
                    posted_at: update.timestamp,
                }),
                now,
            ));
        }

        info!(
            company_id = company.id.as_str(),
            scraped = updates.len(),
            emitted = items.len(),
            "Company update check complete"
        );
        items
    }

    async fn already_in_feed(&self, company_id: &str, source_url: &str) -> bool {
        match self.feed.has_company_update(company_id, source_url).await {
            Ok(found) => found,
            Err(e) => {
                warn!(company_id, error = %e, "Company update dedup scan failed, treating as new");
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

    fn detector() -> (CompanyUpdateDetector, SnapshotStore, FeedStore) {
        let kv = Arc::new(MemoryStore::new());
        let snapshots = SnapshotStore::new(kv.clone());
        let feed = FeedStore::new(kv);
        (
            CompanyUpdateDetector::new(snapshots.clone(), feed.clone(), MonitorConfig::default()),
            snapshots,
            feed,
        )
    }

    fn ids(items: &[FeedItem]) -> Vec<String> {
        items
            .iter()
            .map(|i| match &i.payload {
                FeedPayload::CompanyUpdate(p) => p.update_id.clone(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn first_observation_is_baseline_only() {
        let (detector, snapshots, _) = detector();
        let acme = company("c1", "Acme");
        let items = detector
            .detect(&acme, &[post("u1", 1), post("u2", 0)], Utc::now())
            .await
            .unwrap();

        assert!(items.is_empty());
        let snap: CompanySnapshot = snapshots.get("c1").await.unwrap().unwrap();
        assert_eq!(snap.updates.len(), 2);
    }

    #[tokio::test]
    async fn empty_scrape_is_a_no_op() {
        let (detector, snapshots, _) = detector();
        let items = detector.detect(&company("c1", "Acme"), &[], Utc::now()).await.unwrap();
        assert!(items.is_empty());
        assert!(snapshots.get::<CompanySnapshot>("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_updates_come_oldest_first() {
        let (detector, _, _) = detector();
        let acme = company("c1", "Acme");
        let now = Utc::now();
        detector.detect(&acme, &[post("u1", 3)], now).await.unwrap();

        let items = detector
            .detect(&acme, &[post("u3", 0), post("u2", 2), post("u1", 3)], now)
            .await
            .unwrap();
        assert_eq!(ids(&items), vec!["u2".to_string(), "u3".to_string()]);
    }

    #[tokio::test]
    async fn old_unseen_updates_are_dropped() {
        let (detector, _, _) = detector();
        let acme = company("c1", "Acme");
        let now = Utc::now();
        detector.detect(&acme, &[post("u1", 1)], now).await.unwrap();

        let items = detector
            .detect(&acme, &[post("u1", 1), post("old", 20)], now)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn identical_input_twice_yields_nothing_new() {
        let (detector, _, _) = detector();
        let acme = company("c1", "Acme");
        let now = Utc::now();
        detector.detect(&acme, &[post("u1", 1)], now).await.unwrap();

        let input = [post("u1", 1), post("u2", 0)];
        assert_eq!(detector.detect(&acme, &input, now).await.unwrap().len(), 1);
        assert!(detector.detect(&acme, &input, now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_already_in_feed_is_skipped() {
        let (detector, _, feed) = detector();
        let acme = company("c1", "Acme");
        let now = Utc::now();
        detector.detect(&acme, &[post("u1", 1)], now).await.unwrap();

        let update = post("u2", 0);
        feed.insert(FeedItem::new(
            FeedPayload::CompanyUpdate(CompanyUpdatePayload {
                company_id: "c1".into(),
                company_name: "Acme".into(),
                update_id: "u2".into(),
                preview: update.preview.clone(),
                source_url: update.url.clone(),
                posted_at: update.timestamp,
            }),
            now,
        ))
        .await
        .unwrap();

        let items = detector.detect(&acme, &[post("u1", 1), update], now).await.unwrap();
        assert!(items.is_empty());
    }
}
