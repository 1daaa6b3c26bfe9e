use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use watchfeed_common::{
    normalize_profile_url, Connection, FeedItem, FeedPayload, MonitorConfig, WarmPathKey,
    WarmPathPayload,
};
use watchfeed_store::{find_by_name, WarmPathLedger, WatchlistStore};

/// A first-degree connection who works at the company. Two-hop "bridge"
/// paths are not detected.
pub const DIRECT_PATH_LENGTH: u8 = 1;

/// Signals that a newly accepted connection works at a watched company.
pub struct WarmPathDetector {
    watchlist: WatchlistStore,
    ledger: WarmPathLedger,
    config: MonitorConfig,
}

impl WarmPathDetector {
    pub fn new(watchlist: WatchlistStore, ledger: WarmPathLedger, config: MonitorConfig) -> Self {
        Self {
            watchlist,
            ledger,
            config,
        }
    }

    /// Check one new connection. Records a ledger row when an item is returned.
    pub async fn check(&self, connection: &Connection, now: DateTime<Utc>) -> Result<Option<FeedItem>> {
        let Some(employer) = connection.company.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
            debug!(person = connection.profile_url.as_str(), "No employer known, no warm path");
            return Ok(None);
        };

        let companies = self.watchlist.companies().await?;
        let Some(company) = find_by_name(&companies, employer) else {
            return Ok(None);
        };

        let key = WarmPathKey {
            company_url: normalize_profile_url(&company.company_url),
            person_url: normalize_profile_url(&connection.profile_url),
            path_length: DIRECT_PATH_LENGTH,
        };
        let window = self.config.warm_path_window();

        match self.ledger.find_recent(&key, now, window).await {
            Ok(Some(entry)) => {
                debug!(
                    company_id = company.id.as_str(),
                    person = key.person_url.as_str(),
                    since = %entry.created_at,
                    "Warm path already reported in window"
                );
                return Ok(None);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Warm path ledger lookup failed, treating as new");
            }
        }

        let item = FeedItem::new(
            FeedPayload::WarmPath(WarmPathPayload {
                company_id: company.id.clone(),
                company_name: company.name.clone(),
                company_url: company.company_url.clone(),
                company_logo: company.logo_url.clone(),
                connector_name: connection.name.clone(),
                connector_url: connection.profile_url.clone(),
                connector_title: connection.title.clone(),
                connector_photo: connection.photo_url.clone(),
                path_length: DIRECT_PATH_LENGTH,
            }),
            now,
        );

        if let Err(e) = self.ledger.record(&key, now, window).await {
            warn!(error = %e, "Warm path ledger append failed");
        }

        info!(
            company_id = company.id.as_str(),
            connector = connection.name.as_str(),
            "Warm path found"
        );
        Ok(Some(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::Duration;
    use std::sync::Arc;
    use watchfeed_store::MemoryStore;

    async fn detector() -> WarmPathDetector {
        let kv = Arc::new(MemoryStore::new());
        let watchlist = WatchlistStore::new(kv.clone());
        let mut acme = company("c1", "Acme Corp");
        acme.logo_url = Some("https://cdn.example.com/acme.png".into());
        watchlist.upsert_company(acme).await.unwrap();
        WarmPathDetector::new(watchlist, WarmPathLedger::new(kv), MonitorConfig::default())
    }

    #[tokio::test]
    async fn match_uses_watchlist_identity() {
        let detector = detector().await;
        let alice = connection("alice", "Alice", Some("ACME corp"));

        let item = detector.check(&alice, Utc::now()).await.unwrap().unwrap();
        match item.payload {
            FeedPayload::WarmPath(p) => {
                assert_eq!(p.company_name, "Acme Corp");
                assert_eq!(p.company_url, "https://www.linkedin.com/company/acme-corp/");
                assert_eq!(p.company_logo.as_deref(), Some("https://cdn.example.com/acme.png"));
                assert_eq!(p.connector_name, "Alice");
                assert_eq!(p.path_length, 1);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_employer_is_no_signal() {
        let detector = detector().await;
        assert!(detector.check(&connection("a", "A", None), Utc::now()).await.unwrap().is_none());
        assert!(detector.check(&connection("a", "A", Some("  ")), Utc::now()).await.unwrap().is_none());
        assert!(detector.check(&connection("a", "A", Some("Acme")), Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn one_item_per_window() {
        let detector = detector().await;
        let alice = connection("alice", "Alice", Some("Acme Corp"));
        let start = Utc::now();

        assert!(detector.check(&alice, start).await.unwrap().is_some());
        assert!(detector.check(&alice, start + Duration::days(29)).await.unwrap().is_none());
        assert!(detector.check(&alice, start + Duration::days(31)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn ledger_failure_fails_open() {
        let kv = Arc::new(FlakyStore::new().fail_reads_of("ledger."));
        let watchlist = WatchlistStore::new(kv.clone());
        watchlist.upsert_company(company("c1", "Acme Corp")).await.unwrap();
        let detector = WarmPathDetector::new(watchlist, WarmPathLedger::new(kv), MonitorConfig::default());

        let alice = connection("alice", "Alice", Some("Acme Corp"));
        assert!(detector.check(&alice, Utc::now()).await.unwrap().is_some());
    }
}
