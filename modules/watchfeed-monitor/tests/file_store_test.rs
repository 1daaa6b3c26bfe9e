//! Cycles against the on-disk JSON store the CLI uses.

use std::sync::Arc;

use watchfeed_common::FeedItemKind;
use watchfeed_monitor::fixture::FixtureScraper;
use watchfeed_monitor::testing::*;
use watchfeed_monitor::{Monitor, MonitorDeps, PageScraper, PageVisit};
use watchfeed_store::{FeedStore, JsonFileStore, KeyValueStore, WatchlistStore};

#[tokio::test]
async fn state_survives_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("watchfeed.json");

    {
        let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&store_path));
        WatchlistStore::new(kv.clone())
            .upsert_company(company_with_keywords("c1", "Acme Corp", &["engineer"]))
            .await
            .unwrap();

        let scraper = FixtureScraper::from_json(
            r#"{"jobs": {"c1": [
                {"id": "j1", "title": "Platform Engineer", "url": "https://www.linkedin.com/jobs/view/j1"}
            ]}}"#,
        )
        .unwrap();
        let monitor = Monitor::new(
            MonitorDeps::builder()
                .kv(kv)
                .scraper(Arc::new(scraper) as Arc<dyn PageScraper>)
                .build(),
        )
        .unwrap();

        let report = monitor
            .handle_visit(&PageVisit::new("https://www.linkedin.com/company/acme-corp/jobs/"))
            .await;
        assert_eq!(report.published, 1);
    }

    let reopened: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&store_path));
    let stats = FeedStore::new(reopened.clone()).stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.by_kind.get(&FeedItemKind::JobAlert), Some(&1));

    let acme = WatchlistStore::new(reopened).company("c1").await.unwrap().unwrap();
    assert!(acme.last_checked.is_some());
}
