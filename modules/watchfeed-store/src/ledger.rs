// Dedup ledgers: "already notified" markers.
//
// AcceptanceLedger: unbounded, append-only, keyed by (path_id, person_url).
// WarmPathLedger: rows keyed by (company_url, person_url, path_length) with a
// creation time. Lookup ignores rows older than the window; rows are never
// extended, a fresh emission appends a fresh row.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use watchfeed_common::{normalize_profile_url, LoggedAcceptance, WarmPathDedupeEntry, WarmPathKey};

use crate::kv::{read_json, write_json, KeyValueStore};

const ACCEPTANCES_KEY: &str = "ledger.acceptances";
const WARM_PATHS_KEY: &str = "ledger.warm_paths";

// ---------------------------------------------------------------------------
// AcceptanceLedger
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AcceptanceLedger {
    kv: Arc<dyn KeyValueStore>,
}

impl AcceptanceLedger {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn entries(&self) -> Result<Vec<LoggedAcceptance>> {
        Ok(read_json(self.kv.as_ref(), ACCEPTANCES_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn contains(&self, path_id: &str, person_url: &str) -> Result<bool> {
        let person_url = normalize_profile_url(person_url);
        Ok(self
            .entries()
            .await?
            .iter()
            .any(|e| e.path_id == path_id && e.person_url == person_url))
    }

    /// Append a key. Recording an existing key is a no-op.
    pub async fn record(&self, path_id: &str, person_url: &str, now: DateTime<Utc>) -> Result<()> {
        let person_url = normalize_profile_url(person_url);
        let mut entries = self.entries().await?;
        if entries
            .iter()
            .any(|e| e.path_id == path_id && e.person_url == person_url)
        {
            return Ok(());
        }
        entries.push(LoggedAcceptance {
            path_id: path_id.to_string(),
            person_url,
            logged_at: now,
        });
        write_json(self.kv.as_ref(), ACCEPTANCES_KEY, &entries).await
    }
}

// ---------------------------------------------------------------------------
// WarmPathLedger
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct WarmPathLedger {
    kv: Arc<dyn KeyValueStore>,
}

impl WarmPathLedger {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn entries(&self) -> Result<Vec<WarmPathDedupeEntry>> {
        Ok(read_json(self.kv.as_ref(), WARM_PATHS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Most recent row for `key` younger than `window` at `now`.
    pub async fn find_recent(
        &self,
        key: &WarmPathKey,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<WarmPathDedupeEntry>> {
        let key = canonical_key(key);
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.key == key && now - e.created_at < window)
            .max_by_key(|e| e.created_at))
    }

    /// Append a new row. Rows older than `window` are dropped in the same write;
    /// lookups already ignore them so dedup behavior is unchanged.
    pub async fn record(&self, key: &WarmPathKey, now: DateTime<Utc>, window: Duration) -> Result<()> {
        let mut entries = self.entries().await?;
        let before = entries.len();
        entries.retain(|e| now - e.created_at < window);
        let purged = before - entries.len();

        entries.push(WarmPathDedupeEntry {
            key: canonical_key(key),
            created_at: now,
        });
        write_json(self.kv.as_ref(), WARM_PATHS_KEY, &entries).await?;

        if purged > 0 {
            debug!(purged, "Expired warm path ledger rows dropped");
        }
        Ok(())
    }

    /// Drop every row older than `window`. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize> {
        let mut entries = self.entries().await?;
        let before = entries.len();
        entries.retain(|e| now - e.created_at < window);
        let purged = before - entries.len();
        if purged > 0 {
            write_json(self.kv.as_ref(), WARM_PATHS_KEY, &entries).await?;
        }
        Ok(purged)
    }
}

fn canonical_key(key: &WarmPathKey) -> WarmPathKey {
    WarmPathKey {
        company_url: normalize_profile_url(&key.company_url),
        person_url: normalize_profile_url(&key.person_url),
        path_length: key.path_length,
    }
}
