// Feed store: the ordered sink every detector writes to.
//
// Items are kept newest-first under one key. Inserts prepend and refuse an
// item whose dedup key is already present (prevention-before-insert; nothing
// is ever deleted to repair a duplicate). Read state is the only field that
// changes after insert.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use watchfeed_common::{FeedItem, FeedItemKind, FeedPayload, FeedStats};

use crate::kv::{read_json, write_json, KeyValueStore};

const FEED_KEY: &str = "feed.items";

#[derive(Clone)]
pub struct FeedStore {
    kv: Arc<dyn KeyValueStore>,
}

impl FeedStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// All items, newest first.
    pub async fn list(&self) -> Result<Vec<FeedItem>> {
        Ok(read_json(self.kv.as_ref(), FEED_KEY).await?.unwrap_or_default())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<FeedItem>> {
        Ok(self.list().await?.into_iter().find(|i| i.id == id))
    }

    async fn save(&self, items: &[FeedItem]) -> Result<()> {
        write_json(self.kv.as_ref(), FEED_KEY, items).await
    }

    /// Prepend `item` unless an item with the same dedup key already exists.
    /// Returns whether the item was accepted.
    pub async fn insert(&self, item: FeedItem) -> Result<bool> {
        let mut items = self.list().await?;
        if let Some(key) = item.dedup_key() {
            if items.iter().any(|existing| existing.dedup_key().as_deref() == Some(key.as_str())) {
                debug!(key = key.as_str(), "Feed insert refused: duplicate");
                return Ok(false);
            }
        }
        info!(kind = %item.kind(), id = %item.id, "Feed item added");
        items.insert(0, item);
        self.save(&items).await?;
        Ok(true)
    }

    /// Set the read flag. Returns false when no item has this id.
    pub async fn set_read(&self, id: Uuid, read: bool) -> Result<bool> {
        let mut items = self.list().await?;
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        if item.read == read {
            return Ok(true);
        }
        item.read = read;
        self.save(&items).await?;
        Ok(true)
    }

    /// Flip the read flag. Returns the new state, or `None` for an unknown id.
    pub async fn toggle_read(&self, id: Uuid) -> Result<Option<bool>> {
        let mut items = self.list().await?;
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        item.read = !item.read;
        let now_read = item.read;
        self.save(&items).await?;
        Ok(Some(now_read))
    }

    /// Mark every item read. Returns how many changed.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let mut items = self.list().await?;
        let mut changed = 0;
        for item in items.iter_mut().filter(|i| !i.read) {
            item.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.save(&items).await?;
        }
        Ok(changed)
    }

    /// Remove one item. Returns false when no item has this id.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut items = self.list().await?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.save(&items).await?;
        Ok(true)
    }

    pub async fn stats(&self) -> Result<FeedStats> {
        Ok(FeedStats::from_items(&self.list().await?))
    }

    // --- Dedup scans ---

    /// Is there an item of `kind` about `company_id` stamped at or after `since`?
    pub async fn has_recent_of_kind_for_company(
        &self,
        kind: FeedItemKind,
        company_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.list().await?.iter().any(|item| {
            item.kind() == kind && item.company_id() == Some(company_id) && item.timestamp >= since
        }))
    }

    /// Is there a company update for `company_id` pointing at `source_url`?
    pub async fn has_company_update(&self, company_id: &str, source_url: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|item| match &item.payload {
            FeedPayload::CompanyUpdate(p) => p.company_id == company_id && p.source_url == source_url,
            _ => false,
        }))
    }
}
