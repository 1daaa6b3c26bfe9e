use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use watchfeed_common::{CompanySnapshot, JobSnapshot, PersonSnapshot};

use crate::kv::{read_json, write_json, KeyValueStore};

/// A per-entity observation that is replaced wholesale on every check.
pub trait Snapshot: Serialize + DeserializeOwned + Send + Sync {
    const KEY_PREFIX: &'static str;

    fn entity_id(&self) -> &str;

    fn storage_key(entity_id: &str) -> String {
        format!("{}.{}", Self::KEY_PREFIX, entity_id)
    }
}

impl Snapshot for JobSnapshot {
    const KEY_PREFIX: &'static str = "snapshot.jobs";

    fn entity_id(&self) -> &str {
        &self.company_id
    }
}

impl Snapshot for CompanySnapshot {
    const KEY_PREFIX: &'static str = "snapshot.company";

    fn entity_id(&self) -> &str {
        &self.company_id
    }
}

impl Snapshot for PersonSnapshot {
    const KEY_PREFIX: &'static str = "snapshot.person";

    fn entity_id(&self) -> &str {
        &self.person_id
    }
}

/// Last-observed state per entity. Absence means "first-time check".
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn get<S: Snapshot>(&self, entity_id: &str) -> Result<Option<S>> {
        read_json(self.kv.as_ref(), &S::storage_key(entity_id)).await
    }

    pub async fn set<S: Snapshot>(&self, snapshot: &S) -> Result<()> {
        write_json(self.kv.as_ref(), &S::storage_key(snapshot.entity_id()), snapshot).await
    }
}
