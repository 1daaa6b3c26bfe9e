use std::sync::Arc;

use anyhow::Result;

use watchfeed_common::ConnectionPath;

use crate::kv::{read_json, write_json, KeyValueStore};

const PATHS_KEY: &str = "paths";

/// In-progress connection paths, stored as one list.
#[derive(Clone)]
pub struct PathStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PathStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn list(&self) -> Result<Vec<ConnectionPath>> {
        Ok(read_json(self.kv.as_ref(), PATHS_KEY).await?.unwrap_or_default())
    }

    pub async fn get(&self, id: &str) -> Result<Option<ConnectionPath>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    /// Insert or replace by id.
    pub async fn save(&self, path: ConnectionPath) -> Result<()> {
        let mut paths = self.list().await?;
        match paths.iter_mut().find(|p| p.id == path.id) {
            Some(existing) => *existing = path,
            None => paths.push(path),
        }
        write_json(self.kv.as_ref(), PATHS_KEY, &paths).await
    }

    /// Insert a new path. Returns false, leaving the store untouched, when
    /// the id is already taken.
    pub async fn add(&self, path: ConnectionPath) -> Result<bool> {
        let mut paths = self.list().await?;
        if paths.iter().any(|p| p.id == path.id) {
            return Ok(false);
        }
        paths.push(path);
        write_json(self.kv.as_ref(), PATHS_KEY, &paths).await?;
        Ok(true)
    }

    pub async fn remove(&self, id: &str) -> Result<bool> {
        let mut paths = self.list().await?;
        let before = paths.len();
        paths.retain(|p| p.id != id);
        if paths.len() == before {
            return Ok(false);
        }
        write_json(self.kv.as_ref(), PATHS_KEY, &paths).await?;
        Ok(true)
    }
}
