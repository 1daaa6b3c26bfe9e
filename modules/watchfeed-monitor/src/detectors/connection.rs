use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use watchfeed_common::{
    normalize_profile_url, Connection, ConnectionPath, ConnectionUpdatePayload, FeedItem, FeedPayload,
};
use watchfeed_store::{AcceptanceLedger, PathStore};

use super::warm_path::WarmPathDetector;

/// One unconnected path step whose person now shows up as a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceCandidate {
    pub path_id: String,
    pub step_index: usize,
    pub connection: Connection,
}

/// Notices accepted connection requests along tracked paths.
///
/// `apply` notifies first and reconciles the path best-effort: a path or
/// step that no longer exists still produces the feed item.
pub struct ConnectionAcceptanceDetector {
    paths: PathStore,
    ledger: AcceptanceLedger,
    warm_path: WarmPathDetector,
}

impl ConnectionAcceptanceDetector {
    pub fn new(paths: PathStore, ledger: AcceptanceLedger, warm_path: WarmPathDetector) -> Self {
        Self {
            paths,
            ledger,
            warm_path,
        }
    }

    /// Every (path, step) pair where an unconnected step's person is in
    /// `connections` and the pair has not been logged before.
    pub async fn detect(
        &self,
        paths: &[ConnectionPath],
        connections: &[Connection],
    ) -> Vec<AcceptanceCandidate> {
        let by_url: HashMap<String, &Connection> = connections
            .iter()
            .map(|c| (normalize_profile_url(&c.profile_url), c))
            .collect();

        let mut candidates = Vec::new();
        for path in paths {
            for (step_index, step) in path.steps.iter().enumerate() {
                if step.connected {
                    continue;
                }
                let url = normalize_profile_url(&step.profile_url);
                let Some(connection) = by_url.get(&url) else {
                    continue;
                };
                if self.already_logged(&path.id, &url).await {
                    continue;
                }
                candidates.push(AcceptanceCandidate {
                    path_id: path.id.clone(),
                    step_index,
                    connection: Connection {
                        name: if connection.name.is_empty() {
                            step.name.clone()
                        } else {
                            connection.name.clone()
                        },
                        ..(*connection).clone()
                    },
                });
            }
        }
        candidates
    }

    /// Log one acceptance: update the path, emit the connection update, append
    /// the ledger key, then try the warm-path check for the same person.
    ///
    /// Returns the items to publish; never fails.
    pub async fn apply(&self, candidate: &AcceptanceCandidate, now: DateTime<Utc>) -> Vec<FeedItem> {
        let updated = self.mark_step(candidate, now).await;

        let person_name = candidate.connection.name.clone();
        let (message, path_complete) = match &updated {
            Some(path) if path.is_complete => (
                format!(
                    "{person_name} accepted your request. Your path to {} is complete!",
                    path.target_name
                ),
                true,
            ),
            Some(path) => (
                format!(
                    "{person_name} accepted your request ({}/{} steps toward {})",
                    path.completed_steps, path.total_steps, path.target_name
                ),
                false,
            ),
            None => (format!("{person_name} accepted your connection request"), false),
        };

        let mut items = vec![FeedItem::new(
            FeedPayload::ConnectionUpdate(ConnectionUpdatePayload {
                path_id: candidate.path_id.clone(),
                person_name,
                person_url: normalize_profile_url(&candidate.connection.profile_url),
                step_index: candidate.step_index,
                path_complete,
                message,
            }),
            now,
        )];

        if let Err(e) = self
            .ledger
            .record(&candidate.path_id, &candidate.connection.profile_url, now)
            .await
        {
            warn!(path_id = candidate.path_id.as_str(), error = %e, "Acceptance ledger append failed");
        }

        match self.warm_path.check(&candidate.connection, now).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    person = candidate.connection.profile_url.as_str(),
                    error = %e,
                    "Warm path check after acceptance failed"
                );
            }
        }

        info!(
            path_id = candidate.path_id.as_str(),
            step = candidate.step_index,
            path_complete,
            "Connection acceptance logged"
        );
        items
    }

    /// Mark the step connected and persist. `None` when the path or step is
    /// gone; the caller still notifies.
    async fn mark_step(&self, candidate: &AcceptanceCandidate, now: DateTime<Utc>) -> Option<ConnectionPath> {
        let mut path = match self.paths.get(&candidate.path_id).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(path_id = candidate.path_id.as_str(), "Acceptance for unknown path");
                return None;
            }
            Err(e) => {
                warn!(path_id = candidate.path_id.as_str(), error = %e, "Path load failed");
                return None;
            }
        };

        if !path.mark_connected(candidate.step_index, now) {
            warn!(
                path_id = candidate.path_id.as_str(),
                step = candidate.step_index,
                steps = path.steps.len(),
                "Acceptance for out-of-range step"
            );
            return None;
        }

        if let Err(e) = self.paths.save(path.clone()).await {
            warn!(path_id = path.id.as_str(), error = %e, "Path save failed");
        }
        Some(path)
    }

    async fn already_logged(&self, path_id: &str, person_url: &str) -> bool {
        match self.ledger.contains(path_id, person_url).await {
            Ok(found) => found,
            Err(e) => {
                warn!(path_id, error = %e, "Acceptance ledger read failed, treating as new");
                false
            }
        }
    }
}
