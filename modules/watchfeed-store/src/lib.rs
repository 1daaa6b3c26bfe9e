//! Persistence for watchfeed on top of an async key-value substrate.
//!
//! Every typed store holds an `Arc<dyn KeyValueStore>` and does plain
//! get-then-set. Nothing here is transactional: concurrent cycles may
//! interleave and the last write wins.

pub mod feed;
pub mod kv;
pub mod ledger;
pub mod paths;
pub mod snapshots;
pub mod watchlist;

pub use feed::FeedStore;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use ledger::{AcceptanceLedger, WarmPathLedger};
pub use paths::PathStore;
pub use snapshots::{Snapshot, SnapshotStore};
pub use watchlist::{find_by_name, WatchlistStore};
