pub mod detectors;
pub mod fixture;
pub mod matcher;
pub mod monitor;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use matcher::KeywordMatcher;
pub use monitor::{Monitor, MonitorDeps, PageVisit};
pub use stats::{CycleReport, CycleTarget};
pub use traits::{JobMatcher, MatchResult, PageScraper};
