//! Change detectors.
//!
//! Each detector takes current scraped data plus the prior snapshot and
//! returns candidate feed items. Detectors never publish: the orchestrator
//! forwards candidates to the feed store, which re-checks dedup. "No signal"
//! is an empty return, not an error.

pub mod company_update;
pub mod connection;
pub mod hiring_heat;
pub mod job_alert;
pub mod person_insight;
pub mod warm_path;

pub use company_update::CompanyUpdateDetector;
pub use connection::{AcceptanceCandidate, ConnectionAcceptanceDetector};
pub use hiring_heat::HiringHeatDetector;
pub use job_alert::{JobAlertDetector, JobAlertOutcome};
pub use person_insight::PersonInsightDetector;
pub use warm_path::WarmPathDetector;

/// Cut `text` to at most `limit` characters, appending "..." when cut.
pub(crate) fn truncate_text(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit).collect();
    format!("{}...", cut.trim_end())
}
