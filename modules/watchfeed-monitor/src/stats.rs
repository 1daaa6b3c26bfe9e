use std::collections::BTreeMap;
use std::fmt;

use watchfeed_common::FeedItemKind;

/// What a page visit resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CycleTarget {
    Company { id: String, name: String },
    Person { id: String, name: String },
    Connections,
    #[default]
    Unmatched,
}

impl fmt::Display for CycleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleTarget::Company { id, name } => write!(f, "company {name} ({id})"),
            CycleTarget::Person { id, name } => write!(f, "person {name} ({id})"),
            CycleTarget::Connections => write!(f, "connections"),
            CycleTarget::Unmatched => write!(f, "unmatched page"),
        }
    }
}

/// Stats from one monitoring cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub target: CycleTarget,
    pub candidates: BTreeMap<FeedItemKind, usize>,
    pub published: usize,
    pub duplicates_refused: usize,
    pub publish_failures: usize,
    pub failed_detectors: Vec<String>,
}

impl CycleReport {
    pub fn new(target: CycleTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn total_candidates(&self) -> usize {
        self.candidates.values().sum()
    }

    pub(crate) fn count_candidate(&mut self, kind: FeedItemKind) {
        *self.candidates.entry(kind).or_default() += 1;
    }

    pub(crate) fn detector_failed(&mut self, name: &str) {
        self.failed_detectors.push(name.to_string());
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Monitor Cycle Complete ===")?;
        writeln!(f, "Target:             {}", self.target)?;
        writeln!(f, "Candidates:         {}", self.total_candidates())?;
        writeln!(f, "Published:          {}", self.published)?;
        writeln!(f, "Duplicates refused: {}", self.duplicates_refused)?;
        if self.publish_failures > 0 {
            writeln!(f, "Publish failures:   {}", self.publish_failures)?;
        }
        if !self.candidates.is_empty() {
            writeln!(f, "\nBy type:")?;
            for (kind, count) in &self.candidates {
                writeln!(f, "  {:<18} {count}", kind.to_string())?;
            }
        }
        if !self.failed_detectors.is_empty() {
            writeln!(f, "\nFailed detectors: {}", self.failed_detectors.join(", "))?;
        }
        Ok(())
    }
}
