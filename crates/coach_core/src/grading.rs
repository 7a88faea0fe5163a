use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Summary derived from the text a run printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestVerdict {
    #[default]
    Unknown,
    AllPassed,
    SomeFailed,
}

/// Decides whether a run's output counts as the expected output.
pub trait OutputComparator: Send + Sync + fmt::Debug {
    fn matches(&self, actual: &str, expected: &str) -> bool;
}

/// Leading/trailing whitespace is ignored, everything else must be identical.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactTrimComparator;

impl OutputComparator for ExactTrimComparator {
    fn matches(&self, actual: &str, expected: &str) -> bool {
        actual.trim() == expected.trim()
    }
}

/// All whitespace is ignored, so `[[2, 2, 3], [7]]` equals `[[2,2,3],[7]]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceInsensitiveComparator;

impl OutputComparator for WhitespaceInsensitiveComparator {
    fn matches(&self, actual: &str, expected: &str) -> bool {
        let strip = |text: &str| text.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        strip(actual) == strip(expected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparatorKind {
    #[default]
    ExactTrim,
    WhitespaceInsensitive,
}

impl ComparatorKind {
    pub fn build(self) -> Arc<dyn OutputComparator> {
        match self {
            ComparatorKind::ExactTrim => Arc::new(ExactTrimComparator),
            ComparatorKind::WhitespaceInsensitive => Arc::new(WhitespaceInsensitiveComparator),
        }
    }
}

/// Scans run output line by line for a failure marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictScanner {
    marker: String,
    case_sensitive: bool,
}

pub const DEFAULT_FAILURE_MARKER: &str = "FAIL";

impl Default for VerdictScanner {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_MARKER, false)
    }
}

impl VerdictScanner {
    pub fn new(marker: impl Into<String>, case_sensitive: bool) -> Self {
        let marker = marker.into();
        let marker = if case_sensitive {
            marker
        } else {
            marker.to_lowercase()
        };
        Self {
            marker,
            case_sensitive,
        }
    }

    pub fn scan(&self, output: &str) -> TestVerdict {
        let failed = output.lines().any(|line| {
            if self.case_sensitive {
                line.contains(&self.marker)
            } else {
                line.to_lowercase().contains(&self.marker)
            }
        });
        if failed {
            TestVerdict::SomeFailed
        } else {
            TestVerdict::AllPassed
        }
    }
}

/// What a hint request does once every hint is already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HintPolicy {
    #[default]
    StopAtLast,
    RevealSolution,
}

/// Grading choices handed to every exercise session.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub comparator: Arc<dyn OutputComparator>,
    pub scanner: VerdictScanner,
    pub hint_policy: HintPolicy,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            comparator: Arc::new(ExactTrimComparator),
            scanner: VerdictScanner::default(),
            hint_policy: HintPolicy::default(),
        }
    }
}
