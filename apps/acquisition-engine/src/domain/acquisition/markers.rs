//! Text-marker table for classifying failure views.
//!
//! Everything here is plain string and regex work with no waits: failure
//! views dominate the seconds before the window opens, and each millisecond
//! spent here is a millisecond not spent reloading.
//!
//! # Precedence
//!
//! | Check | Outcome |
//! |-------|---------|
//! | wait marker AND countdown marker | `TooEarly` |
//! | held-by-another marker | `HeldByOther` |
//! | generic failure marker | `TransientError` |
//! | none of the above | `Unrecognized` |

use regex::Regex;

use super::classification::Classification;

/// Address fragments that identify a failure view.
pub const DEFAULT_FAILURE_PATHS: &[&str] = &["/error", "/unavailable"];

/// Phrases telling the visitor to come back later.
pub const DEFAULT_WAIT_MARKERS: &[&str] = &["wait", "check back", "not yet open"];

/// Patterns that look like a countdown or an opening time.
pub const DEFAULT_COUNTDOWN_PATTERNS: &[&str] = &[
    r"\b\d+\s*(?:s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?)\b",
    r"\b\d{1,2}:\d{2}(?::\d{2})?\b",
    r"countdown",
    r"\bopens?\s+(?:at|in)\b",
];

/// Phrases meaning another party holds the unit right now.
pub const DEFAULT_HELD_MARKERS: &[&str] = &[
    "in progress by another",
    "another member",
    "another user",
    "being reserved by",
    "currently being booked",
];

/// Phrases of a generic, recognizable failure.
pub const DEFAULT_TRANSIENT_MARKERS: &[&str] = &[
    "error",
    "try again",
    "unavailable",
    "went wrong",
    "timed out",
    "expired",
];

/// Compiled marker table.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    failure_paths: Vec<String>,
    wait_markers: Vec<String>,
    countdown_patterns: Vec<Regex>,
    held_markers: Vec<String>,
    transient_markers: Vec<String>,
}

impl MarkerTable {
    /// Build a table. Markers match case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if a countdown pattern is not a valid regex.
    pub fn new<S: AsRef<str>>(
        failure_paths: &[S],
        wait_markers: &[S],
        countdown_patterns: &[S],
        held_markers: &[S],
        transient_markers: &[S],
    ) -> Result<Self, regex::Error> {
        let countdown_patterns = countdown_patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            failure_paths: lowered(failure_paths),
            wait_markers: lowered(wait_markers),
            countdown_patterns,
            held_markers: lowered(held_markers),
            transient_markers: lowered(transient_markers),
        })
    }

    /// Table built from the `DEFAULT_*` marker lists.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the default patterns are valid.
    pub fn defaults() -> Result<Self, regex::Error> {
        Self::new(
            DEFAULT_FAILURE_PATHS,
            DEFAULT_WAIT_MARKERS,
            DEFAULT_COUNTDOWN_PATTERNS,
            DEFAULT_HELD_MARKERS,
            DEFAULT_TRANSIENT_MARKERS,
        )
    }

    /// Returns true if the view address is on a known failure path.
    #[must_use]
    pub fn is_failure_address(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        self.failure_paths.iter().any(|p| address.contains(p.as_str()))
    }

    /// Classify the text of a failure view.
    #[must_use]
    pub fn classify_failure_text(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();

        let has_wait = self.wait_markers.iter().any(|m| lower.contains(m.as_str()));
        if has_wait && self.countdown_patterns.iter().any(|re| re.is_match(&lower)) {
            return Classification::TooEarly;
        }
        if self.held_markers.iter().any(|m| lower.contains(m.as_str())) {
            return Classification::HeldByOther;
        }
        if self
            .transient_markers
            .iter()
            .any(|m| lower.contains(m.as_str()))
        {
            return Classification::TransientError;
        }
        Classification::Unrecognized
    }
}

fn lowered<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.as_ref().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
