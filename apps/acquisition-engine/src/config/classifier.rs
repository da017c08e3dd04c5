//! Marker table for the response classifier.

use serde::{Deserialize, Serialize};

use crate::domain::acquisition::MarkerTable;
use crate::domain::acquisition::markers::{
    DEFAULT_COUNTDOWN_PATTERNS, DEFAULT_FAILURE_PATHS, DEFAULT_HELD_MARKERS,
    DEFAULT_TRANSIENT_MARKERS, DEFAULT_WAIT_MARKERS,
};

/// Classifier configuration. Every list defaults to the built-in markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Address fragments of failure views.
    #[serde(default = "default_failure_paths")]
    pub failure_paths: Vec<String>,
    /// "Come back later" phrases.
    #[serde(default = "default_wait_markers")]
    pub wait_markers: Vec<String>,
    /// Regexes for a time or countdown.
    #[serde(default = "default_countdown_patterns")]
    pub countdown_patterns: Vec<String>,
    /// "Someone else has it" phrases.
    #[serde(default = "default_held_markers")]
    pub held_markers: Vec<String>,
    /// Generic failure phrases.
    #[serde(default = "default_transient_markers")]
    pub transient_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            failure_paths: default_failure_paths(),
            wait_markers: default_wait_markers(),
            countdown_patterns: default_countdown_patterns(),
            held_markers: default_held_markers(),
            transient_markers: default_transient_markers(),
        }
    }
}

impl ClassifierConfig {
    /// Compile the marker table.
    pub fn marker_table(&self) -> Result<MarkerTable, regex::Error> {
        MarkerTable::new(
            self.failure_paths.as_slice(),
            self.wait_markers.as_slice(),
            self.countdown_patterns.as_slice(),
            self.held_markers.as_slice(),
            self.transient_markers.as_slice(),
        )
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_failure_paths() -> Vec<String> {
    owned(DEFAULT_FAILURE_PATHS)
}

fn default_wait_markers() -> Vec<String> {
    owned(DEFAULT_WAIT_MARKERS)
}

fn default_countdown_patterns() -> Vec<String> {
    owned(DEFAULT_COUNTDOWN_PATTERNS)
}

fn default_held_markers() -> Vec<String> {
    owned(DEFAULT_HELD_MARKERS)
}

fn default_transient_markers() -> Vec<String> {
    owned(DEFAULT_TRANSIENT_MARKERS)
}
