//! Submission form and redirect interpretation.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::shared::ConfirmationId;

/// Default pattern for a confirmation redirect; group 1 is the confirmation id.
pub const DEFAULT_CONFIRMATION_PATTERN: &str = r"/confirmation/([A-Za-z0-9-]+)";

/// Default address fragments of an error redirect.
pub const DEFAULT_ERROR_REDIRECTS: &[&str] = &["/error"];

/// Ordered form-encoded fields of the final write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionForm {
    fields: Vec<(String, String)>,
}

impl SubmissionForm {
    /// Create an empty form.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Append several fields, keeping their order.
    pub fn extend<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in fields {
            self.push(k, v);
        }
    }

    /// Value of the first field with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Raw response to the submission write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` of the redirect, if any.
    pub redirect: Option<String>,
}

/// Interpreted submission outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionVerdict {
    /// Redirected to a confirmation page.
    Confirmed(ConfirmationId),
    /// Anything else.
    Rejected(String),
}

/// Rules mapping a redirect target to a verdict.
#[derive(Debug, Clone)]
pub struct RedirectRules {
    confirmation: Regex,
    error_paths: Vec<String>,
}

impl RedirectRules {
    /// Build rules from a confirmation pattern (group 1 captures the id).
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn new<S: AsRef<str>>(
        confirmation_pattern: &str,
        error_paths: &[S],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            confirmation: Regex::new(confirmation_pattern)?,
            error_paths: error_paths
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        })
    }

    /// Rules built from the defaults.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the default pattern is valid.
    pub fn defaults() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_CONFIRMATION_PATTERN, DEFAULT_ERROR_REDIRECTS)
    }

    /// Interpret the submission response.
    #[must_use]
    pub fn interpret(&self, response: &SubmissionResponse) -> SubmissionVerdict {
        let Some(location) = response.redirect.as_deref() else {
            return SubmissionVerdict::Rejected(format!(
                "no redirect (status {})",
                response.status
            ));
        };

        let lower = location.to_lowercase();
        if self.error_paths.iter().any(|p| lower.contains(p.as_str())) {
            return SubmissionVerdict::Rejected(format!("redirected to error page {location}"));
        }

        match self
            .confirmation
            .captures(location)
            .and_then(|caps| caps.get(1))
        {
            Some(id) if !id.as_str().is_empty() => {
                SubmissionVerdict::Confirmed(ConfirmationId::new(id.as_str()))
            }
            _ => SubmissionVerdict::Rejected(format!("unexpected redirect {location}")),
        }
    }
}
