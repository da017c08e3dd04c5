//! Remote booking service endpoints and field names.

use serde::{Deserialize, Serialize};

use crate::domain::acquisition::submission::{DEFAULT_CONFIRMATION_PATTERN, DEFAULT_ERROR_REDIRECTS};

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://book.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Lightweight time probe endpoint.
    #[serde(default = "default_time_path")]
    pub time_path: String,
    /// JSON field holding the server time in epoch milliseconds. When the
    /// body lacks it, the `Date` header is used.
    #[serde(default = "default_time_field")]
    pub time_field: String,
    /// Login endpoint.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Login form username field.
    #[serde(default = "default_username_field")]
    pub username_field: String,
    /// Login form password field.
    #[serde(default = "default_password_field")]
    pub password_field: String,
    /// Candidate view template. `{unit}`, `{date}` and `{time}` are replaced.
    #[serde(default = "default_candidate_path")]
    pub candidate_path: String,
    /// Token endpoint.
    #[serde(default = "default_token_path")]
    pub token_path: String,
    /// Submission endpoint.
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
    /// Hold release template (`{hold_id}`), if the service offers one.
    #[serde(default)]
    pub release_path: Option<String>,
    /// Hidden field carrying the hold id.
    #[serde(default = "default_hold_field")]
    pub hold_field: String,
    /// Hidden fields carrying participant identity, copied into the submission.
    #[serde(default = "default_identity_fields")]
    pub identity_fields: Vec<String>,
    /// Form field name of the minted token.
    #[serde(default = "default_token_field")]
    pub token_field: String,
    /// Redirect pattern of a confirmed submission; group 1 is the id.
    #[serde(default = "default_confirmation_pattern")]
    pub confirmation_pattern: String,
    /// Redirect fragments of a rejected submission.
    #[serde(default = "default_error_redirects")]
    pub error_redirects: Vec<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Every unit the service offers, in fallback order for "accept any".
    #[serde(default)]
    pub all_units: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            time_path: default_time_path(),
            time_field: default_time_field(),
            login_path: default_login_path(),
            username_field: default_username_field(),
            password_field: default_password_field(),
            candidate_path: default_candidate_path(),
            token_path: default_token_path(),
            submit_path: default_submit_path(),
            release_path: None,
            hold_field: default_hold_field(),
            identity_fields: default_identity_fields(),
            token_field: default_token_field(),
            confirmation_pattern: default_confirmation_pattern(),
            error_redirects: default_error_redirects(),
            request_timeout_ms: default_request_timeout_ms(),
            all_units: Vec::new(),
        }
    }
}

impl RemoteConfig {
    /// Absolute URL for a path on the remote service.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_time_path() -> String {
    "/api/time".to_string()
}

fn default_time_field() -> String {
    "epoch_ms".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_candidate_path() -> String {
    "/reserve/{unit}/{date}/{time}".to_string()
}

fn default_token_path() -> String {
    "/api/token".to_string()
}

fn default_submit_path() -> String {
    "/reservations".to_string()
}

fn default_hold_field() -> String {
    "hold_id".to_string()
}

fn default_identity_fields() -> Vec<String> {
    vec!["member_ref".to_string()]
}

fn default_token_field() -> String {
    "token".to_string()
}

fn default_confirmation_pattern() -> String {
    DEFAULT_CONFIRMATION_PATTERN.to_string()
}

fn default_error_redirects() -> Vec<String> {
    DEFAULT_ERROR_REDIRECTS.iter().map(|s| (*s).to_string()).collect()
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}
