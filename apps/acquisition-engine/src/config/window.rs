//! Reservation window rule.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::domain::scheduling::WindowRule;

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Local clock time the window opens, `HH:MM` or `HH:MM:SS`.
    #[serde(default = "default_open_time")]
    pub open_time: String,
    /// Days ahead of the target date the window opens.
    #[serde(default = "default_lead_days")]
    pub lead_days: u32,
    /// IANA timezone of the remote service.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            open_time: default_open_time(),
            lead_days: default_lead_days(),
            timezone: default_timezone(),
        }
    }
}

impl WindowConfig {
    /// Parse into a window rule.
    pub fn rule(&self) -> Result<WindowRule, ConfigError> {
        let open_time = NaiveTime::parse_from_str(&self.open_time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&self.open_time, "%H:%M"))
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "window.open_time '{}' is not HH:MM: {e}",
                    self.open_time
                ))
            })?;
        let timezone: Tz = self.timezone.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "window.timezone '{}' is not a known timezone: {e}",
                self.timezone
            ))
        })?;
        Ok(WindowRule::new(open_time, self.lead_days, timezone))
    }
}

fn default_open_time() -> String {
    "08:00".to_string()
}

const fn default_lead_days() -> u32 {
    6
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}
