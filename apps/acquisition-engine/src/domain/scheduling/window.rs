//! Reservation window open-time calculation.
//!
//! A date D becomes reservable at `open_clock_time` on `D - lead_days`, in the
//! remote service's timezone. The instant is resolved per calendar date so a
//! daylight-saving change between today and the open date is honored.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;

/// How to fire the first request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Window already open: go now.
    Immediate,
    /// Window opens later: time the first request to land at `execute_at`.
    Precision {
        /// Window open instant.
        execute_at: DateTime<Utc>,
    },
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "immediate"),
            Self::Precision { execute_at } => write!(f, "precision@{}", execute_at.to_rfc3339()),
        }
    }
}

/// Strategy plus the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Chosen strategy.
    pub strategy: ExecutionStrategy,
    /// Window open instant for the target date.
    pub open_instant: DateTime<Utc>,
    /// Human-readable reasoning, for logs.
    pub justification: String,
}

/// Fixed lead-time / open-clock-time rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRule {
    open_clock_time: NaiveTime,
    lead_days: u32,
    timezone: Tz,
}

impl WindowRule {
    /// Create a rule.
    #[must_use]
    pub const fn new(open_clock_time: NaiveTime, lead_days: u32, timezone: Tz) -> Self {
        Self {
            open_clock_time,
            lead_days,
            timezone,
        }
    }

    /// Remote timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Calendar date (remote timezone) on which `target` opens.
    #[must_use]
    pub fn open_date(&self, target: NaiveDate) -> NaiveDate {
        target
            .checked_sub_days(Days::new(u64::from(self.lead_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Exact instant `target` becomes reservable.
    #[must_use]
    pub fn open_instant(&self, target: NaiveDate) -> DateTime<Utc> {
        let local = self.open_date(target).and_time(self.open_clock_time);

        match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(t) => t.with_timezone(&Utc),
            // Fall-back overlap: the first occurrence.
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            // Spring-forward gap: keep the pre-transition offset, which lands
            // the instant the same distance past the jump.
            LocalResult::None => {
                let before = local - Duration::hours(6);
                let offset = self
                    .timezone
                    .offset_from_local_datetime(&before)
                    .earliest()
                    .map_or(0, |o| o.fix().local_minus_utc());
                Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset))))
            }
        }
    }

    /// Decide the strategy for `target` given the synchronized current time.
    #[must_use]
    pub fn plan(&self, target: NaiveDate, now: DateTime<Utc>) -> ExecutionPlan {
        let open_instant = self.open_instant(target);

        if now >= open_instant {
            ExecutionPlan {
                strategy: ExecutionStrategy::Immediate,
                open_instant,
                justification: format!(
                    "window for {target} opened at {} ({} ago)",
                    open_instant.to_rfc3339(),
                    humanize(now - open_instant)
                ),
            }
        } else {
            ExecutionPlan {
                strategy: ExecutionStrategy::Precision {
                    execute_at: open_instant,
                },
                open_instant,
                justification: format!(
                    "window for {target} opens at {} {} ({} local, in {})",
                    self.open_date(target),
                    self.open_clock_time.format("%H:%M"),
                    self.timezone,
                    humanize(open_instant - now)
                ),
            }
        }
    }
}

fn humanize(d: Duration) -> String {
    let secs = d.num_seconds();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}ms", d.num_milliseconds())
    }
}
