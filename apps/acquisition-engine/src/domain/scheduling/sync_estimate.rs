//! Clock offset / round-trip estimate and send-instant math.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    /// Median of live probes.
    Probed,
    /// Every probe failed; conservative default RTT, zero offset.
    Fallback,
}

/// Estimated remote clock offset and round-trip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEstimate {
    /// Remote clock minus local clock, in milliseconds.
    pub offset_ms: i64,
    /// Round-trip time in milliseconds.
    pub rtt_ms: u64,
    /// When the estimate was taken (local clock).
    pub measured_at: DateTime<Utc>,
    /// Probed or fallback.
    pub source: SyncSource,
}

impl SyncEstimate {
    /// Fallback estimate used when no probe succeeds.
    #[must_use]
    pub const fn fallback(default_rtt_ms: u64, measured_at: DateTime<Utc>) -> Self {
        Self {
            offset_ms: 0,
            rtt_ms: default_rtt_ms,
            measured_at,
            source: SyncSource::Fallback,
        }
    }

    /// Remote time corresponding to the given local time.
    #[must_use]
    pub fn apply(&self, local: DateTime<Utc>) -> DateTime<Utc> {
        local + Duration::milliseconds(self.offset_ms)
    }

    /// How early to send so the request lands at the target.
    #[must_use]
    pub fn send_offset(&self) -> Duration {
        Duration::milliseconds(send_offset_ms(self.rtt_ms) as i64)
    }

    /// Instant (remote clock) at which to send for arrival at `target`.
    #[must_use]
    pub fn send_instant(&self, target: DateTime<Utc>) -> DateTime<Utc> {
        target - self.send_offset()
    }
}

/// One-way latency estimate: half the round trip, rounded down.
#[must_use]
pub const fn send_offset_ms(rtt_ms: u64) -> u64 {
    rtt_ms / 2
}

/// One time probe: local send/receive times and the server's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSample {
    /// Local time the probe was sent.
    pub sent_at: DateTime<Utc>,
    /// Local time the response arrived.
    pub received_at: DateTime<Utc>,
    /// Timestamp reported by the server.
    pub server_time: DateTime<Utc>,
}

impl ProbeSample {
    /// Round trip in milliseconds (zero if the local clock went backwards).
    #[must_use]
    pub fn rtt_ms(&self) -> u64 {
        (self.received_at - self.sent_at).num_milliseconds().max(0) as u64
    }

    /// Server time minus the local midpoint of the round trip.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        let midpoint = self.sent_at + Duration::milliseconds((self.rtt_ms() / 2) as i64);
        (self.server_time - midpoint).num_milliseconds()
    }
}

/// Estimate from the median-RTT sample, suppressing tail latency.
///
/// Returns `None` if there are no samples.
#[must_use]
pub fn estimate_from_samples(
    samples: &[ProbeSample],
    measured_at: DateTime<Utc>,
) -> Option<SyncEstimate> {
    let mut sorted: Vec<&ProbeSample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.rtt_ms());
    let median = sorted.get(sorted.len() / 2)?;

    Some(SyncEstimate {
        offset_ms: median.offset_ms(),
        rtt_ms: median.rtt_ms(),
        measured_at,
        source: SyncSource::Probed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample(rtt_ms: i64, offset_ms: i64) -> ProbeSample {
        let sent_at = t0();
        let received_at = sent_at + Duration::milliseconds(rtt_ms);
        let server_time = sent_at + Duration::milliseconds(rtt_ms / 2 + offset_ms);
        ProbeSample {
            sent_at,
            received_at,
            server_time,
        }
    }

    #[test]
    fn sample_offset_uses_midpoint() {
        let s = sample(100, 250);
        assert_eq!(s.rtt_ms(), 100);
        assert_eq!(s.offset_ms(), 250);
    }

    #[test]
    fn median_sample_wins() {
        let samples = [
            sample(40, 10),
            sample(900, 5000),
            sample(60, 20),
            sample(50, 15),
            sample(45, 12),
        ];
        let estimate = estimate_from_samples(&samples, t0()).unwrap();
        assert_eq!(estimate.rtt_ms, 50);
        assert_eq!(estimate.offset_ms, 15);
        assert_eq!(estimate.source, SyncSource::Probed);
    }

    #[test]
    fn no_samples_no_estimate() {
        assert!(estimate_from_samples(&[], t0()).is_none());
    }

    #[test]
    fn fallback_has_zero_offset() {
        let estimate = SyncEstimate::fallback(300, t0());
        assert_eq!(estimate.apply(t0()), t0());
        assert_eq!(estimate.send_offset(), Duration::milliseconds(150));
    }

    #[test]
    fn odd_rtt_rounds_down() {
        assert_eq!(send_offset_ms(101), 50);
        assert_eq!(send_offset_ms(1), 0);
    }

    proptest! {
        #[test]
        fn send_instant_never_after_target(rtt in 0u64..=1000, millis in 0i64..86_400_000) {
            let estimate = SyncEstimate {
                offset_ms: 0,
                rtt_ms: rtt,
                measured_at: t0(),
                source: SyncSource::Probed,
            };
            let target = t0() + Duration::milliseconds(millis);
            let send_at = estimate.send_instant(target);

            prop_assert_eq!(send_offset_ms(rtt), rtt / 2);
            prop_assert_eq!(target - send_at, Duration::milliseconds((rtt / 2) as i64));
            prop_assert!(send_at <= target);
        }
    }
}
