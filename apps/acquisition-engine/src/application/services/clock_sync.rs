//! Clock & Latency Synchronizer
//!
//! Estimates the remote clock offset and round trip from a handful of probes
//! and waits for instants on the remote clock.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::TimeProbe;
use crate::config::SyncConfig;
use crate::domain::scheduling::{ProbeSample, SyncEstimate, estimate_from_samples};

/// Clock synchronizer owned by one execution.
pub struct ClockSynchronizer {
    probe: Arc<dyn TimeProbe>,
    probe_count: usize,
    default_rtt_ms: u64,
    spin_threshold: Duration,
    estimate: SyncEstimate,
}

impl ClockSynchronizer {
    /// Create a synchronizer. Until `measure` or `seed` is called the
    /// estimate is the conservative fallback.
    #[must_use]
    pub fn new(probe: Arc<dyn TimeProbe>, config: &SyncConfig) -> Self {
        Self {
            probe,
            probe_count: config.probe_count.max(1),
            default_rtt_ms: config.default_rtt_ms,
            spin_threshold: Duration::from_millis(config.spin_threshold_ms),
            estimate: SyncEstimate::fallback(config.default_rtt_ms, Utc::now()),
        }
    }

    /// Start from an earlier estimate, e.g. one taken by another coordinator.
    pub const fn seed(&mut self, estimate: SyncEstimate) {
        self.estimate = estimate;
    }

    /// Current estimate.
    #[must_use]
    pub const fn estimate(&self) -> SyncEstimate {
        self.estimate
    }

    /// Probe the remote and keep the median-RTT estimate.
    ///
    /// Never fails: if every probe fails the conservative fallback is used.
    pub async fn measure(&mut self) -> SyncEstimate {
        let mut samples = Vec::with_capacity(self.probe_count);

        for _ in 0..self.probe_count {
            let sent_at = Utc::now();
            match self.probe.server_time().await {
                Ok(server_time) => samples.push(ProbeSample {
                    sent_at,
                    received_at: Utc::now(),
                    server_time,
                }),
                Err(e) => tracing::debug!(error = %e, "Time probe failed"),
            }
        }

        self.estimate = estimate_from_samples(&samples, Utc::now()).unwrap_or_else(|| {
            tracing::warn!(
                probes = self.probe_count,
                default_rtt_ms = self.default_rtt_ms,
                "All time probes failed, using fallback estimate"
            );
            SyncEstimate::fallback(self.default_rtt_ms, Utc::now())
        });

        tracing::info!(
            offset_ms = self.estimate.offset_ms,
            rtt_ms = self.estimate.rtt_ms,
            samples = samples.len(),
            source = ?self.estimate.source,
            "Clock synchronized"
        );

        self.estimate
    }

    /// Local time adjusted to the remote clock.
    #[must_use]
    pub fn synchronized_now(&self) -> DateTime<Utc> {
        self.estimate.apply(Utc::now())
    }

    /// Remote-clock instant to send at so a request arrives at `target`.
    #[must_use]
    pub fn send_instant(&self, target: DateTime<Utc>) -> DateTime<Utc> {
        self.estimate.send_instant(target)
    }

    /// Suspend until `synchronized_now() >= instant`.
    ///
    /// Sleeps while far away and polls for the last `spin_threshold`.
    pub async fn wait_until(&self, instant: DateTime<Utc>) {
        loop {
            let remaining = instant - self.synchronized_now();
            let Ok(remaining) = remaining.to_std() else {
                return;
            };
            if remaining.is_zero() {
                return;
            }
            if remaining > self.spin_threshold {
                tokio::time::sleep(remaining - self.spin_threshold).await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }
}
