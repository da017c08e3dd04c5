//! Process Reservations Use Case
//!
//! Pulls pending requests from the store, runs each as an independent
//! coordinator task, and writes the outcomes back. The only state shared
//! between tasks is a read-only seed of the last clock estimate.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::execute_reservation::ExecuteReservationUseCase;
use crate::application::ports::{
    CredentialDecryptor, OutcomeUpdate, ProtocolSubmitter, RequestStatus, ReservationStore,
    SessionFactory, StoreError, TimeProbe,
};
use crate::domain::reservation::ExecutionResult;
use crate::domain::scheduling::{SyncEstimate, SyncSource};
use crate::domain::shared::RequestId;

/// One processed request.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRequest {
    /// Request id.
    pub request_id: RequestId,
    /// Status written back to the store.
    pub status: RequestStatus,
    /// Caller-level retry counter after this run.
    pub retry_count: u32,
    /// The execution result.
    pub result: ExecutionResult,
}

/// Outcome of one processing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Every request run in this pass.
    pub processed: Vec<ProcessedRequest>,
    /// Tasks that panicked.
    pub crashed: usize,
    /// Requests the store refused to mark in progress; left for the next pass.
    pub skipped: usize,
}

impl BatchReport {
    /// Number of requests with the given status.
    #[must_use]
    pub fn count(&self, status: RequestStatus) -> usize {
        self.processed.iter().filter(|p| p.status == status).count()
    }
}

/// Use case running every pending request once.
pub struct ProcessReservationsUseCase<F, S, P, D, R>
where
    F: SessionFactory + 'static,
    S: ProtocolSubmitter + 'static,
    P: TimeProbe + 'static,
    D: CredentialDecryptor + 'static,
    R: ReservationStore,
{
    executor: Arc<ExecuteReservationUseCase<F, S, P, D>>,
    store: Arc<R>,
    max_request_attempts: u32,
    last_sync: RwLock<Option<SyncEstimate>>,
}

impl<F, S, P, D, R> ProcessReservationsUseCase<F, S, P, D, R>
where
    F: SessionFactory + 'static,
    S: ProtocolSubmitter + 'static,
    P: TimeProbe + 'static,
    D: CredentialDecryptor + 'static,
    R: ReservationStore,
{
    /// Create a new ProcessReservationsUseCase.
    pub fn new(
        executor: Arc<ExecuteReservationUseCase<F, S, P, D>>,
        store: Arc<R>,
        max_request_attempts: u32,
    ) -> Self {
        Self {
            executor,
            store,
            max_request_attempts: max_request_attempts.max(1),
            last_sync: RwLock::new(None),
        }
    }

    /// Last probed clock estimate, if any.
    #[must_use]
    pub fn last_sync(&self) -> Option<SyncEstimate> {
        *self.last_sync.read()
    }

    /// Run every pending request once and write back the results.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<BatchReport, StoreError> {
        let pending = self.store.pending().await?;
        if pending.is_empty() {
            tracing::debug!("No pending reservation requests");
            return Ok(BatchReport::default());
        }

        tracing::info!(count = pending.len(), "Processing reservation requests");

        let seed = self.last_sync();
        let mut tasks = JoinSet::new();

        let mut report = BatchReport::default();
        for stored in pending {
            if let Err(e) = self.store.mark_in_progress(&stored.request.id).await {
                tracing::error!(
                    request_id = %stored.request.id,
                    error = %e,
                    "Failed to mark request in progress, skipping"
                );
                report.skipped += 1;
                continue;
            }

            let executor = Arc::clone(&self.executor);
            let cancel = cancel.child_token();
            tasks.spawn(async move {
                let execution = executor.execute(&stored.request, seed, &cancel).await;
                (stored, execution)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (stored, execution) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(error = %e, "Reservation task failed");
                    report.crashed += 1;
                    continue;
                }
            };

            if execution.sync.source == SyncSource::Probed {
                *self.last_sync.write() = Some(execution.sync);
            }

            let result = execution.result;
            let (status, retry_count) = next_status(
                result.is_success(),
                execution.cancelled,
                stored.retry_count,
                self.max_request_attempts,
            );

            let update = OutcomeUpdate {
                status,
                retry_count,
                message: result.reason().to_string(),
                confirmation_id: result.confirmation_id().cloned(),
                acquired_unit: result.acquired_unit().cloned(),
            };
            if let Err(e) = self.store.record_outcome(&stored.request.id, update).await {
                tracing::error!(request_id = %stored.request.id, error = %e, "Failed to record outcome");
            }

            tracing::info!(
                request_id = %stored.request.id,
                status = ?status,
                retry_count,
                "Request processed"
            );

            report.processed.push(ProcessedRequest {
                request_id: stored.request.id.clone(),
                status,
                retry_count,
                result,
            });
        }

        Ok(report)
    }
}

/// Status and retry counter to write back after one execution.
///
/// A cancelled execution goes back to the queue without spending an attempt.
const fn next_status(
    succeeded: bool,
    cancelled: bool,
    retry_count: u32,
    max_attempts: u32,
) -> (RequestStatus, u32) {
    if succeeded {
        return (RequestStatus::Succeeded, retry_count);
    }
    if cancelled {
        return (RequestStatus::Pending, retry_count);
    }
    let retry_count = retry_count + 1;
    if retry_count >= max_attempts {
        (RequestStatus::Failed, retry_count)
    } else {
        (RequestStatus::Pending, retry_count)
    }
}
