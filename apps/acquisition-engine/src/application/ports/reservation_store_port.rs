//! Reservation Store Port (Driven Port)
//!
//! Upstream request/result store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::reservation::ReservationRequest;
use crate::domain::shared::{ConfirmationId, RequestId, UnitId};

/// Request lifecycle in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting to run.
    Pending,
    /// Claimed by a coordinator.
    InProgress,
    /// Reserved.
    Succeeded,
    /// Given up for good.
    Failed,
}

/// A request as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    /// The request.
    pub request: ReservationRequest,
    /// Status.
    pub status: RequestStatus,
    /// Executions that ended in failure so far.
    pub retry_count: u32,
    /// Last human-readable message.
    pub message: Option<String>,
    /// Confirmation id once reserved.
    pub confirmation_id: Option<ConfirmationId>,
    /// Unit reserved.
    pub acquired_unit: Option<UnitId>,
}

impl StoredRequest {
    /// A fresh pending request.
    #[must_use]
    pub const fn pending(request: ReservationRequest) -> Self {
        Self {
            request,
            status: RequestStatus::Pending,
            retry_count: 0,
            message: None,
            confirmation_id: None,
            acquired_unit: None,
        }
    }
}

/// Final write-back for one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeUpdate {
    /// New status.
    pub status: RequestStatus,
    /// Caller-level retry counter after this execution.
    pub retry_count: u32,
    /// Human-readable message.
    pub message: String,
    /// Confirmation id (success only).
    pub confirmation_id: Option<ConfirmationId>,
    /// Unit reserved (success only).
    pub acquired_unit: Option<UnitId>,
}

/// Store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Request not found.
    #[error("request not found: {0}")]
    NotFound(RequestId),

    /// Backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

/// Port for the upstream store.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Requests waiting to run.
    async fn pending(&self) -> Result<Vec<StoredRequest>, StoreError>;

    /// Claim a request for execution.
    async fn mark_in_progress(&self, id: &RequestId) -> Result<(), StoreError>;

    /// Write back the outcome of an execution.
    async fn record_outcome(&self, id: &RequestId, update: OutcomeUpdate)
    -> Result<(), StoreError>;

    /// Look up one request.
    async fn get(&self, id: &RequestId) -> Result<Option<StoredRequest>, StoreError>;
}
