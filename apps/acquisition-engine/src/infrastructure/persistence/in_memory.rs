//! In-memory reservation store.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{
    OutcomeUpdate, RequestStatus, ReservationStore, StoreError, StoredRequest,
};
use crate::domain::reservation::ReservationRequest;
use crate::domain::shared::RequestId;

/// In-memory implementation of [`ReservationStore`].
///
/// Keeps insertion order so pending requests are served first-come.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    requests: RwLock<Vec<StoredRequest>>,
}

impl InMemoryReservationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with every request pending.
    #[must_use]
    pub fn with_requests(requests: impl IntoIterator<Item = ReservationRequest>) -> Self {
        let store = Self::new();
        for request in requests {
            store.add(StoredRequest::pending(request));
        }
        store
    }

    /// Add or replace a stored request.
    pub fn add(&self, stored: StoredRequest) {
        let mut requests = self.requests.write();
        match requests
            .iter_mut()
            .find(|s| s.request.id == stored.request.id)
        {
            Some(existing) => *existing = stored,
            None => requests.push(stored),
        }
    }

    /// Number of stored requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.read().is_empty()
    }

    /// Every stored request, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StoredRequest> {
        self.requests.read().clone()
    }

    fn update<T>(
        &self,
        id: &RequestId,
        f: impl FnOnce(&mut StoredRequest) -> T,
    ) -> Result<T, StoreError> {
        let mut requests = self.requests.write();
        requests
            .iter_mut()
            .find(|s| s.request.id == *id)
            .map(f)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn pending(&self) -> Result<Vec<StoredRequest>, StoreError> {
        Ok(self
            .requests
            .read()
            .iter()
            .filter(|s| s.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn mark_in_progress(&self, id: &RequestId) -> Result<(), StoreError> {
        self.update(id, |s| s.status = RequestStatus::InProgress)
    }

    async fn record_outcome(
        &self,
        id: &RequestId,
        update: OutcomeUpdate,
    ) -> Result<(), StoreError> {
        self.update(id, |s| {
            s.status = update.status;
            s.retry_count = update.retry_count;
            s.message = Some(update.message);
            s.confirmation_id = update.confirmation_id;
            s.acquired_unit = update.acquired_unit;
        })
    }

    async fn get(&self, id: &RequestId) -> Result<Option<StoredRequest>, StoreError> {
        Ok(self
            .requests
            .read()
            .iter()
            .find(|s| s.request.id == *id)
            .cloned())
    }
}

/// Read a JSON array of requests.
pub fn load_requests_file(path: impl AsRef<Path>) -> Result<Vec<ReservationRequest>, StoreError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::fixtures;
    use crate::domain::shared::{ConfirmationId, UnitId};
    use std::io::Write;

    #[tokio::test]
    async fn pending_keeps_insertion_order() {
        let first = fixtures::request(&["1"]);
        let mut second = fixtures::request(&["2"]);
        second.id = RequestId::new("req-2");
        let store = InMemoryReservationStore::with_requests([first.clone(), second.clone()]);

        let pending = store.pending().await.unwrap();
        let ids: Vec<_> = pending.iter().map(|s| s.request.id.clone()).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn in_progress_requests_are_not_pending() {
        let request = fixtures::request(&["1"]);
        let store = InMemoryReservationStore::with_requests([request.clone()]);

        store.mark_in_progress(&request.id).await.unwrap();

        assert!(store.pending().await.unwrap().is_empty());
        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn record_outcome_overwrites_result_fields() {
        let request = fixtures::request(&["1"]);
        let store = InMemoryReservationStore::with_requests([request.clone()]);

        store
            .record_outcome(
                &request.id,
                OutcomeUpdate {
                    status: RequestStatus::Succeeded,
                    retry_count: 0,
                    message: "reserved".into(),
                    confirmation_id: Some(ConfirmationId::new("278890")),
                    acquired_unit: Some(UnitId::new("1")),
                },
            )
            .await
            .unwrap();

        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Succeeded);
        assert_eq!(stored.confirmation_id, Some(ConfirmationId::new("278890")));
        assert_eq!(stored.message.as_deref(), Some("reserved"));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let store = InMemoryReservationStore::new();
        let id = RequestId::new("missing");

        let result = store.mark_in_progress(&id).await;
        assert_eq!(result, Err(StoreError::NotFound(id)));
    }

    #[test]
    fn requests_file_round_trips() {
        let request = fixtures::request(&["1", "2"]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&[&request]).unwrap()).unwrap();

        let loaded = load_requests_file(file.path()).unwrap();
        assert_eq!(loaded, vec![request]);
    }

    #[test]
    fn unreadable_requests_file_is_backend_error() {
        let result = load_requests_file("/nonexistent/requests.json");
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[test]
    fn example_requests_parse() {
        let requests: Vec<ReservationRequest> =
            serde_json::from_str(include_str!("../../../requests.example.json")).unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].validate().is_ok());
        assert_eq!(requests[0].party[1].member_id, None);
    }
}
