//! Response Classifier
//!
//! Maps a freshly loaded view onto exactly one [`Classification`].

use std::time::Duration;

use crate::application::ports::{AcquisitionSession, SessionError, View};
use crate::domain::acquisition::{Classification, MarkerTable};
use crate::domain::shared::HoldId;

/// Classification plus the hold id seen on a ready view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedView {
    /// Outcome.
    pub classification: Classification,
    /// Hold id, when `Ready`.
    pub hold: Option<HoldId>,
}

impl ClassifiedView {
    const fn outcome(classification: Classification) -> Self {
        Self {
            classification,
            hold: None,
        }
    }
}

/// Classifies views using the marker table and a bounded hold-field wait.
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    markers: MarkerTable,
    hold_field: String,
    field_timeout: Duration,
}

impl ResponseClassifier {
    /// Create a classifier.
    #[must_use]
    pub fn new(markers: MarkerTable, hold_field: impl Into<String>, field_timeout: Duration) -> Self {
        Self {
            markers,
            hold_field: hold_field.into(),
            field_timeout,
        }
    }

    /// Classify `view`.
    ///
    /// Failure addresses are decided from text alone without waiting. Any
    /// session error while inspecting the view is a `TransientError`.
    pub async fn classify(
        &self,
        session: &mut dyn AcquisitionSession,
        view: &View,
    ) -> ClassifiedView {
        if self.markers.is_failure_address(&view.address) {
            return match session.view_text(view).await {
                Ok(text) => ClassifiedView::outcome(self.markers.classify_failure_text(&text)),
                Err(e) => {
                    tracing::debug!(unit = %view.unit, error = %e, "Failure view unreadable");
                    ClassifiedView::outcome(Classification::TransientError)
                }
            };
        }

        match session
            .await_field(view, &self.hold_field, self.field_timeout)
            .await
        {
            Ok(Some(hold)) if !hold.trim().is_empty() => ClassifiedView {
                classification: Classification::Ready,
                hold: Some(HoldId::new(hold.trim())),
            },
            Ok(_) | Err(SessionError::Timeout(_)) => {
                ClassifiedView::outcome(Classification::SlowToLoad)
            }
            Err(e) => {
                tracing::debug!(unit = %view.unit, error = %e, "Hold field lookup failed");
                ClassifiedView::outcome(Classification::TransientError)
            }
        }
    }
}
