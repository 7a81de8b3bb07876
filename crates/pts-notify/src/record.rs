//! # Notification Records
//!
//! One [`NotificationRecord`] per admitted unit, tracking where the unit
//! stands in the regulatory notification lifecycle.
//!
//! ## State Machine
//!
//! ```text
//! PENDING ──► SUBMITTED ──► ACKNOWLEDGED_SUCCESS   (terminal)
//!    ▲            │
//!    │            ▼
//!    └─────  ACKNOWLEDGED_FAIL ──► SUBMITTED  (resubmission)
//! ```
//!
//! Progress is monotonic with one exception: a record that the authority
//! rejected (`ACKNOWLEDGED_FAIL`) may be submitted again. A record that was
//! acknowledged successfully never moves again — re-applied results are
//! ignored rather than replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pts_core::{BatchId, ExpiryDate, Gtin, LotNumber, SerialNumber, UnitId};

/// The authority's verdict on one notified unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckOutcome {
    /// The authority accepted the notification.
    Success,
    /// The authority rejected it; the record may be resubmitted.
    Fail,
}

/// Lifecycle state of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    /// Not yet sent to the authority.
    Pending,
    /// Included in an outbound batch; the call may or may not have reached
    /// the authority.
    Submitted,
    /// The authority answered.
    Acknowledged(AckOutcome),
}

impl NotificationStatus {
    /// Canonical uppercase name, used in logs and persisted snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Acknowledged(AckOutcome::Success) => "ACKNOWLEDGED_SUCCESS",
            Self::Acknowledged(AckOutcome::Fail) => "ACKNOWLEDGED_FAIL",
        }
    }

    /// Whether a record in this state may enter an outbound batch.
    pub fn is_submittable(&self) -> bool {
        matches!(self, Self::Pending | Self::Acknowledged(AckOutcome::Fail))
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An illegal lifecycle transition was attempted. The record is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid notification transition for unit {unit}: {from} -> {to}")]
pub struct TransitionError {
    /// The record's unit.
    pub unit: UnitId,
    /// State the record was in.
    pub from: NotificationStatus,
    /// State the caller tried to move it to.
    pub to: NotificationStatus,
}

/// The notification lifecycle record for one admitted unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// The ledger row this record notifies.
    pub unit_id: UnitId,
    /// Product identifier, matched against acknowledgement rows.
    pub gtin: Gtin,
    /// Serial number, matched against acknowledgement rows.
    pub serial: SerialNumber,
    /// Expiry carried in the outbound payload.
    pub expiry: ExpiryDate,
    /// Lot carried in the outbound payload.
    pub lot: LotNumber,
    /// The outbound batch this record was last submitted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    /// Current lifecycle state.
    pub status: NotificationStatus,
    /// Normalized response code from the last acknowledgement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    /// When the last acknowledgement was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl NotificationRecord {
    /// Create a pending record for a unit.
    pub fn new(
        unit_id: UnitId,
        gtin: Gtin,
        serial: SerialNumber,
        expiry: ExpiryDate,
        lot: LotNumber,
    ) -> Self {
        Self {
            unit_id,
            gtin,
            serial,
            expiry,
            lot,
            batch_id: None,
            status: NotificationStatus::Pending,
            response_code: None,
            acknowledged_at: None,
        }
    }

    /// Move the record into `Submitted` as part of a batch.
    ///
    /// Legal from `Pending` (first submission) and `Acknowledged(Fail)`
    /// (resubmission). Callers invoke this BEFORE the external call.
    pub fn mark_submitted(&mut self, batch: BatchId) -> Result<(), TransitionError> {
        if !self.status.is_submittable() {
            return Err(self.bad_transition(NotificationStatus::Submitted));
        }
        self.status = NotificationStatus::Submitted;
        self.batch_id = Some(batch);
        Ok(())
    }

    /// Apply an authority acknowledgement.
    ///
    /// Legal from `Submitted`. Re-acknowledging an already-acknowledged
    /// record is a no-op when it would not change the outcome — result
    /// application must be idempotent — but a `Success` record never
    /// regresses, even if a stale `Fail` row arrives afterwards.
    pub fn acknowledge(
        &mut self,
        outcome: AckOutcome,
        code: String,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.status {
            NotificationStatus::Submitted => {
                self.status = NotificationStatus::Acknowledged(outcome);
                self.response_code = Some(code);
                self.acknowledged_at = Some(at);
                Ok(())
            }
            NotificationStatus::Acknowledged(AckOutcome::Success) => Ok(()),
            NotificationStatus::Acknowledged(AckOutcome::Fail) => {
                // A repeated fail (or a late success) updates the verdict;
                // the record is still waiting on a resubmission either way.
                self.status = NotificationStatus::Acknowledged(outcome);
                self.response_code = Some(code);
                self.acknowledged_at = Some(at);
                Ok(())
            }
            NotificationStatus::Pending => {
                Err(self.bad_transition(NotificationStatus::Acknowledged(outcome)))
            }
        }
    }

    fn bad_transition(&self, to: NotificationStatus) -> TransitionError {
        TransitionError {
            unit: self.unit_id,
            from: self.status,
            to,
        }
    }
}
