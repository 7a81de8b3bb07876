//! # The Notification Tracker
//!
//! [`NotificationTracker`] holds the notification records for one shipment
//! document. It builds outbound batches, applies the authority's
//! acknowledgements, and derives the document's compliance status.
//!
//! ## Batch Construction
//!
//! [`build_batches`] marks every included record `Submitted` before it
//! returns — strictly before the caller performs the external call. See the
//! crate docs for why that ordering is load-bearing.
//!
//! [`build_batches`]: NotificationTracker::build_batches

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use pts_core::{BatchId, UnitId};

use crate::payload::{normalize_response_code, OutboundItem, ResultRow, SUCCESS_CODE};
use crate::record::{AckOutcome, NotificationRecord, NotificationStatus};

/// One outbound submit call's worth of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundBatch {
    /// Batch identity, recorded on every member record.
    pub batch_id: BatchId,
    /// Payload items, in tracker order.
    pub items: Vec<OutboundItem>,
    /// The member records, parallel to `items`.
    pub unit_ids: Vec<UnitId>,
}

impl OutboundBatch {
    /// The JSON body for the authority's notify endpoint.
    pub fn payload(&self) -> Value {
        json!({ "productList": self.items })
    }
}

/// What applying one acknowledgement response did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyReport {
    /// Rows that matched a record and were applied.
    pub applied: usize,
    /// Rows that matched no record in the batch. Logged as anomalies;
    /// returned so callers can surface them.
    pub anomalies: Vec<ResultRow>,
}

/// Derived compliance status of a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentComplianceStatus {
    /// No unit has been submitted yet (or there are no units).
    Pending,
    /// At least one unit is submitted and awaiting acknowledgement, and
    /// none has failed.
    InFlight,
    /// Every unit is acknowledged successfully.
    Success,
    /// At least one unit was rejected by the authority.
    Fail,
}

impl DocumentComplianceStatus {
    /// Canonical uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InFlight => "IN_FLIGHT",
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for DocumentComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification records for one document, in stable insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationTracker {
    records: Vec<NotificationRecord>,
}

impl NotificationTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a record. A unit already tracked is left as-is —
    /// re-admitting a unit must not reset its lifecycle.
    pub fn track(&mut self, record: NotificationRecord) {
        if self.records.iter().any(|r| r.unit_id == record.unit_id) {
            tracing::warn!(unit = %record.unit_id, "unit already tracked, keeping existing record");
            return;
        }
        self.records.push(record);
    }

    /// The record for a unit, if tracked.
    pub fn get(&self, unit: UnitId) -> Option<&NotificationRecord> {
        self.records.iter().find(|r| r.unit_id == unit)
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    /// The units currently eligible for submission (`Pending`, or
    /// `Acknowledged(Fail)` for resubmission), in tracker order. The usual
    /// argument to [`build_batches`] when submitting everything outstanding.
    ///
    /// [`build_batches`]: NotificationTracker::build_batches
    pub fn submittable_unit_ids(&self) -> Vec<UnitId> {
        self.records
            .iter()
            .filter(|r| r.status.is_submittable())
            .map(|r| r.unit_id)
            .collect()
    }

    /// Build outbound batches for the requested units, chunked to
    /// `max_items_per_call`, in stable tracker order. The caller chooses
    /// what goes out: requested units that are not submittable (already
    /// `Submitted`, or `Acknowledged(Success)`) are skipped, and eligible
    /// units that were not requested stay untouched — resubmitting a
    /// failed unit is always an explicit request, never a side effect of
    /// submitting fresh ones.
    ///
    /// Every included record is marked `Submitted` here, before any
    /// external call is made with the returned batches.
    pub fn build_batches(
        &mut self,
        unit_ids: &[UnitId],
        max_items_per_call: usize,
    ) -> Vec<OutboundBatch> {
        let requested: HashSet<UnitId> = unit_ids.iter().copied().collect();
        let chunk = max_items_per_call.max(1);
        let mut batches = Vec::new();
        let mut current: Option<OutboundBatch> = None;

        for record in self
            .records
            .iter_mut()
            .filter(|r| requested.contains(&r.unit_id) && r.status.is_submittable())
        {
            let batch = current.get_or_insert_with(|| OutboundBatch {
                batch_id: BatchId::new(),
                items: Vec::new(),
                unit_ids: Vec::new(),
            });
            // is_submittable was just checked; the transition cannot fail.
            if let Err(err) = record.mark_submitted(batch.batch_id) {
                tracing::warn!(unit = %record.unit_id, %err, "skipping unsubmittable record");
                continue;
            }
            batch.items.push(OutboundItem::new(
                record.gtin.clone(),
                record.serial.clone(),
                record.expiry,
                record.lot.clone(),
            ));
            batch.unit_ids.push(record.unit_id);

            if batch.items.len() == chunk {
                batches.extend(current.take());
            }
        }
        batches.extend(current.take());
        batches
    }

    /// Apply an acknowledgement response for one batch.
    ///
    /// Rows are matched to the batch's records by (gtin, serial). Response
    /// codes are normalized first; [`SUCCESS_CODE`] acknowledges success,
    /// anything else acknowledges failure. Rows matching no record in the
    /// batch are logged and reported as anomalies. Re-applying the same
    /// response is harmless.
    pub fn apply_result(
        &mut self,
        batch: BatchId,
        rows: &[ResultRow],
        at: DateTime<Utc>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for row in rows {
            let target = self.records.iter_mut().find(|r| {
                r.batch_id == Some(batch) && r.gtin == row.gtin && r.serial == row.sn
            });
            let Some(record) = target else {
                tracing::warn!(
                    %batch,
                    gtin = %row.gtin,
                    serial = %row.sn,
                    code = %row.uc,
                    "acknowledgement row matched no record in batch"
                );
                report.anomalies.push(row.clone());
                continue;
            };

            let code = normalize_response_code(&row.uc);
            let outcome = if code == SUCCESS_CODE {
                AckOutcome::Success
            } else {
                AckOutcome::Fail
            };
            match record.acknowledge(outcome, code, at) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    tracing::warn!(unit = %record.unit_id, %err, "acknowledgement rejected");
                    report.anomalies.push(row.clone());
                }
            }
        }
        report
    }

    /// Derive the document's compliance status from its records.
    pub fn document_status(&self) -> DocumentComplianceStatus {
        if self.records.is_empty() {
            return DocumentComplianceStatus::Pending;
        }
        let mut in_flight = false;
        let mut pending = false;
        for record in &self.records {
            match record.status {
                NotificationStatus::Acknowledged(AckOutcome::Fail) => {
                    return DocumentComplianceStatus::Fail;
                }
                NotificationStatus::Submitted => in_flight = true,
                NotificationStatus::Pending => pending = true,
                NotificationStatus::Acknowledged(AckOutcome::Success) => {}
            }
        }
        if in_flight {
            DocumentComplianceStatus::InFlight
        } else if pending {
            DocumentComplianceStatus::Pending
        } else {
            DocumentComplianceStatus::Success
        }
    }
}
