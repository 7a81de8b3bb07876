//! # pts-notify — Compliance Notification Tracking
//!
//! Every admitted unit must eventually be notified to the authority and
//! acknowledged. This crate owns that lifecycle:
//!
//! - [`record`] — the per-unit [`NotificationRecord`] state machine
//!   (Pending → Submitted → Acknowledged), including resubmission rules.
//! - [`payload`] — the outbound/inbound JSON shapes and response-code
//!   normalization.
//! - [`tracker`] — [`NotificationTracker`]: batch construction, result
//!   application, and the derived document compliance status.
//! - [`bulk`] — the cancellable bulk transfer download workflow.
//!
//! ## Submission Ordering
//!
//! Records are marked `Submitted` BEFORE the external call goes out. If the
//! process dies mid-call, recovery sees `Submitted` and knows the payload
//! may have reached the authority; it must query, never blindly resubmit.
//! The reverse ordering would risk double notification, which regulators
//! treat as a data integrity fault.

pub mod bulk;
pub mod payload;
pub mod record;
pub mod tracker;

pub use bulk::{
    run_bulk_download, BulkProgress, BulkStatus, BulkSummary, CancelToken, PersistError,
    TransferSink,
};
pub use payload::{normalize_response_code, OutboundItem, ResultRow, SUCCESS_CODE};
pub use record::{AckOutcome, NotificationRecord, NotificationStatus, TransitionError};
pub use tracker::{ApplyReport, DocumentComplianceStatus, NotificationTracker, OutboundBatch};
