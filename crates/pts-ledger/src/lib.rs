//! # pts-ledger — Per-Line Scan Accounting
//!
//! The scan ledger tracks which product units have been scanned against
//! each document line and enforces the two invariants everything else
//! relies on:
//!
//! 1. **No double counting.** On a serialized line, a serial number is
//!    accepted at most once.
//! 2. **No over-shipment.** The summed quantity on a line never exceeds its
//!    expected quantity. Over-cap scans are rejected whole — never clamped,
//!    never partially merged.
//!
//! All rejections are side-effect-free: a rejected scan leaves the line
//! byte-for-byte as it was.
//!
//! ## Structure
//!
//! - [`line`] — [`DocumentLine`], [`ScannedUnit`], [`LedgerRow`] and the
//!   `register_scan` / `remove_units` operations.
//! - [`reconcile`] — row diffing by stable identity with idempotent counts.
//! - [`ledger`] — the line collection with version guards feeding
//!   [`LedgerError::ReconciliationConflict`].

pub mod ledger;
pub mod line;
pub mod reconcile;

pub use ledger::{Ledger, LedgerError};
pub use line::{DocumentLine, LedgerRow, RemovalRef, ScanRejected, ScannedUnit};
pub use reconcile::ReconcileCounts;
