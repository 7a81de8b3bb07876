//! # The Persistence Seam
//!
//! [`LedgerStore`] is what the service layer programs against. The
//! in-memory implementation backs tests and single-node deployments; the
//! Postgres implementation backs everything else. Both enforce the same
//! semantics — the trait's contract is the ledger's contract.

use async_trait::async_trait;

use pts_core::{LineId, UnitId};
use pts_ledger::{DocumentLine, LedgerRow, ReconcileCounts, RemovalRef, ScannedUnit};

use crate::error::StoreError;

/// Async persistence operations over one tenant's scan ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new document line; returns its id.
    async fn insert_line(&self, line: DocumentLine) -> Result<LineId, StoreError>;

    /// Load a line with its current rows.
    async fn load_line(&self, id: LineId) -> Result<DocumentLine, StoreError>;

    /// The line's current mutation version.
    async fn line_version(&self, id: LineId) -> Result<u64, StoreError>;

    /// Register one scan. Rejections leave the stored line untouched.
    async fn register_scan(&self, id: LineId, unit: ScannedUnit) -> Result<UnitId, StoreError>;

    /// Remove units; returns the quantity removed.
    async fn remove_units(&self, id: LineId, refs: &[RemovalRef]) -> Result<u32, StoreError>;

    /// Reconcile the line's rows against a desired set, guarded by the
    /// version the desired set was computed from.
    async fn reconcile(
        &self,
        id: LineId,
        based_on_version: u64,
        desired: Vec<LedgerRow>,
    ) -> Result<ReconcileCounts, StoreError>;
}
