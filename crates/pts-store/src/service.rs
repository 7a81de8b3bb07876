//! # Scan Service
//!
//! [`ScanService`] is the operation surface callers use: it resolves the
//! tenant's store from the [`TenantContext`], stamps the operator onto
//! scans, and owns the one piece of policy the stores themselves do not —
//! the single automatic retry when a reconciliation hits a version
//! conflict. A second conflict surfaces to the caller; the engine never
//! loops.

use std::sync::Arc;

use pts_core::{LineId, TenantContext, UnitId};
use pts_ledger::{DocumentLine, LedgerRow, ReconcileCounts, RemovalRef, ScannedUnit};

use crate::error::StoreError;
use crate::pools::TenantPools;
use crate::store::LedgerStore;

/// Tenant-aware ledger operations.
pub struct ScanService {
    pools: Arc<TenantPools>,
}

impl ScanService {
    /// Service over a pool registry.
    pub fn new(pools: Arc<TenantPools>) -> Self {
        Self { pools }
    }

    /// The store handle for a context's tenant.
    pub fn store_for(&self, ctx: &TenantContext) -> Arc<dyn LedgerStore> {
        self.pools.get(&ctx.tenant)
    }

    /// Persist a new document line.
    pub async fn insert_line(
        &self,
        ctx: &TenantContext,
        line: DocumentLine,
    ) -> Result<LineId, StoreError> {
        self.store_for(ctx).insert_line(line).await
    }

    /// Load a line with its rows.
    pub async fn load_line(
        &self,
        ctx: &TenantContext,
        line: LineId,
    ) -> Result<DocumentLine, StoreError> {
        self.store_for(ctx).load_line(line).await
    }

    /// Register one scan, recording the context's operator as the capturer.
    pub async fn register_scan(
        &self,
        ctx: &TenantContext,
        line: LineId,
        mut unit: ScannedUnit,
    ) -> Result<UnitId, StoreError> {
        unit.captured_by = ctx.operator.clone();
        self.store_for(ctx).register_scan(line, unit).await
    }

    /// Remove units from a line; returns the quantity removed.
    pub async fn remove_units(
        &self,
        ctx: &TenantContext,
        line: LineId,
        refs: &[RemovalRef],
    ) -> Result<u32, StoreError> {
        self.store_for(ctx).remove_units(line, refs).await
    }

    /// Reconcile a line against a desired row set.
    ///
    /// `build_desired` computes the desired rows from the line's current
    /// state; the service reads the version, loads the line, computes, and
    /// applies. If a concurrent mutation advanced the version in between,
    /// the whole read-compute-apply cycle runs once more against the fresh
    /// state. A conflict on the retry surfaces as
    /// [`ReconciliationConflict`].
    ///
    /// [`ReconciliationConflict`]: pts_ledger::LedgerError::ReconciliationConflict
    pub async fn reconcile<F>(
        &self,
        ctx: &TenantContext,
        line: LineId,
        build_desired: F,
    ) -> Result<ReconcileCounts, StoreError>
    where
        F: Fn(&DocumentLine) -> Vec<LedgerRow>,
    {
        let store = self.store_for(ctx);
        match try_reconcile(store.as_ref(), line, &build_desired).await {
            Err(err) if err.is_conflict() => {
                tracing::warn!(%line, %err, "reconciliation conflict, retrying once");
                try_reconcile(store.as_ref(), line, &build_desired).await
            }
            other => other,
        }
    }
}

/// One read-compute-apply cycle. The version is read BEFORE the line: if a
/// mutation lands in between, the stored version is already past the one we
/// hold and the apply step conflicts instead of silently accepting a
/// desired set computed from stale rows.
async fn try_reconcile<F>(
    store: &dyn LedgerStore,
    line: LineId,
    build_desired: &F,
) -> Result<ReconcileCounts, StoreError>
where
    F: Fn(&DocumentLine) -> Vec<LedgerRow>,
{
    let version = store.line_version(line).await?;
    let current = store.load_line(line).await?;
    let desired = build_desired(&current);
    store.reconcile(line, version, desired).await
}
