//! # In-Memory Store
//!
//! Wraps one [`Ledger`] behind a mutex. Every trait method takes the lock
//! for its whole read-check-write cycle, so per-line operations are
//! serialized exactly like the Postgres row lock serializes them.

use async_trait::async_trait;
use parking_lot::Mutex;

use pts_core::{LineId, UnitId};
use pts_ledger::{
    DocumentLine, Ledger, LedgerRow, ReconcileCounts, RemovalRef, ScannedUnit,
};

use crate::error::StoreError;
use crate::store::LedgerStore;

/// A [`LedgerStore`] holding one tenant's ledger in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryLedgerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a closure against the whole ledger under the lock. The carrier
    /// attach/detach workflows use this to admit or remove a unit set in
    /// one mutation scope.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        f(&mut self.ledger.lock())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_line(&self, line: DocumentLine) -> Result<LineId, StoreError> {
        Ok(self.ledger.lock().add_line(line))
    }

    async fn load_line(&self, id: LineId) -> Result<DocumentLine, StoreError> {
        Ok(self.ledger.lock().line(id)?.clone())
    }

    async fn line_version(&self, id: LineId) -> Result<u64, StoreError> {
        Ok(self.ledger.lock().line_version(id)?)
    }

    async fn register_scan(&self, id: LineId, unit: ScannedUnit) -> Result<UnitId, StoreError> {
        Ok(self.ledger.lock().register_scan(id, unit)?)
    }

    async fn remove_units(&self, id: LineId, refs: &[RemovalRef]) -> Result<u32, StoreError> {
        Ok(self.ledger.lock().remove_units(id, refs)?)
    }

    async fn reconcile(
        &self,
        id: LineId,
        based_on_version: u64,
        desired: Vec<LedgerRow>,
    ) -> Result<ReconcileCounts, StoreError> {
        Ok(self.ledger.lock().reconcile(id, based_on_version, desired)?)
    }
}
