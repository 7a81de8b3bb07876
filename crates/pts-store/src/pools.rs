//! # Tenant Pool Registry
//!
//! Each tenant's data lives in its own store. [`TenantPools`] hands out the
//! store handle for a tenant, creating it on first use. Creation goes
//! through the dashmap entry API, so two requests racing to create the
//! same tenant's store converge on one instance — the loser of the race
//! gets the winner's handle, never a second store.

use std::sync::Arc;

use dashmap::DashMap;

use pts_core::TenantId;

use crate::memory::InMemoryLedgerStore;
use crate::store::LedgerStore;

type StoreFactory = Box<dyn Fn(&TenantId) -> Arc<dyn LedgerStore> + Send + Sync>;

/// Per-tenant store registry with race-safe get-or-create.
pub struct TenantPools {
    stores: DashMap<TenantId, Arc<dyn LedgerStore>>,
    factory: StoreFactory,
}

impl TenantPools {
    /// Registry with a custom store factory (e.g. one Postgres pool per
    /// tenant database).
    pub fn new(factory: impl Fn(&TenantId) -> Arc<dyn LedgerStore> + Send + Sync + 'static) -> Self {
        Self {
            stores: DashMap::new(),
            factory: Box::new(factory),
        }
    }

    /// Registry backed by in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(|_| Arc::new(InMemoryLedgerStore::new()))
    }

    /// The store for a tenant, created on first use.
    pub fn get(&self, tenant: &TenantId) -> Arc<dyn LedgerStore> {
        self.stores
            .entry(tenant.clone())
            .or_insert_with(|| {
                tracing::info!(tenant = %tenant, "creating tenant store");
                (self.factory)(tenant)
            })
            .clone()
    }

    /// Number of tenants with a live store.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether no tenant store exists yet.
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
