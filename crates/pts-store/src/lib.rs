//! # pts-store — Tenant-Scoped Ledger Persistence
//!
//! The ledger logic in `pts-ledger` is pure; this crate gives it a home.
//! Every tenant gets its own store handle, looked up (or created) through
//! [`TenantPools`] — concurrent callers racing to create the same tenant's
//! handle converge on one instance.
//!
//! ## Layers
//!
//! - [`store`] — the [`LedgerStore`] trait: the async persistence seam.
//! - [`memory`] — in-memory implementation; the default for services and
//!   the only one tests need.
//! - [`postgres`] — Postgres implementation with the `SELECT ... FOR
//!   UPDATE` row-lock reconcile path.
//! - [`pools`] — the per-tenant registry.
//! - [`service`] — [`ScanService`]: the operation surface the rest of the
//!   engine calls, including the single automatic retry on
//!   [`ReconciliationConflict`].
//!
//! [`ReconciliationConflict`]: pts_ledger::LedgerError::ReconciliationConflict

pub mod error;
pub mod memory;
pub mod pools;
pub mod postgres;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryLedgerStore;
pub use pools::TenantPools;
pub use postgres::PgLedgerStore;
pub use service::ScanService;
pub use store::LedgerStore;
