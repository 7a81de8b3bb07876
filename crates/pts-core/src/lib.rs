//! # pts-core — Foundational Types for the Track & Trace Engine
//!
//! This crate is the bedrock of the pts workspace. It defines the
//! type-system primitives every other crate builds on; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`Gtin`], [`Gln`],
//!    [`SerialNumber`], [`LotNumber`], [`CarrierLabel`], [`TenantId`] — all
//!    newtypes with validated constructors. No bare strings for identifiers.
//!
//! 2. **Single `TrackingClass` enum.** One closed definition, exhaustive
//!    `match` at every ledger decision point. Adding a class forces every
//!    consumer to handle it.
//!
//! 3. **Explicit configuration and context.** [`ConfigHandle`] owns a
//!    reloadable snapshot that is injected into services; [`TenantContext`]
//!    is a plain value threaded through calls. Neither is ambient state.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pts-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod context;
pub mod error;
pub mod expiry;
pub mod identity;
pub mod tracking;

pub use config::{ConfigHandle, EngineConfig};
pub use context::TenantContext;
pub use error::ValidationError;
pub use expiry::ExpiryDate;
pub use identity::{
    BatchId, CarrierLabel, DocumentId, Gln, Gtin, LineId, LotNumber, SerialNumber, TenantId,
    UnitId,
};
pub use tracking::TrackingClass;
