//! # Tenant Context — Explicit, Never Ambient
//!
//! The legacy system propagated the current tenant through an implicit
//! per-request context. Here the tenant is a plain value: every call that
//! touches tenant-scoped state takes a [`TenantContext`] parameter. There
//! is nothing to forget to propagate across a task boundary, because there
//! is no hidden channel to begin with.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::TenantId;

/// The identity of one request: which tenant's store to use and which
/// operator performed the action (recorded on every scanned unit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// The tenant whose store this request operates on.
    pub tenant: TenantId,
    /// The operator (user) performing the scans.
    pub operator: String,
    /// Correlation id for tracing across external calls.
    pub request_id: Uuid,
}

impl TenantContext {
    /// Create a context for a tenant and operator with a fresh request id.
    pub fn new(tenant: TenantId, operator: impl Into<String>) -> Self {
        Self {
            tenant,
            operator: operator.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_tenant_and_operator() {
        let ctx = TenantContext::new(TenantId::new("warehouse-a").unwrap(), "scanner-3");
        assert_eq!(ctx.tenant.as_str(), "warehouse-a");
        assert_eq!(ctx.operator, "scanner-3");
    }
}
