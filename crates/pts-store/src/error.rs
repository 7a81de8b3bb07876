//! Store-level error taxonomy.

use thiserror::Error;

use pts_ledger::LedgerError;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A ledger rule or version guard fired; see [`LedgerError`].
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The database itself failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed validation on the way back out. Indicates
    /// data written outside this engine or a schema migration gap.
    #[error("stored data failed validation: {reason}")]
    Corrupted {
        /// What failed to validate.
        reason: String,
    },
}

impl StoreError {
    /// Whether this is the optimistic-concurrency conflict that warrants
    /// the single automatic retry.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Ledger(LedgerError::ReconciliationConflict { .. })
        )
    }
}
