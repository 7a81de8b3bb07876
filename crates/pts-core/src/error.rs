//! # Validation Errors
//!
//! Construction-time errors for the identifier newtypes. Business-rule
//! rejections (duplicate serials, quantity caps) live with the components
//! that enforce them; this module only covers "this value is not a valid
//! instance of its type".

use thiserror::Error;

/// An identifier or date value failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// GTIN is not 1–14 digits.
    #[error("invalid GTIN {value:?}: {reason}")]
    InvalidGtin {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// GLN is not exactly 13 digits.
    #[error("invalid GLN {value:?}: must be exactly 13 digits")]
    InvalidGln {
        /// The rejected input.
        value: String,
    },

    /// A free-form identifier (serial, lot, carrier label, tenant) was empty
    /// or contained control characters.
    #[error("invalid {field}: {reason}")]
    InvalidIdentifier {
        /// Which field was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Expiry date is not a valid YYMMDD calendar date.
    #[error("invalid expiry date {value:?}: {reason}")]
    InvalidExpiry {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
