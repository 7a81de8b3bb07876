//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the engine. Each
//! identifier is a distinct type — you cannot pass a [`SerialNumber`] where
//! a [`LotNumber`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`Gtin`], [`Gln`], [`SerialNumber`],
//! [`LotNumber`], [`CarrierLabel`], [`TenantId`]) validate format at
//! construction time. UUID-based identifiers ([`LineId`], [`UnitId`],
//! [`DocumentId`], [`BatchId`]) are always valid by construction.
//!
//! ## GS1 Reference
//!
//! - GTIN: Global Trade Item Number, up to 14 digits, stored zero-padded
//!   to 14 (the wire format always emits the padded form).
//! - GLN: Global Location Number, exactly 13 digits, identifies the
//!   sending/receiving party in compliance messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Helper macro to implement `Deserialize` for string newtypes that must
/// validate their contents. Deserializes as a plain `String`, then routes
/// through the type's `new()` constructor so that invalid values are
/// rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Helper macro for the UUID-based identifiers, which share an identical
/// surface: random construction, conversion from/to `Uuid`, `Display`.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $ty:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

uuid_id! {
    /// A unique identifier for a document line item against which scan
    /// accounting is tracked.
    LineId
}

uuid_id! {
    /// A unique identifier for a ledger row — a single scanned serialized
    /// unit or a batch aggregate row. Stable across reconciliation.
    UnitId
}

uuid_id! {
    /// A unique identifier for a shipment document.
    DocumentId
}

uuid_id! {
    /// A unique identifier for an outbound notification batch.
    BatchId
}

// ---------------------------------------------------------------------------
// GS1 identifiers (validated, canonical form)
// ---------------------------------------------------------------------------

/// A Global Trade Item Number, stored zero-padded to 14 digits.
///
/// Accepts 1–14 digits at construction and canonicalizes by left-padding
/// with zeros, so `8680001234567` and `08680001234567` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Gtin(String);

impl Gtin {
    /// Create a GTIN from a digit string, zero-padding to 14 digits.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > 14 {
            return Err(ValidationError::InvalidGtin {
                value: raw,
                reason: "must be 1-14 digits".to_string(),
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidGtin {
                value: raw,
                reason: "must contain only ASCII digits".to_string(),
            });
        }
        Ok(Self(format!("{raw:0>14}")))
    }

    /// The canonical 14-digit form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Gtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl_validating_deserialize!(Gtin);

/// A Global Location Number — exactly 13 digits, no canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Gln(String);

impl Gln {
    /// Create a GLN from a 13-digit string.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.len() != 13 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidGln { value: raw });
        }
        Ok(Self(raw))
    }

    /// The all-zeros placeholder GLN, used by default configuration
    /// snapshots before a real deployment profile is loaded.
    pub fn placeholder() -> Self {
        Self("0000000000000".to_string())
    }

    /// The 13-digit form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Gln {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl_validating_deserialize!(Gln);

// ---------------------------------------------------------------------------
// Free-form identifiers (non-empty, printable)
// ---------------------------------------------------------------------------

/// Shared validation for the free-form GS1 fields: non-empty, no control
/// characters. Serial and lot contents are otherwise opaque — the symbology
/// itself imposes no alphabet, which is the root of the anchor ambiguity
/// documented in `pts-barcode`.
fn validate_freeform(field: &'static str, raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if raw.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidIdentifier {
            field,
            reason: "must not contain control characters".to_string(),
        });
    }
    Ok(())
}

macro_rules! freeform_id {
    ($(#[$doc:meta])* $ty:ident, $field:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $ty(String);

        impl $ty {
            /// Create the identifier, rejecting empty or control-character input.
            pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                validate_freeform($field, &raw)?;
                Ok(Self(raw))
            }

            /// The raw string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl_validating_deserialize!($ty);
    };
}

freeform_id! {
    /// A unit-level serial number (GS1 AI 21). Unique per line for
    /// serialized tracking.
    SerialNumber, "serial number"
}

freeform_id! {
    /// A production lot/batch number (GS1 AI 10).
    LotNumber, "lot number"
}

freeform_id! {
    /// The label (SSCC or internal code) of a logistics carrier — a case,
    /// pallet, or other shipping container.
    CarrierLabel, "carrier label"
}

freeform_id! {
    /// A tenant identifier selecting the per-tenant store.
    TenantId, "tenant id"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gtin_zero_pads_to_14_digits() {
        let g = Gtin::new("8680001234567").unwrap();
        assert_eq!(g.as_str(), "08680001234567");
        assert_eq!(g, Gtin::new("08680001234567").unwrap());
    }

    #[test]
    fn gtin_rejects_non_digits() {
        assert!(Gtin::new("86800012345X7").is_err());
    }

    #[test]
    fn gtin_rejects_empty_and_overlong() {
        assert!(Gtin::new("").is_err());
        assert!(Gtin::new("123456789012345").is_err());
    }

    #[test]
    fn gln_requires_exactly_13_digits() {
        assert!(Gln::new("8680001000001").is_ok());
        assert!(Gln::new("868000100000").is_err());
        assert!(Gln::new("86800010000012").is_err());
        assert!(Gln::new("868000100000X").is_err());
    }

    #[test]
    fn serial_rejects_empty() {
        assert!(SerialNumber::new("").is_err());
        assert!(SerialNumber::new("ABC123").is_ok());
    }

    #[test]
    fn lot_rejects_control_characters() {
        assert!(LotNumber::new("L99\n").is_err());
    }

    #[test]
    fn deserialization_routes_through_validation() {
        let ok: Result<Gtin, _> = serde_json::from_str("\"8680001234567\"");
        assert_eq!(ok.unwrap().as_str(), "08680001234567");
        let bad: Result<Gtin, _> = serde_json::from_str("\"not-a-gtin\"");
        assert!(bad.is_err());
    }

    #[test]
    fn uuid_ids_are_distinct_types_with_display() {
        let line = LineId::new();
        let parsed: LineId = line.to_string().parse().unwrap();
        assert_eq!(line, parsed);
    }
}
