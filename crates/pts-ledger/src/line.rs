//! # Document Lines and Scan Registration
//!
//! A [`DocumentLine`] owns the ledger rows scanned against one line item.
//! [`DocumentLine::register_scan`] is the single entry point through which
//! units are admitted; every decision matches exhaustively on
//! [`TrackingClass`] so a new class cannot slip past a default arm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pts_core::{
    CarrierLabel, ExpiryDate, Gtin, LineId, LotNumber, SerialNumber, TrackingClass, UnitId,
};

/// A scan (or carrier-sourced unit) presented to the ledger for admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedUnit {
    /// Product identifier from the barcode.
    pub gtin: Gtin,
    /// Serial number — present exactly when the unit is serialized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<SerialNumber>,
    /// Production lot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot: Option<LotNumber>,
    /// Expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryDate>,
    /// Carrier this unit arrived in, if it was admitted via a carrier
    /// attach rather than an individual scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<CarrierLabel>,
    /// Unit quantity. Fixed at 1 when a serial is present.
    pub quantity: u32,
    /// When the scan was captured.
    pub captured_at: DateTime<Utc>,
    /// The operator who captured it.
    pub captured_by: String,
}

/// One stored ledger row: a single serialized unit, or a batch aggregate
/// keyed by (lot, expiry). `row_id` is the stable identity reconciliation
/// diffs against — never the row's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Stable row identity.
    pub row_id: UnitId,
    /// Product identifier.
    pub gtin: Gtin,
    /// Serial number (serialized rows only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<SerialNumber>,
    /// Lot component of the aggregate key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot: Option<LotNumber>,
    /// Expiry component of the aggregate key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryDate>,
    /// Carrier the row's units arrived in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<CarrierLabel>,
    /// Row quantity: 1 for serialized rows, the aggregate total otherwise.
    pub quantity: u32,
    /// First capture timestamp for the row.
    pub captured_at: DateTime<Utc>,
    /// Operator of the first capture.
    pub captured_by: String,
}

/// A scan was rejected by a business rule. Zero side effects — the line is
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanRejected {
    /// A non-removed unit with this serial already exists on the line.
    #[error("duplicate serial {serial} on line {line}")]
    DuplicateSerial {
        /// The offending line.
        line: LineId,
        /// The serial that was already admitted.
        serial: SerialNumber,
    },

    /// Admitting the unit would push the line total over its expected
    /// quantity.
    #[error(
        "quantity exceeded on line {line}: {current} scanned + {attempted} attempted > {expected} expected"
    )]
    QuantityExceeded {
        /// The offending line.
        line: LineId,
        /// Expected (document) quantity.
        expected: u32,
        /// Quantity already admitted.
        current: u32,
        /// Quantity the rejected scan would have added.
        attempted: u32,
    },

    /// The unit's shape does not match the line's tracking class (missing
    /// serial on a serialized line, serial on an aggregate line, missing
    /// lot/expiry on a batch line).
    #[error("wrong tracking class on line {line} ({class}): {reason}")]
    WrongTrackingClass {
        /// The offending line.
        line: LineId,
        /// The line's tracking class.
        class: TrackingClass,
        /// What about the unit did not fit.
        reason: String,
    },
}

/// A reference identifying ledger rows for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalRef {
    /// Remove the serialized row carrying this serial.
    Serial(SerialNumber),
    /// Decrement the aggregate row with this key by `quantity`, deleting
    /// the row when it reaches zero.
    Aggregate {
        /// Lot component of the key.
        lot: Option<LotNumber>,
        /// Expiry component of the key.
        expiry: Option<ExpiryDate>,
        /// Quantity to remove.
        quantity: u32,
    },
}

/// A document line item with its scanned rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    /// Line identity.
    pub line_id: LineId,
    /// The product this line expects; carrier attaches validate against it.
    pub product: Gtin,
    /// Quantity the document says will ship on this line.
    pub expected_quantity: u32,
    /// How units on this line are tracked.
    pub tracking_class: TrackingClass,
    /// Admitted rows.
    pub rows: Vec<LedgerRow>,
}

impl DocumentLine {
    /// Create an empty line.
    pub fn new(product: Gtin, expected_quantity: u32, tracking_class: TrackingClass) -> Self {
        Self {
            line_id: LineId::new(),
            product,
            expected_quantity,
            tracking_class,
            rows: Vec::new(),
        }
    }

    /// Total quantity admitted so far.
    pub fn scanned_total(&self) -> u32 {
        self.rows.iter().map(|r| r.quantity).sum()
    }

    /// Quantity still admissible under the cap.
    pub fn remaining(&self) -> u32 {
        self.expected_quantity.saturating_sub(self.scanned_total())
    }

    /// Admit one scanned unit, enforcing the line's invariants.
    ///
    /// Returns the id of the row the unit landed in: a fresh row for
    /// serialized scans and new aggregates, the existing row's id when a
    /// batch scan merged into it. On rejection the line is unchanged.
    pub fn register_scan(&mut self, unit: ScannedUnit) -> Result<UnitId, ScanRejected> {
        match self.tracking_class {
            TrackingClass::Serialized => self.register_serialized(unit),
            TrackingClass::Batch => {
                if unit.lot.is_none() || unit.expiry.is_none() {
                    return Err(self.wrong_class("batch line requires lot and expiry"));
                }
                self.register_aggregate(unit)
            }
            TrackingClass::Untracked => self.register_aggregate(unit),
        }
    }

    fn register_serialized(&mut self, unit: ScannedUnit) -> Result<UnitId, ScanRejected> {
        let Some(serial) = unit.serial.clone() else {
            return Err(self.wrong_class("serialized line requires a serial number"));
        };
        if self.rows.iter().any(|r| r.serial.as_ref() == Some(&serial)) {
            return Err(ScanRejected::DuplicateSerial {
                line: self.line_id,
                serial,
            });
        }
        // Serialized units always count as one, regardless of the quantity
        // the caller supplied.
        self.check_cap(1)?;
        let row = LedgerRow {
            row_id: UnitId::new(),
            gtin: unit.gtin,
            serial: Some(serial),
            lot: unit.lot,
            expiry: unit.expiry,
            carrier: unit.carrier,
            quantity: 1,
            captured_at: unit.captured_at,
            captured_by: unit.captured_by,
        };
        let id = row.row_id;
        self.rows.push(row);
        Ok(id)
    }

    /// Batch and untracked admission: merge into the aggregate row with the
    /// same (lot, expiry) key if present, else open a new row. The cap is
    /// checked against the post-merge total before anything is written.
    fn register_aggregate(&mut self, unit: ScannedUnit) -> Result<UnitId, ScanRejected> {
        if unit.serial.is_some() {
            return Err(self.wrong_class("aggregate line cannot admit a serialized unit"));
        }
        if unit.quantity == 0 {
            return Err(self.wrong_class("aggregate scan quantity must be positive"));
        }
        self.check_cap(unit.quantity)?;

        let existing = self
            .rows
            .iter_mut()
            .find(|r| r.serial.is_none() && r.lot == unit.lot && r.expiry == unit.expiry);
        match existing {
            Some(row) => {
                row.quantity += unit.quantity;
                Ok(row.row_id)
            }
            None => {
                let row = LedgerRow {
                    row_id: UnitId::new(),
                    gtin: unit.gtin,
                    serial: None,
                    lot: unit.lot,
                    expiry: unit.expiry,
                    carrier: unit.carrier,
                    quantity: unit.quantity,
                    captured_at: unit.captured_at,
                    captured_by: unit.captured_by,
                };
                let id = row.row_id;
                self.rows.push(row);
                Ok(id)
            }
        }
    }

    /// Remove units from the line.
    ///
    /// Serial refs delete their row; aggregate refs decrement the matching
    /// row's quantity, deleting it at zero. Refs that match nothing are
    /// logged and skipped — removal is used by carrier detach, where a
    /// missing row must not block the rest of the carrier. Returns the
    /// total quantity removed.
    pub fn remove_units(&mut self, refs: &[RemovalRef]) -> u32 {
        let mut removed = 0u32;
        for r in refs {
            match r {
                RemovalRef::Serial(serial) => {
                    if let Some(pos) =
                        self.rows.iter().position(|row| row.serial.as_ref() == Some(serial))
                    {
                        removed += self.rows[pos].quantity;
                        self.rows.remove(pos);
                    } else {
                        tracing::warn!(line = %self.line_id, %serial, "removal ref matched no row");
                    }
                }
                RemovalRef::Aggregate { lot, expiry, quantity } => {
                    if let Some(pos) = self
                        .rows
                        .iter()
                        .position(|row| row.serial.is_none() && &row.lot == lot && &row.expiry == expiry)
                    {
                        let row = &mut self.rows[pos];
                        let take = (*quantity).min(row.quantity);
                        row.quantity -= take;
                        removed += take;
                        if row.quantity == 0 {
                            self.rows.remove(pos);
                        }
                    } else {
                        tracing::warn!(line = %self.line_id, "aggregate removal ref matched no row");
                    }
                }
            }
        }
        removed
    }

    fn check_cap(&self, attempted: u32) -> Result<(), ScanRejected> {
        let current = self.scanned_total();
        // Phrased against the remaining headroom so an adversarial
        // quantity near u32::MAX cannot overflow the sum.
        if attempted > self.expected_quantity.saturating_sub(current) {
            return Err(ScanRejected::QuantityExceeded {
                line: self.line_id,
                expected: self.expected_quantity,
                current,
                attempted,
            });
        }
        Ok(())
    }

    fn wrong_class(&self, reason: &str) -> ScanRejected {
        ScanRejected::WrongTrackingClass {
            line: self.line_id,
            class: self.tracking_class,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gtin() -> Gtin {
        Gtin::new("08680001234567").unwrap()
    }

    fn serial_unit(serial: &str) -> ScannedUnit {
        ScannedUnit {
            gtin: gtin(),
            serial: Some(SerialNumber::new(serial).unwrap()),
            lot: Some(LotNumber::new("L99").unwrap()),
            expiry: Some(ExpiryDate::parse_yymmdd("260131").unwrap()),
            carrier: None,
            quantity: 1,
            captured_at: Utc::now(),
            captured_by: "scanner-1".to_string(),
        }
    }

    fn batch_unit(lot: &str, quantity: u32) -> ScannedUnit {
        ScannedUnit {
            gtin: gtin(),
            serial: None,
            lot: Some(LotNumber::new(lot).unwrap()),
            expiry: Some(ExpiryDate::parse_yymmdd("260131").unwrap()),
            carrier: None,
            quantity,
            captured_at: Utc::now(),
            captured_by: "scanner-1".to_string(),
        }
    }

    // ── Serialized lines ─────────────────────────────────────────────

    #[test]
    fn serialized_scan_accepted_with_quantity_one() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        line.register_scan(serial_unit("ABC123")).unwrap();
        assert_eq!(line.scanned_total(), 1);
        assert_eq!(line.rows[0].quantity, 1);
    }

    #[test]
    fn duplicate_serial_rejected_and_line_unchanged() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        line.register_scan(serial_unit("ABC123")).unwrap();
        let before = line.clone();

        let err = line.register_scan(serial_unit("ABC123")).unwrap_err();
        assert!(matches!(err, ScanRejected::DuplicateSerial { .. }));
        assert_eq!(line, before);
    }

    #[test]
    fn serialized_line_rejects_unit_without_serial() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        let err = line.register_scan(batch_unit("L1", 1)).unwrap_err();
        assert!(matches!(err, ScanRejected::WrongTrackingClass { .. }));
    }

    #[test]
    fn serialized_cap_enforced_per_unit() {
        let mut line = DocumentLine::new(gtin(), 2, TrackingClass::Serialized);
        line.register_scan(serial_unit("S1")).unwrap();
        line.register_scan(serial_unit("S2")).unwrap();
        let err = line.register_scan(serial_unit("S3")).unwrap_err();
        assert!(matches!(err, ScanRejected::QuantityExceeded { .. }));
        assert_eq!(line.scanned_total(), 2);
    }

    // ── Batch lines ──────────────────────────────────────────────────

    #[test]
    fn batch_scans_merge_by_lot_and_expiry() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Batch);
        let first = line.register_scan(batch_unit("L1", 3)).unwrap();
        let second = line.register_scan(batch_unit("L1", 2)).unwrap();
        assert_eq!(first, second, "same key must merge into the same row");
        assert_eq!(line.rows.len(), 1);
        assert_eq!(line.scanned_total(), 5);

        line.register_scan(batch_unit("L2", 1)).unwrap();
        assert_eq!(line.rows.len(), 2);
    }

    #[test]
    fn over_cap_batch_scan_rejected_with_no_partial_merge() {
        let mut line = DocumentLine::new(gtin(), 2, TrackingClass::Batch);
        let err = line.register_scan(batch_unit("L1", 3)).unwrap_err();
        assert!(matches!(
            err,
            ScanRejected::QuantityExceeded {
                expected: 2,
                current: 0,
                attempted: 3,
                ..
            }
        ));
        assert!(line.rows.is_empty(), "ledger must remain empty");
    }

    #[test]
    fn over_cap_merge_leaves_existing_aggregate_untouched() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Batch);
        line.register_scan(batch_unit("L1", 4)).unwrap();
        let err = line.register_scan(batch_unit("L1", 2)).unwrap_err();
        assert!(matches!(err, ScanRejected::QuantityExceeded { .. }));
        assert_eq!(line.scanned_total(), 4);
    }

    #[test]
    fn near_max_quantity_rejected_without_overflow() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Batch);
        line.register_scan(batch_unit("L1", 4)).unwrap();

        let err = line.register_scan(batch_unit("L2", u32::MAX)).unwrap_err();
        assert!(matches!(
            err,
            ScanRejected::QuantityExceeded {
                current: 4,
                attempted: u32::MAX,
                ..
            }
        ));
        assert_eq!(line.scanned_total(), 4);
    }

    #[test]
    fn batch_line_requires_lot_and_expiry() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Batch);
        let mut unit = batch_unit("L1", 1);
        unit.expiry = None;
        let err = line.register_scan(unit).unwrap_err();
        assert!(matches!(err, ScanRejected::WrongTrackingClass { .. }));
    }

    #[test]
    fn batch_line_rejects_serialized_unit() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Batch);
        let err = line.register_scan(serial_unit("S1")).unwrap_err();
        assert!(matches!(err, ScanRejected::WrongTrackingClass { .. }));
    }

    // ── Untracked lines ──────────────────────────────────────────────

    #[test]
    fn untracked_line_merges_missing_key_parts_into_one_row() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Untracked);
        let mut a = batch_unit("L1", 2);
        a.lot = None;
        a.expiry = None;
        let mut b = batch_unit("L1", 3);
        b.lot = None;
        b.expiry = None;

        let first = line.register_scan(a).unwrap();
        let second = line.register_scan(b).unwrap();
        assert_eq!(first, second);
        assert_eq!(line.rows.len(), 1);
        assert_eq!(line.scanned_total(), 5);
    }

    // ── Removal ──────────────────────────────────────────────────────

    #[test]
    fn serial_removal_deletes_the_row() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        line.register_scan(serial_unit("S1")).unwrap();
        line.register_scan(serial_unit("S2")).unwrap();

        let removed = line.remove_units(&[RemovalRef::Serial(SerialNumber::new("S1").unwrap())]);
        assert_eq!(removed, 1);
        assert_eq!(line.rows.len(), 1);
        assert_eq!(line.rows[0].serial.as_ref().unwrap().as_str(), "S2");
    }

    #[test]
    fn aggregate_removal_decrements_and_deletes_at_zero() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Batch);
        line.register_scan(batch_unit("L1", 5)).unwrap();

        let key_lot = Some(LotNumber::new("L1").unwrap());
        let key_expiry = Some(ExpiryDate::parse_yymmdd("260131").unwrap());

        let removed = line.remove_units(&[RemovalRef::Aggregate {
            lot: key_lot.clone(),
            expiry: key_expiry,
            quantity: 2,
        }]);
        assert_eq!(removed, 2);
        assert_eq!(line.scanned_total(), 3);

        let removed = line.remove_units(&[RemovalRef::Aggregate {
            lot: key_lot,
            expiry: key_expiry,
            quantity: 3,
        }]);
        assert_eq!(removed, 3);
        assert!(line.rows.is_empty());
    }

    #[test]
    fn removal_ref_matching_nothing_is_skipped() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        line.register_scan(serial_unit("S1")).unwrap();
        let removed = line.remove_units(&[RemovalRef::Serial(SerialNumber::new("GHOST").unwrap())]);
        assert_eq!(removed, 0);
        assert_eq!(line.rows.len(), 1);
    }

    #[test]
    fn removed_serial_can_be_scanned_again() {
        let mut line = DocumentLine::new(gtin(), 5, TrackingClass::Serialized);
        line.register_scan(serial_unit("S1")).unwrap();
        line.remove_units(&[RemovalRef::Serial(SerialNumber::new("S1").unwrap())]);
        // The duplicate check only considers non-removed rows.
        line.register_scan(serial_unit("S1")).unwrap();
        assert_eq!(line.scanned_total(), 1);
    }
}
