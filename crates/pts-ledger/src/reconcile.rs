//! # Row Reconciliation
//!
//! Brings a line's stored rows in sync with a desired row set in one pass,
//! diffing by stable row identity ([`LedgerRow::row_id`]) — never by array
//! position. Applying the same desired set twice is a no-op the second
//! time: all counts come back zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use pts_core::UnitId;

use crate::line::{DocumentLine, LedgerRow, ScanRejected};

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileCounts {
    /// Rows inserted (present in desired, absent from the line).
    pub inserted: usize,
    /// Rows updated (present in both, fields differ).
    pub updated: usize,
    /// Rows deleted (present on the line, absent from desired).
    pub deleted: usize,
}

impl ReconcileCounts {
    /// Whether the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.deleted == 0
    }
}

impl DocumentLine {
    /// Replace this line's rows with `desired`, returning what changed.
    ///
    /// The quantity cap applies to the desired set as a whole: if the
    /// desired rows sum above `expected_quantity` the entire pass is
    /// rejected and the line keeps its current rows.
    pub fn reconcile(&mut self, desired: Vec<LedgerRow>) -> Result<ReconcileCounts, ScanRejected> {
        let desired_total: u32 = desired.iter().map(|r| r.quantity).sum();
        if desired_total > self.expected_quantity {
            return Err(ScanRejected::QuantityExceeded {
                line: self.line_id,
                expected: self.expected_quantity,
                current: self.scanned_total(),
                attempted: desired_total,
            });
        }

        let current: HashMap<UnitId, &LedgerRow> =
            self.rows.iter().map(|r| (r.row_id, r)).collect();

        let mut counts = ReconcileCounts::default();
        for row in &desired {
            match current.get(&row.row_id) {
                None => counts.inserted += 1,
                Some(existing) if *existing != row => counts.updated += 1,
                Some(_) => {}
            }
        }
        let desired_ids: HashMap<UnitId, ()> =
            desired.iter().map(|r| (r.row_id, ())).collect();
        counts.deleted = self
            .rows
            .iter()
            .filter(|r| !desired_ids.contains_key(&r.row_id))
            .count();

        self.rows = desired;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use pts_core::{Gtin, SerialNumber, TrackingClass};

    use super::*;

    fn gtin() -> Gtin {
        Gtin::new("08680001234567").unwrap()
    }

    fn row(serial: &str, quantity: u32) -> LedgerRow {
        LedgerRow {
            row_id: UnitId::new(),
            gtin: gtin(),
            serial: Some(SerialNumber::new(serial).unwrap()),
            lot: None,
            expiry: None,
            carrier: None,
            quantity,
            captured_at: Utc::now(),
            captured_by: "scanner-1".to_string(),
        }
    }

    #[test]
    fn reconcile_reports_inserts_updates_and_deletes() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Serialized);
        let keep = row("KEEP", 1);
        let stale = row("STALE", 1);
        line.rows = vec![keep.clone(), stale];

        let mut updated = keep.clone();
        updated.captured_by = "scanner-2".to_string();
        let fresh = row("NEW", 1);

        let counts = line.reconcile(vec![updated, fresh]).unwrap();
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.deleted, 1);
    }

    #[test]
    fn second_identical_reconcile_is_all_zeros() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Serialized);
        let desired = vec![row("A", 1), row("B", 1)];

        let first = line.reconcile(desired.clone()).unwrap();
        assert_eq!(first.inserted, 2);

        let second = line.reconcile(desired).unwrap();
        assert!(second.is_noop(), "identical desired set must be a no-op");
    }

    #[test]
    fn identity_is_row_id_not_position() {
        let mut line = DocumentLine::new(gtin(), 10, TrackingClass::Serialized);
        let a = row("A", 1);
        let b = row("B", 1);
        line.rows = vec![a.clone(), b.clone()];

        // Same rows, reversed order: nothing changed.
        let counts = line.reconcile(vec![b, a]).unwrap();
        assert!(counts.is_noop());
    }

    #[test]
    fn over_cap_desired_set_rejected_whole() {
        let mut line = DocumentLine::new(gtin(), 2, TrackingClass::Serialized);
        let original = vec![row("A", 1)];
        line.rows = original.clone();

        let err = line
            .reconcile(vec![row("B", 1), row("C", 1), row("D", 1)])
            .unwrap_err();
        assert!(matches!(err, ScanRejected::QuantityExceeded { .. }));
        assert_eq!(line.rows, original, "rejected pass must not touch rows");
    }
}
