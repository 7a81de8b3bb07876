//! # Atomic Carrier Attach / Detach
//!
//! Carriers move through the ledger as a whole. Attaching admits every
//! leaf unit under a carrier — including nested sub-carriers — or none of
//! them; the quantity cap is checked for the combined set, so a carrier
//! that only partially fits is rejected outright. Detaching removes the
//! whole subtree's units and reports per-GTIN counts.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;

use pts_core::{CarrierLabel, Gtin, LineId, TrackingClass, UnitId};
use pts_ledger::{Ledger, LedgerError, ScannedUnit};

use crate::model::CarrierTree;

/// Errors from carrier-level ledger operations.
#[derive(Error, Debug)]
pub enum AttachError {
    /// The carrier label does not resolve in the tree snapshot.
    #[error("carrier {0} not found in transfer document")]
    CarrierNotFound(CarrierLabel),

    /// A unit inside the carrier belongs to a different product than the
    /// target line expects.
    #[error("carrier {label} holds product {found} but line expects {expected}")]
    WrongProduct {
        /// The carrier being attached.
        label: CarrierLabel,
        /// The line's expected product.
        expected: Gtin,
        /// The mismatched product found inside the carrier.
        found: Gtin,
    },

    /// The ledger rejected the combined admission (quantity cap, duplicate
    /// serial, tracking-class mismatch) or the line was missing.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A ledger row references a carrier label that does not resolve within
/// the current tree snapshot. Surfaced as a warning; unrelated operations
/// proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanCarrierReference {
    /// The line holding the dangling row.
    pub line: LineId,
    /// The dangling row.
    pub row_id: UnitId,
    /// The unresolved label.
    pub label: CarrierLabel,
}

/// Attach every leaf unit under `label` (nested sub-carriers included) to
/// a document line as one atomic operation.
///
/// All units are validated against the line's expected product first, then
/// admitted through the normal scan path against a scratch copy of the
/// line; only if every unit is accepted does the line change. A carrier
/// needing more room than the line has left is therefore rejected whole —
/// no partial admission of the units that would have fit.
///
/// Returns the ids of the rows the units landed in.
pub fn attach_units_from_carrier(
    tree: &CarrierTree,
    label: &CarrierLabel,
    ledger: &mut Ledger,
    line_id: LineId,
    operator: &str,
) -> Result<Vec<UnitId>, AttachError> {
    let carrier = tree
        .find(label)
        .ok_or_else(|| AttachError::CarrierNotFound(label.clone()))?;

    let line = ledger.line(line_id)?;
    let expected = line.product.clone();
    let class = line.tracking_class;

    // Collect leaves depth-first and validate product before any mutation.
    let mut units = Vec::new();
    collect_units(carrier, class, operator, &mut units);
    for unit in &units {
        if unit.gtin != expected {
            return Err(AttachError::WrongProduct {
                label: label.clone(),
                expected: expected.clone(),
                found: unit.gtin.clone(),
            });
        }
    }

    let ids = ledger.with_line(line_id, move |line| {
        let mut scratch = line.clone();
        let mut ids = Vec::with_capacity(units.len());
        for unit in units {
            ids.push(scratch.register_scan(unit)?);
        }
        *line = scratch;
        let mutated = !ids.is_empty();
        Ok((ids, mutated))
    })?;
    Ok(ids)
}

fn collect_units(
    carrier: &crate::model::Carrier,
    class: TrackingClass,
    operator: &str,
    out: &mut Vec<ScannedUnit>,
) {
    let now = Utc::now();
    for group in &carrier.groups {
        for serial in &group.serials {
            // Aggregate lines admit carrier units by quantity, not serial;
            // serialized lines keep the serial for duplicate checking.
            let serial = match class {
                TrackingClass::Serialized => Some(serial.clone()),
                TrackingClass::Batch | TrackingClass::Untracked => None,
            };
            out.push(ScannedUnit {
                gtin: group.gtin.clone(),
                serial,
                lot: group.lot.clone(),
                expiry: group.expiry,
                carrier: Some(carrier.label.clone()),
                quantity: 1,
                captured_at: now,
                captured_by: operator.to_string(),
            });
        }
    }
    for child in &carrier.children {
        collect_units(child, class, operator, out);
    }
}

/// Detach a carrier: remove every ledger row tagged with `label` or any
/// descendant label, across all lines, as one operation. Returns how many
/// units of each GTIN were removed.
pub fn detach_carrier(
    tree: &CarrierTree,
    label: &CarrierLabel,
    ledger: &mut Ledger,
) -> Result<HashMap<Gtin, u32>, AttachError> {
    let carrier = tree
        .find(label)
        .ok_or_else(|| AttachError::CarrierNotFound(label.clone()))?;
    let labels = carrier.labels();

    let line_ids: Vec<LineId> = ledger.lines().map(|l| l.line_id).collect();
    let mut counts: HashMap<Gtin, u32> = HashMap::new();

    for line_id in line_ids {
        let removed = ledger.with_line(line_id, |line| {
            let mut removed = Vec::new();
            line.rows.retain(|row| {
                let tagged = row
                    .carrier
                    .as_ref()
                    .is_some_and(|c| labels.contains(c));
                if tagged {
                    removed.push((row.gtin.clone(), row.quantity));
                }
                !tagged
            });
            let mutated = !removed.is_empty();
            Ok((removed, mutated))
        })?;
        for (gtin, quantity) in removed {
            *counts.entry(gtin).or_default() += quantity;
        }
    }
    Ok(counts)
}

/// Scan the ledger for carrier references that do not resolve within the
/// given tree snapshot. Each orphan is logged as a warning and returned;
/// nothing is modified and unrelated operations are unaffected.
pub fn orphan_references(ledger: &Ledger, tree: &CarrierTree) -> Vec<OrphanCarrierReference> {
    let mut orphans = Vec::new();
    for line in ledger.lines() {
        for row in &line.rows {
            if let Some(label) = &row.carrier {
                if !tree.contains(label) {
                    tracing::warn!(
                        line = %line.line_id,
                        row = %row.row_id,
                        carrier = %label,
                        "orphan carrier reference"
                    );
                    orphans.push(OrphanCarrierReference {
                        line: line.line_id,
                        row_id: row.row_id,
                        label: label.clone(),
                    });
                }
            }
        }
    }
    orphans
}
