//! # Flattening
//!
//! Turns the recursive tree into flat rows for persistence and for
//! regenerating the wire format. Flattening is an explicit step separate
//! from parsing — the tree itself is never built through a shared
//! accumulator.

use serde::{Deserialize, Serialize};

use pts_core::{CarrierLabel, ExpiryDate, Gtin, LotNumber, SerialNumber};

use crate::model::{Carrier, CarrierTree, ProductGroup};

/// One leaf unit with its position in the carrier hierarchy.
///
/// Loose (ungrouped) units carry no carrier label and level 0 — the
/// virtual rootless group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatUnit {
    /// Product identifier.
    pub gtin: Gtin,
    /// The unit's serial number.
    pub serial: SerialNumber,
    /// Lot of the enclosing product group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot: Option<LotNumber>,
    /// Expiry of the enclosing product group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryDate>,
    /// The carrier directly containing this unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_label: Option<CarrierLabel>,
    /// That carrier's parent, when nested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_carrier_label: Option<CarrierLabel>,
    /// Nesting level of the containing carrier; 0 for loose units.
    pub level: u32,
}

impl CarrierTree {
    /// Flatten the tree into per-unit rows, in document order: carrier
    /// subtrees first (depth-first), then loose groups.
    pub fn flatten(&self) -> Vec<FlatUnit> {
        let mut out = Vec::with_capacity(self.unit_count());
        for carrier in &self.carriers {
            flatten_carrier(carrier, &mut out);
        }
        for group in &self.loose {
            push_group(group, None, None, 0, &mut out);
        }
        out
    }
}

fn flatten_carrier(carrier: &Carrier, out: &mut Vec<FlatUnit>) {
    for group in &carrier.groups {
        push_group(
            group,
            Some(carrier.label.clone()),
            carrier.parent_label.clone(),
            carrier.level,
            out,
        );
    }
    for child in &carrier.children {
        flatten_carrier(child, out);
    }
}

fn push_group(
    group: &ProductGroup,
    carrier_label: Option<CarrierLabel>,
    parent_carrier_label: Option<CarrierLabel>,
    level: u32,
    out: &mut Vec<FlatUnit>,
) {
    for serial in &group.serials {
        out.push(FlatUnit {
            gtin: group.gtin.clone(),
            serial: serial.clone(),
            lot: group.lot.clone(),
            expiry: group.expiry,
            carrier_label: carrier_label.clone(),
            parent_carrier_label: parent_carrier_label.clone(),
            level,
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::xml::parse;

    const SAMPLE: &str = r#"<transfer>
  <sourceGLN>8680001000001</sourceGLN>
  <destinationGLN>8680001000002</destinationGLN>
  <actionType>shipment</actionType>
  <shipTo>Depot</shipTo>
  <documentNumber>DOC-1</documentNumber>
  <documentDate>2024-11-05</documentDate>
  <version>1.4</version>
  <note></note>
  <carrier carrierLabel="PALLET-1" containerType="pallet">
    <productList GTIN="08680001234567" lotNumber="L99" expirationDate="2026-01-31">
      <serialNumber>P1</serialNumber>
    </productList>
    <carrier carrierLabel="CASE-1" containerType="case">
      <productList GTIN="08680001234567" lotNumber="L99" expirationDate="2026-01-31">
        <serialNumber>C1</serialNumber>
      </productList>
    </carrier>
  </carrier>
  <productList GTIN="08680007654321">
    <serialNumber>LOOSE1</serialNumber>
  </productList>
</transfer>"#;

    #[test]
    fn flatten_emits_one_row_per_serial_with_hierarchy() {
        let tree = parse(SAMPLE).unwrap();
        let flat = tree.flatten();
        assert_eq!(flat.len(), 3);

        let p1 = &flat[0];
        assert_eq!(p1.serial.as_str(), "P1");
        assert_eq!(p1.carrier_label.as_ref().unwrap().as_str(), "PALLET-1");
        assert_eq!(p1.parent_carrier_label, None);
        assert_eq!(p1.level, 1);

        let c1 = &flat[1];
        assert_eq!(c1.serial.as_str(), "C1");
        assert_eq!(c1.carrier_label.as_ref().unwrap().as_str(), "CASE-1");
        assert_eq!(
            c1.parent_carrier_label.as_ref().unwrap().as_str(),
            "PALLET-1"
        );
        assert_eq!(c1.level, 2);
    }

    #[test]
    fn loose_units_flatten_with_level_zero_and_no_carrier() {
        let tree = parse(SAMPLE).unwrap();
        let flat = tree.flatten();
        let loose = &flat[2];
        assert_eq!(loose.serial.as_str(), "LOOSE1");
        assert_eq!(loose.carrier_label, None);
        assert_eq!(loose.level, 0);
        assert_eq!(loose.lot, None);
    }
}
