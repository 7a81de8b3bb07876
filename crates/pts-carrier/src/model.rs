//! # Carrier Tree Model
//!
//! Immutable values describing one transfer document: the header fields,
//! the nested carriers, and the product groups inside them. Levels count
//! nesting depth from 1 at the top; the parser assigns them and propagates
//! each carrier's label to its children as `parent_label`.

use serde::{Deserialize, Serialize};

use pts_core::{CarrierLabel, ExpiryDate, Gln, Gtin, LotNumber, SerialNumber};

/// The `<transfer>` header block, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHeader {
    /// GLN of the sending party.
    pub source_gln: Gln,
    /// GLN of the receiving party.
    pub destination_gln: Gln,
    /// Action the document performs (e.g. "shipment").
    pub action_type: String,
    /// Free-form ship-to designation.
    pub ship_to: String,
    /// Document number assigned by the sender.
    pub document_number: String,
    /// Document date, carried verbatim as the wire string.
    pub document_date: String,
    /// Message format version.
    pub version: String,
    /// Free-form note; may be empty.
    pub note: String,
}

/// A group of units of one product sharing lot and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGroup {
    /// Product identifier, canonical 14-digit form.
    pub gtin: Gtin,
    /// Lot number attribute, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot: Option<LotNumber>,
    /// Expiry date attribute, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryDate>,
    /// The serialized units in this group.
    pub serials: Vec<SerialNumber>,
}

impl ProductGroup {
    /// Number of units in this group.
    pub fn unit_count(&self) -> usize {
        self.serials.len()
    }
}

/// One carrier (case, pallet, …) with its direct product groups and child
/// carriers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    /// The carrier's label (SSCC or internal code).
    pub label: CarrierLabel,
    /// Label of the enclosing carrier; `None` at the top level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_label: Option<CarrierLabel>,
    /// Container type attribute (e.g. "case", "pallet").
    pub container_type: String,
    /// Nesting depth, 1 at the top, strictly increasing downwards.
    pub level: u32,
    /// Product groups directly inside this carrier.
    pub groups: Vec<ProductGroup>,
    /// Nested carriers.
    pub children: Vec<Carrier>,
}

impl Carrier {
    /// Total number of leaf units in this carrier and all descendants.
    pub fn unit_count(&self) -> usize {
        self.groups.iter().map(ProductGroup::unit_count).sum::<usize>()
            + self.children.iter().map(Carrier::unit_count).sum::<usize>()
    }

    /// Find a carrier by label in this subtree.
    pub fn find(&self, label: &CarrierLabel) -> Option<&Carrier> {
        if &self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(label))
    }

    /// Collect this carrier's label and every descendant label.
    pub fn labels(&self) -> Vec<CarrierLabel> {
        let mut out = vec![self.label.clone()];
        for child in &self.children {
            out.extend(child.labels());
        }
        out
    }
}

/// One parsed transfer document: header, top-level carriers, and any
/// ungrouped product groups (the virtual rootless group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierTree {
    /// The header block.
    pub header: TransferHeader,
    /// Top-level carriers (level 1).
    pub carriers: Vec<Carrier>,
    /// Top-level product groups outside any carrier.
    pub loose: Vec<ProductGroup>,
}

impl CarrierTree {
    /// Find a carrier anywhere in the tree by label.
    pub fn find(&self, label: &CarrierLabel) -> Option<&Carrier> {
        self.carriers.iter().find_map(|c| c.find(label))
    }

    /// Whether a label resolves anywhere in this tree snapshot.
    pub fn contains(&self, label: &CarrierLabel) -> bool {
        self.find(label).is_some()
    }

    /// Total leaf units across carriers and loose groups.
    pub fn unit_count(&self) -> usize {
        self.carriers.iter().map(Carrier::unit_count).sum::<usize>()
            + self.loose.iter().map(ProductGroup::unit_count).sum::<usize>()
    }
}
