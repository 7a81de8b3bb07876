//! # pts-carrier — Recursive Shipping Container Model
//!
//! Shipments group serialized units into carriers (cases, pallets) that
//! nest arbitrarily. This crate owns:
//!
//! - the immutable [`CarrierTree`] value parsed from the authority's wire
//!   XML ([`xml::parse`]) and serialized back to it ([`xml::serialize`]),
//! - the explicit [`flatten`] step producing persistence rows,
//! - the atomic ledger operations: [`attach::attach_units_from_carrier`]
//!   admits every leaf unit under a carrier or none of them, and
//!   [`attach::detach_carrier`] removes a carrier subtree whole.
//!
//! Parsing is a pure recursive descent over the XML event stream — the
//! tree is returned as a value, never accumulated through shared mutable
//! state, and flattening is a separate explicit pass.

pub mod attach;
pub mod flatten;
pub mod model;
pub mod xml;

pub use attach::{attach_units_from_carrier, detach_carrier, orphan_references, AttachError};
pub use flatten::FlatUnit;
pub use model::{Carrier, CarrierTree, ProductGroup, TransferHeader};
pub use xml::{parse, serialize, CarrierParseError};
