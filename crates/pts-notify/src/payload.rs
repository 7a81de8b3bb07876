//! # Notification Payload Shapes
//!
//! The authority's notify endpoint takes `{"productList": [{gtin, sn, xd,
//! bn}]}` and answers `{"productList": [{gtin, sn, uc}]}`. Field names are
//! the authority's, not ours: `sn` serial, `xd` expiry as `yyyy-MM-dd`,
//! `bn` lot, `uc` unit response code.

use serde::{Deserialize, Serialize};

use pts_core::{ExpiryDate, Gtin, LotNumber, SerialNumber};

/// The response code meaning "accepted", after normalization.
pub const SUCCESS_CODE: &str = "0";

/// One unit in an outbound notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundItem {
    /// 14-digit product code.
    pub gtin: Gtin,
    /// Serial number.
    pub sn: SerialNumber,
    /// Expiry date, `yyyy-MM-dd`.
    pub xd: String,
    /// Lot number.
    pub bn: LotNumber,
}

impl OutboundItem {
    /// Build an item from its typed parts.
    pub fn new(gtin: Gtin, sn: SerialNumber, expiry: ExpiryDate, bn: LotNumber) -> Self {
        Self {
            gtin,
            sn,
            xd: expiry.to_iso(),
            bn,
        }
    }
}

/// One unit row in the authority's acknowledgement response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Product code the row refers to.
    pub gtin: Gtin,
    /// Serial number the row refers to.
    pub sn: SerialNumber,
    /// Unit response code, as sent by the authority (may carry leading
    /// zeros).
    pub uc: String,
}

/// Normalize an authority response code.
///
/// The authority is inconsistent about zero padding ("0", "00" and "000"
/// all mean accepted; "021" and "21" are the same rejection). Leading
/// zeros are stripped; an all-zero code collapses to `"0"`.
pub fn normalize_response_code(raw: &str) -> String {
    let stripped = raw.trim().trim_start_matches('0');
    if stripped.is_empty() {
        SUCCESS_CODE.to_string()
    } else {
        stripped.to_string()
    }
}
