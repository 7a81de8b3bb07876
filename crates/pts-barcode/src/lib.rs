//! # pts-barcode — GS1 Linear Symbology Codec
//!
//! Decodes and encodes the fixed-token linear barcode text printed on
//! unit-level pharmaceutical packaging. The payload concatenates four GS1
//! Application Identifiers with **no field separators**:
//!
//! ```text
//! 01 <14-digit GTIN> 21 <serial> 17 <YYMMDD expiry> 10 <lot>
//! ```
//!
//! ## The Anchor Problem
//!
//! Serial (AI 21) and lot (AI 10) are free-form and variable length, so the
//! boundary between the serial and the expiry cannot be found by length.
//! The decoder scans forward from the serial start for the first position
//! where `17` is immediately followed by exactly six digits and then the
//! literal `10` — that triple condition is the anchor that splits the
//! string.
//!
//! ## Documented Ambiguity
//!
//! The symbology as deployed has no escaping or length prefix for the
//! free-form fields. A serial or lot that itself contains a
//! `17`+6digits+`10` substring decodes to a different split than it was
//! encoded from. This is inherent to the external format, not resolved
//! here; `decode(encode(x)) == x` holds for all inputs whose serial and lot
//! avoid that pattern (see the property tests).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pts_core::{ExpiryDate, Gtin, LotNumber, SerialNumber};

/// The structured attributes carried by one unit barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeAttributes {
    /// Product identifier (AI 01), canonical 14-digit form.
    pub gtin: Gtin,
    /// Unit serial number (AI 21).
    pub serial: SerialNumber,
    /// Expiry date (AI 17).
    pub expiry: ExpiryDate,
    /// Production lot (AI 10).
    pub lot: LotNumber,
}

/// The barcode text could not be decoded. The scan is rejected with no
/// state change anywhere.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed barcode symbol: {reason}")]
pub struct MalformedSymbol {
    /// What the decoder could not locate or parse.
    pub reason: String,
}

impl MalformedSymbol {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Decode barcode text into structured attributes.
///
/// Locates `01` and takes the following 14 characters as the GTIN, locates
/// `21`, then scans forward for the `17`+6digits+`10` anchor. Everything
/// between `21` and the anchor is the serial; everything after the anchor's
/// `10` is the lot.
pub fn decode(text: &str) -> Result<BarcodeAttributes, MalformedSymbol> {
    if !text.is_ascii() {
        return Err(MalformedSymbol::new("symbol contains non-ASCII data"));
    }
    let bytes = text.as_bytes();

    let gtin_ai = find_token(bytes, 0, b"01")
        .ok_or_else(|| MalformedSymbol::new("AI 01 (GTIN) not found"))?;
    let gtin_start = gtin_ai + 2;
    let gtin_end = gtin_start + 14;
    if bytes.len() < gtin_end {
        return Err(MalformedSymbol::new("truncated GTIN: fewer than 14 characters after AI 01"));
    }
    let gtin = Gtin::new(&text[gtin_start..gtin_end])
        .map_err(|e| MalformedSymbol::new(format!("bad GTIN field: {e}")))?;

    let serial_ai = find_token(bytes, gtin_end, b"21")
        .ok_or_else(|| MalformedSymbol::new("AI 21 (serial) not found"))?;
    let serial_start = serial_ai + 2;

    let anchor = find_anchor(bytes, serial_start)
        .ok_or_else(|| MalformedSymbol::new("17<YYMMDD>10 anchor not found after serial"))?;

    let serial = SerialNumber::new(&text[serial_start..anchor])
        .map_err(|e| MalformedSymbol::new(format!("bad serial field: {e}")))?;
    let expiry = ExpiryDate::parse_yymmdd(&text[anchor + 2..anchor + 8])
        .map_err(|e| MalformedSymbol::new(format!("bad expiry field: {e}")))?;
    let lot = LotNumber::new(&text[anchor + 10..])
        .map_err(|e| MalformedSymbol::new(format!("bad lot field: {e}")))?;

    Ok(BarcodeAttributes {
        gtin,
        serial,
        expiry,
        lot,
    })
}

/// Encode attributes into barcode text, tokens in fixed order
/// `01,GTIN,21,serial,17,YYMMDD,10,lot`. The GTIN is always emitted in its
/// zero-padded 14-digit form.
pub fn encode(attrs: &BarcodeAttributes) -> String {
    format!(
        "01{}21{}17{}10{}",
        attrs.gtin.as_str(),
        attrs.serial.as_str(),
        attrs.expiry.to_yymmdd(),
        attrs.lot.as_str()
    )
}

/// Find a two-byte token at or after `from`.
fn find_token(bytes: &[u8], from: usize, token: &[u8; 2]) -> Option<usize> {
    if bytes.len() < 2 {
        return None;
    }
    (from..=bytes.len() - 2).find(|&i| &bytes[i..i + 2] == token)
}

/// Scan forward for the first `17` immediately followed by exactly six
/// digits and then the literal `10`.
fn find_anchor(bytes: &[u8], from: usize) -> Option<usize> {
    // Anchor occupies 10 bytes: "17" + 6 digits + "10".
    if bytes.len() < 10 {
        return None;
    }
    (from..=bytes.len() - 10).find(|&i| {
        &bytes[i..i + 2] == b"17"
            && bytes[i + 2..i + 8].iter().all(u8::is_ascii_digit)
            && &bytes[i + 8..i + 10] == b"10"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(gtin: &str, serial: &str, yymmdd: &str, lot: &str) -> BarcodeAttributes {
        BarcodeAttributes {
            gtin: Gtin::new(gtin).unwrap(),
            serial: SerialNumber::new(serial).unwrap(),
            expiry: ExpiryDate::parse_yymmdd(yymmdd).unwrap(),
            lot: LotNumber::new(lot).unwrap(),
        }
    }

    #[test]
    fn worked_example_encodes_exactly() {
        let a = attrs("08680001234567", "ABC123", "260131", "L99");
        assert_eq!(encode(&a), "010868000123456721ABC1231726013110L99");
    }

    #[test]
    fn worked_example_decodes_all_four_fields() {
        let a = decode("010868000123456721ABC1231726013110L99").unwrap();
        assert_eq!(a.gtin.as_str(), "08680001234567");
        assert_eq!(a.serial.as_str(), "ABC123");
        assert_eq!(a.expiry.to_yymmdd(), "260131");
        assert_eq!(a.lot.as_str(), "L99");
    }

    #[test]
    fn encode_pads_short_gtin() {
        let a = attrs("8680001234567", "S1", "270601", "LOT7");
        assert!(encode(&a).starts_with("0108680001234567"));
    }

    #[test]
    fn decode_rejects_missing_gtin_token() {
        let err = decode("99ABC").unwrap_err();
        assert!(err.reason.contains("AI 01"));
    }

    #[test]
    fn decode_rejects_truncated_gtin() {
        let err = decode("01868000123").unwrap_err();
        assert!(err.reason.contains("truncated GTIN"));
    }

    #[test]
    fn decode_rejects_missing_anchor() {
        // Serial present but no 17<6 digits>10 sequence afterwards.
        let err = decode("010868000123456721ABC123").unwrap_err();
        assert!(err.reason.contains("anchor"));
    }

    #[test]
    fn decode_rejects_non_digit_expiry_candidate() {
        // "17" followed by letters is not an anchor.
        let err = decode("010868000123456721ABC17XYZABC10L").unwrap_err();
        assert!(err.reason.contains("anchor"));
    }

    #[test]
    fn serial_containing_digits_still_splits_on_anchor() {
        // Digits inside the serial are fine as long as they never form the
        // full 17+6digits+10 pattern.
        let text = "01086800012345672199X17A1726013110L99";
        // "17A" breaks the first candidate; the true anchor follows.
        let a = decode(text).unwrap();
        assert_eq!(a.serial.as_str(), "99X17A");
        assert_eq!(a.lot.as_str(), "L99");
    }

    #[test]
    fn ambiguous_serial_decodes_to_different_split() {
        // Documented ambiguity: a serial containing the anchor pattern is
        // split at the embedded pattern, not the real boundary.
        let a = attrs("08680001234567", "A1726020110B", "260131", "L1");
        let reparsed = decode(&encode(&a)).unwrap();
        assert_eq!(reparsed.serial.as_str(), "A");
        assert_ne!(reparsed, a);
    }

    #[test]
    fn decode_rejects_non_ascii() {
        assert!(decode("01086800012345672,1É1726013110L").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Round-trip holds whenever serial and lot cannot contain the
            /// anchor pattern (letters only here).
            #[test]
            fn round_trip_for_anchor_free_fields(
                gtin in "[0-9]{1,14}",
                serial in "[A-Za-z]{1,20}",
                lot in "[A-Za-z]{1,20}",
                year in 24u32..40,
                month in 1u32..13,
                day in 1u32..29,
            ) {
                let yymmdd = format!("{year:02}{month:02}{day:02}");
                let a = attrs(&gtin, &serial, &yymmdd, &lot);
                let decoded = decode(&encode(&a)).unwrap();
                prop_assert_eq!(decoded, a);
            }

            /// The decoder never panics on arbitrary ASCII noise.
            #[test]
            fn decode_is_total_on_ascii(text in "[ -~]{0,64}") {
                let _ = decode(&text);
            }
        }
    }
}
