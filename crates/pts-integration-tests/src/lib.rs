//! Shared fixtures for the scenario tests under `tests/`.

use chrono::Utc;

use pts_core::{ExpiryDate, Gtin, LotNumber, SerialNumber};
use pts_ledger::ScannedUnit;

/// The product every fixture ships: GTIN 08680001234567.
pub fn sample_gtin() -> Gtin {
    Gtin::new("08680001234567").unwrap()
}

/// A serialized scan of the sample product.
pub fn serialized_unit(serial: &str) -> ScannedUnit {
    ScannedUnit {
        gtin: sample_gtin(),
        serial: Some(SerialNumber::new(serial).unwrap()),
        lot: Some(LotNumber::new("L99").unwrap()),
        expiry: Some(ExpiryDate::parse_yymmdd("260131").unwrap()),
        carrier: None,
        quantity: 1,
        captured_at: Utc::now(),
        captured_by: "scanner-1".to_string(),
    }
}

/// A batch scan of the sample product.
pub fn batch_unit(lot: &str, quantity: u32) -> ScannedUnit {
    ScannedUnit {
        gtin: sample_gtin(),
        serial: None,
        lot: Some(LotNumber::new(lot).unwrap()),
        expiry: Some(ExpiryDate::parse_yymmdd("260131").unwrap()),
        carrier: None,
        quantity,
        captured_at: Utc::now(),
        captured_by: "scanner-1".to_string(),
    }
}

/// A transfer document with one 3-unit case, a pallet nesting a case, and
/// one loose product group.
pub const SAMPLE_TRANSFER_XML: &str = r#"<transfer>
  <sourceGLN>8680001000001</sourceGLN>
  <destinationGLN>8680001000002</destinationGLN>
  <actionType>shipment</actionType>
  <shipTo>Central Depot</shipTo>
  <documentNumber>DOC-2024-1105</documentNumber>
  <documentDate>2024-11-05</documentDate>
  <version>1.4</version>
  <note></note>
  <carrier carrierLabel="CASE-1" containerType="case">
    <productList GTIN="08680001234567" lotNumber="L99" expirationDate="2026-01-31">
      <serialNumber>U1</serialNumber>
      <serialNumber>U2</serialNumber>
      <serialNumber>U3</serialNumber>
    </productList>
  </carrier>
  <carrier carrierLabel="PALLET-9" containerType="pallet">
    <productList GTIN="08680001234567" lotNumber="L99" expirationDate="2026-01-31">
      <serialNumber>N1</serialNumber>
    </productList>
    <carrier carrierLabel="CASE-9" containerType="case">
      <productList GTIN="08680001234567" lotNumber="L99" expirationDate="2026-01-31">
        <serialNumber>N2</serialNumber>
      </productList>
    </carrier>
  </carrier>
  <productList GTIN="08680001234567" lotNumber="L42" expirationDate="2027-03-31">
    <serialNumber>LOOSE-1</serialNumber>
  </productList>
</transfer>"#;
