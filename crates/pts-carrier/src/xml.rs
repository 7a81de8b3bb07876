//! # Wire XML — Parse and Serialize
//!
//! The authority's transfer document format: a `<transfer>` root with a
//! fixed-order header block, then nested `<carrier>` elements containing
//! `<productList>` groups of `<serialNumber>` leaves. Ungrouped products
//! sit as top-level `<productList>` siblings.
//!
//! Parsing is a pure recursive descent over quick-xml events, returning an
//! immutable [`CarrierTree`]; levels are assigned from 1 at the top and
//! each carrier's label propagates to its children as `parent_label`.
//!
//! Serialization builds the document in one fixed element order so the
//! same tree always produces identical bytes. GTIN attributes are always
//! emitted in the zero-padded 14-digit form.

use std::fmt::Write as _;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use pts_core::{CarrierLabel, ExpiryDate, Gln, Gtin, LotNumber, SerialNumber};

use crate::model::{Carrier, CarrierTree, ProductGroup, TransferHeader};

/// The wire document could not be parsed into a carrier tree.
#[derive(Error, Debug)]
pub enum CarrierParseError {
    /// Underlying XML syntax error.
    #[error("xml syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute list.
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// The document ended before the expected structure was complete.
    #[error("unexpected end of document while reading <{context}>")]
    UnexpectedEof {
        /// The element being read when input ran out.
        context: String,
    },

    /// An element appeared where the schema does not allow it.
    #[error("unexpected element <{name}> inside <{context}>")]
    UnexpectedElement {
        /// The offending element name.
        name: String,
        /// The enclosing element.
        context: String,
    },

    /// A required attribute was missing.
    #[error("missing attribute {attribute} on <{element}>")]
    MissingAttribute {
        /// The element lacking the attribute.
        element: String,
        /// The missing attribute name.
        attribute: String,
    },

    /// A required header element was missing.
    #[error("missing header element <{element}> in <transfer>")]
    MissingHeaderField {
        /// The missing element name.
        element: String,
    },

    /// An attribute or text value failed domain validation.
    #[error("invalid value in <{context}>: {reason}")]
    BadValue {
        /// The enclosing element.
        context: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The root element was not `<transfer>`.
    #[error("document root is not <transfer>")]
    WrongRoot,
}

type Result<T> = std::result::Result<T, CarrierParseError>;

// ─── Parsing ─────────────────────────────────────────────────────────

/// Parse a wire transfer document.
pub fn parse(xml: &str) -> Result<CarrierTree> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"transfer" => {
                return parse_transfer(&mut reader);
            }
            Event::Decl(_) | Event::Comment(_) | Event::Text(_) => {}
            Event::Eof => {
                return Err(CarrierParseError::UnexpectedEof {
                    context: "transfer".to_string(),
                })
            }
            _ => return Err(CarrierParseError::WrongRoot),
        }
    }
}

const HEADER_FIELDS: [&str; 8] = [
    "sourceGLN",
    "destinationGLN",
    "actionType",
    "shipTo",
    "documentNumber",
    "documentDate",
    "version",
    "note",
];

fn parse_transfer(reader: &mut Reader<&[u8]>) -> Result<CarrierTree> {
    let mut header_values: [Option<String>; 8] = Default::default();
    let mut carriers = Vec::new();
    let mut loose = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(idx) = HEADER_FIELDS.iter().position(|f| f.as_bytes() == name) {
                    header_values[idx] = Some(read_text(reader, HEADER_FIELDS[idx])?);
                } else if name == b"carrier" {
                    carriers.push(parse_carrier(reader, &e, 1, None)?);
                } else if name == b"productList" {
                    loose.push(parse_group(reader, &e, false)?);
                } else {
                    return Err(unexpected(name, "transfer"));
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(idx) = HEADER_FIELDS.iter().position(|f| f.as_bytes() == name) {
                    header_values[idx] = Some(String::new());
                } else if name == b"carrier" {
                    carriers.push(carrier_shell(&e, 1, None)?);
                } else if name == b"productList" {
                    loose.push(parse_group(reader, &e, true)?);
                } else {
                    return Err(unexpected(name, "transfer"));
                }
            }
            Event::End(e) if e.name().as_ref() == b"transfer" => break,
            Event::Eof => {
                return Err(CarrierParseError::UnexpectedEof {
                    context: "transfer".to_string(),
                })
            }
            _ => {}
        }
    }

    let mut take = |idx: usize| {
        header_values[idx]
            .take()
            .ok_or_else(|| CarrierParseError::MissingHeaderField {
                element: HEADER_FIELDS[idx].to_string(),
            })
    };
    let header = TransferHeader {
        source_gln: parse_gln(&take(0)?, "sourceGLN")?,
        destination_gln: parse_gln(&take(1)?, "destinationGLN")?,
        action_type: take(2)?,
        ship_to: take(3)?,
        document_number: take(4)?,
        document_date: take(5)?,
        version: take(6)?,
        note: take(7)?,
    };

    Ok(CarrierTree {
        header,
        carriers,
        loose,
    })
}

/// A carrier with its attributes read and no contents yet — the whole
/// carrier when the element is self-closing.
fn carrier_shell(
    start: &BytesStart<'_>,
    level: u32,
    parent_label: Option<CarrierLabel>,
) -> Result<Carrier> {
    let label_raw = required_attr(start, "carrier", "carrierLabel")?;
    let label = CarrierLabel::new(label_raw)
        .map_err(|e| bad_value("carrier", format!("carrierLabel: {e}")))?;
    let container_type = required_attr(start, "carrier", "containerType")?;
    Ok(Carrier {
        label,
        parent_label,
        container_type,
        level,
        groups: Vec::new(),
        children: Vec::new(),
    })
}

fn parse_carrier(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    level: u32,
    parent_label: Option<CarrierLabel>,
) -> Result<Carrier> {
    let mut carrier = carrier_shell(start, level, parent_label)?;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"carrier" => carrier.children.push(parse_carrier(
                        reader,
                        &e,
                        level + 1,
                        Some(carrier.label.clone()),
                    )?),
                    b"productList" => carrier.groups.push(parse_group(reader, &e, false)?),
                    other => return Err(unexpected(other, "carrier")),
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"carrier" => carrier.children.push(carrier_shell(
                        &e,
                        level + 1,
                        Some(carrier.label.clone()),
                    )?),
                    b"productList" => carrier.groups.push(parse_group(reader, &e, true)?),
                    other => return Err(unexpected(other, "carrier")),
                }
            }
            Event::End(e) if e.name().as_ref() == b"carrier" => break,
            Event::Eof => {
                return Err(CarrierParseError::UnexpectedEof {
                    context: "carrier".to_string(),
                })
            }
            _ => {}
        }
    }

    Ok(carrier)
}

fn parse_group(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    is_empty: bool,
) -> Result<ProductGroup> {
    let gtin_raw = required_attr(start, "productList", "GTIN")?;
    let gtin =
        Gtin::new(gtin_raw).map_err(|e| bad_value("productList", format!("GTIN: {e}")))?;
    let lot = match optional_attr(start, "lotNumber")? {
        Some(raw) if !raw.is_empty() => Some(
            LotNumber::new(raw).map_err(|e| bad_value("productList", format!("lotNumber: {e}")))?,
        ),
        _ => None,
    };
    let expiry = match optional_attr(start, "expirationDate")? {
        Some(raw) if !raw.is_empty() => Some(parse_expiry(&raw)?),
        _ => None,
    };

    let mut serials = Vec::new();
    if !is_empty {
        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"serialNumber" => {
                    let text = read_text(reader, "serialNumber")?;
                    serials.push(
                        SerialNumber::new(text)
                            .map_err(|e| bad_value("serialNumber", e.to_string()))?,
                    );
                }
                Event::End(e) if e.name().as_ref() == b"productList" => break,
                Event::Eof => {
                    return Err(CarrierParseError::UnexpectedEof {
                        context: "productList".to_string(),
                    })
                }
                Event::Start(e) => {
                    let name = e.name();
                    return Err(unexpected(name.as_ref(), "productList"));
                }
                _ => {}
            }
        }
    }

    Ok(ProductGroup {
        gtin,
        lot,
        expiry,
        serials,
    })
}

/// Read the text content of the current element up to its end tag.
fn read_text(reader: &mut Reader<&[u8]>, element: &str) -> Result<String> {
    let mut out = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::End(e) if e.name().as_ref() == element.as_bytes() => return Ok(out),
            Event::Eof => {
                return Err(CarrierParseError::UnexpectedEof {
                    context: element.to_string(),
                })
            }
            Event::Start(e) => {
                let name = e.name();
                return Err(unexpected(name.as_ref(), element));
            }
            _ => {}
        }
    }
}

fn required_attr(start: &BytesStart<'_>, element: &str, attribute: &str) -> Result<String> {
    optional_attr(start, attribute)?.ok_or_else(|| CarrierParseError::MissingAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
    })
}

fn optional_attr(start: &BytesStart<'_>, attribute: &str) -> Result<Option<String>> {
    match start.try_get_attribute(attribute)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn parse_gln(raw: &str, element: &str) -> Result<Gln> {
    Gln::new(raw).map_err(|e| bad_value(element, e.to_string()))
}

/// Expiry attributes appear both as ISO `yyyy-MM-dd` and as the 6-digit
/// barcode form, depending on the producing system.
fn parse_expiry(raw: &str) -> Result<ExpiryDate> {
    if raw.len() == 6 {
        ExpiryDate::parse_yymmdd(raw).map_err(|e| bad_value("productList", e.to_string()))
    } else {
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(ExpiryDate::from_date)
            .map_err(|e| bad_value("productList", format!("expirationDate: {e}")))
    }
}

fn unexpected(name: &[u8], context: &str) -> CarrierParseError {
    CarrierParseError::UnexpectedElement {
        name: String::from_utf8_lossy(name).into_owned(),
        context: context.to_string(),
    }
}

fn bad_value(context: &str, reason: impl Into<String>) -> CarrierParseError {
    CarrierParseError::BadValue {
        context: context.to_string(),
        reason: reason.into(),
    }
}

// ─── Serialization ───────────────────────────────────────────────────

/// Serialize a carrier tree back to the wire format.
///
/// Elements are emitted in the fixed header order, then carriers, then
/// loose product groups; the same tree always yields identical bytes.
pub fn serialize(tree: &CarrierTree) -> String {
    let mut xml = String::new();
    // Writing to a String cannot fail; errors below are structurally
    // impossible and ignored.
    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(xml, "<transfer>");

    let h = &tree.header;
    write_field(&mut xml, 1, "sourceGLN", h.source_gln.as_str());
    write_field(&mut xml, 1, "destinationGLN", h.destination_gln.as_str());
    write_field(&mut xml, 1, "actionType", &h.action_type);
    write_field(&mut xml, 1, "shipTo", &h.ship_to);
    write_field(&mut xml, 1, "documentNumber", &h.document_number);
    write_field(&mut xml, 1, "documentDate", &h.document_date);
    write_field(&mut xml, 1, "version", &h.version);
    write_field(&mut xml, 1, "note", &h.note);

    for carrier in &tree.carriers {
        write_carrier(&mut xml, 1, carrier);
    }
    for group in &tree.loose {
        write_group(&mut xml, 1, group);
    }

    let _ = writeln!(xml, "</transfer>");
    xml
}

fn write_field(xml: &mut String, depth: usize, name: &str, value: &str) {
    let _ = writeln!(
        xml,
        "{pad}<{name}>{}</{name}>",
        escape(value),
        pad = "  ".repeat(depth)
    );
}

fn write_carrier(xml: &mut String, depth: usize, carrier: &Carrier) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(
        xml,
        r#"{pad}<carrier carrierLabel="{}" containerType="{}">"#,
        escape(carrier.label.as_str()),
        escape(&carrier.container_type)
    );
    for group in &carrier.groups {
        write_group(xml, depth + 1, group);
    }
    for child in &carrier.children {
        write_carrier(xml, depth + 1, child);
    }
    let _ = writeln!(xml, "{pad}</carrier>");
}

fn write_group(xml: &mut String, depth: usize, group: &ProductGroup) {
    let pad = "  ".repeat(depth);
    let mut attrs = format!(r#"GTIN="{}""#, group.gtin.as_str());
    if let Some(lot) = &group.lot {
        let _ = write!(attrs, r#" lotNumber="{}""#, escape(lot.as_str()));
    }
    if let Some(expiry) = &group.expiry {
        let _ = write!(attrs, r#" expirationDate="{}""#, expiry.to_iso());
    }

    if group.serials.is_empty() {
        let _ = writeln!(xml, "{pad}<productList {attrs}/>");
        return;
    }
    let _ = writeln!(xml, "{pad}<productList {attrs}>");
    for serial in &group.serials {
        let _ = writeln!(
            xml,
            "{pad}  <serialNumber>{}</serialNumber>",
            escape(serial.as_str())
        );
    }
    let _ = writeln!(xml, "{pad}</productList>");
}

/// Minimal XML escaping for text and attribute values.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
