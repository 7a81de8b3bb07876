//! # Expiry Dates — YYMMDD Wire Form
//!
//! GS1 AI 17 carries expiry as six digits, `YYMMDD`. The notification
//! payload carries the same date as ISO `yyyy-MM-dd`. [`ExpiryDate`] owns
//! both renderings so no caller ever reformats date strings by hand.
//!
//! Two-digit years map into 2000–2099. Pharmaceutical expiry dates are
//! always in the near future, so the century window is not configurable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An expiry date, parsed from and rendered to the 6-digit GS1 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExpiryDate(NaiveDate);

impl ExpiryDate {
    /// Parse a `YYMMDD` wire value.
    ///
    /// GS1 allows day `00` meaning "end of month"; that convention is
    /// resolved here to the actual last day of the month so downstream
    /// comparisons work on real dates.
    pub fn parse_yymmdd(raw: &str) -> Result<Self, ValidationError> {
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidExpiry {
                value: raw.to_string(),
                reason: "must be exactly 6 digits (YYMMDD)".to_string(),
            });
        }
        // Lengths checked above; these slices cannot fail to parse.
        let yy: i32 = raw[0..2].parse().map_err(|_| invalid(raw, "year"))?;
        let mm: u32 = raw[2..4].parse().map_err(|_| invalid(raw, "month"))?;
        let dd: u32 = raw[4..6].parse().map_err(|_| invalid(raw, "day"))?;
        let year = 2000 + yy;

        let date = if dd == 0 {
            last_day_of_month(year, mm)
        } else {
            NaiveDate::from_ymd_opt(year, mm, dd)
        };
        date.map(Self).ok_or_else(|| ValidationError::InvalidExpiry {
            value: raw.to_string(),
            reason: "not a valid calendar date".to_string(),
        })
    }

    /// Construct from an existing calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Render the 6-digit `YYMMDD` wire form.
    pub fn to_yymmdd(&self) -> String {
        self.0.format("%y%m%d").to_string()
    }

    /// Render the ISO `yyyy-MM-dd` payload form.
    pub fn to_iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// The underlying calendar date.
    pub fn as_date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for ExpiryDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // Accept either rendering on input; emit ISO on output.
        if raw.len() == 6 {
            Self::parse_yymmdd(&raw).map_err(serde::de::Error::custom)
        } else {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map(Self)
                .map_err(serde::de::Error::custom)
        }
    }
}

fn invalid(raw: &str, part: &str) -> ValidationError {
    ValidationError::InvalidExpiry {
        value: raw.to_string(),
        reason: format!("unparseable {part}"),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_y, next_m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)?.pred_opt()
}
