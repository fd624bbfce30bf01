//! Shared types used across the Docket engine.
//!
//! This module defines the natural-key case identifier, the normalized
//! case record produced by a successful fetch, and the request/failure
//! shapes exchanged with the external layer.

use crate::error::DocketError;
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Earliest plausible filing year accepted for a lookup.
pub const MIN_CASE_YEAR: i32 = 1950;

/// Natural key identifying a case across fetches: (type, number, year).
///
/// The constructor validates all three components so no network
/// interaction can happen on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseKey {
    case_type: String,
    case_number: String,
    year: i32,
}

impl CaseKey {
    /// Create a validated `CaseKey`.
    ///
    /// # Errors
    /// Returns `DocketError::Validation` if:
    /// - the case type is empty or contains unexpected characters
    /// - the case number is empty or not purely numeric
    /// - the year is outside the plausible range
    pub fn new(
        case_type: impl Into<String>,
        case_number: impl Into<String>,
        year: i32,
    ) -> Result<Self, DocketError> {
        let case_type = case_type.into().trim().to_string();
        let case_number = case_number.into().trim().to_string();

        Self::validate_case_type(&case_type)?;
        Self::validate_case_number(&case_number)?;
        Self::validate_year(year)?;

        Ok(Self {
            case_type,
            case_number,
            year,
        })
    }

    /// The case type designation, e.g. `W.P.(C)`.
    #[must_use]
    pub fn case_type(&self) -> &str {
        &self.case_type
    }

    /// The numeric case number as entered.
    #[must_use]
    pub fn case_number(&self) -> &str {
        &self.case_number
    }

    /// The filing year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    fn validate_case_type(case_type: &str) -> Result<(), DocketError> {
        static TYPE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TYPE_REGEX.get_or_init(|| {
            // Court designations: uppercase letters, digits, dots,
            // parentheses, hyphens and embedded spaces.
            Regex::new(r"^[A-Z0-9][A-Z0-9.()\- ]{0,39}$").expect("valid regex")
        });

        if case_type.is_empty() {
            return Err(DocketError::Validation(
                "case type must not be empty".to_string(),
            ));
        }

        if regex.is_match(case_type) {
            Ok(())
        } else {
            Err(DocketError::Validation(format!(
                "invalid case type designation: '{case_type}'"
            )))
        }
    }

    fn validate_case_number(case_number: &str) -> Result<(), DocketError> {
        if case_number.is_empty() {
            return Err(DocketError::Validation(
                "case number must not be empty".to_string(),
            ));
        }

        if case_number.len() > 10 || !case_number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DocketError::Validation(format!(
                "case number must be numeric, got '{case_number}'"
            )));
        }

        Ok(())
    }

    fn validate_year(year: i32) -> Result<(), DocketError> {
        let current_year = Utc::now().year();
        if year < MIN_CASE_YEAR || year > current_year {
            return Err(DocketError::Validation(format!(
                "year must be between {MIN_CASE_YEAR} and {current_year}, got {year}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.case_type, self.case_number, self.year)
    }
}

/// A single order or judgment entry attached to a case.
///
/// Identity within a case is the (date, description) pair; the PDF
/// location is nullable because some entries list no downloadable
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    /// Date the order was passed, if it could be determined
    pub order_date: Option<NaiveDate>,
    /// Order/judgment description text
    pub description: String,
    /// Absolute URL of the order PDF, if one was listed
    pub pdf_url: Option<String>,
}

/// Canonical state of a court case as last observed.
///
/// Optional fields are "unknown" rather than errors: the parser maps
/// missing markup to `None` and the record stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Natural key of the case
    pub key: CaseKey,
    /// Display title, e.g. "X vs Y"
    pub title: Option<String>,
    /// Petitioner party name
    pub petitioner: Option<String>,
    /// Respondent party name
    pub respondent: Option<String>,
    /// Date of filing/registration
    pub filing_date: Option<NaiveDate>,
    /// Next listed hearing date
    pub next_hearing_date: Option<NaiveDate>,
    /// Current case status/stage
    pub status: Option<String>,
    /// Bench/coram information
    pub bench: Option<String>,
    /// Orders and judgments in page order
    pub orders: Vec<OrderEntry>,
}

impl CaseRecord {
    /// Create an empty record for a key; the parser fills fields in.
    #[must_use]
    pub fn new(key: CaseKey) -> Self {
        Self {
            key,
            title: None,
            petitioner: None,
            respondent: None,
            filing_date: None,
            next_hearing_date: None,
            status: None,
            bench: None,
            orders: Vec::new(),
        }
    }
}

/// Inbound search request from the external layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Case type designation
    pub case_type: String,
    /// Case number (numeric string)
    pub case_number: String,
    /// Filing year
    pub year: i32,
    /// Pre-supplied captcha code, if the caller already solved one
    pub captcha_code: Option<String>,
}

/// Structured failure returned to the external layer.
///
/// `kind` is a stable machine-readable discriminator; `message` is
/// human-readable and never contains raw remote page content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFailure {
    /// Stable failure kind, e.g. `site_unreachable`
    pub kind: String,
    /// Human-readable description
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_key_valid() {
        let key = CaseKey::new("W.P.(C)", "1234", 2023).expect("valid key");
        assert_eq!(key.case_type(), "W.P.(C)");
        assert_eq!(key.case_number(), "1234");
        assert_eq!(key.year(), 2023);
        assert_eq!(key.to_string(), "W.P.(C) 1234/2023");
    }

    #[test]
    fn test_case_key_trims_whitespace() {
        let key = CaseKey::new(" CRL.A. ", " 42 ", 2020).expect("valid key");
        assert_eq!(key.case_type(), "CRL.A.");
        assert_eq!(key.case_number(), "42");
    }

    #[test]
    fn test_case_key_rejects_non_numeric_number() {
        let result = CaseKey::new("W.P.(C)", "12a4", 2023);
        assert!(matches!(result, Err(DocketError::Validation(_))));
    }

    #[test]
    fn test_case_key_rejects_empty_fields() {
        assert!(CaseKey::new("", "1234", 2023).is_err());
        assert!(CaseKey::new("W.P.(C)", "", 2023).is_err());
    }

    #[test]
    fn test_case_key_rejects_implausible_year() {
        assert!(CaseKey::new("W.P.(C)", "1234", 1899).is_err());
        assert!(CaseKey::new("W.P.(C)", "1234", 3000).is_err());
    }

    #[test]
    fn test_case_key_rejects_lowercase_type() {
        let result = CaseKey::new("w.p.(c)", "1234", 2023);
        assert!(matches!(result, Err(DocketError::Validation(_))));
    }

    #[test]
    fn test_order_entry_equality_is_date_description() {
        let a = OrderEntry {
            order_date: NaiveDate::from_ymd_opt(2023, 5, 1),
            description: "Order disposing application".to_string(),
            pdf_url: Some("https://court.example/orders/1.pdf".to_string()),
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.pdf_url = None;
        // Full struct equality differs, but identity for dedupe is the
        // (date, description) pair handled by the store.
        assert_eq!(a.order_date, b.order_date);
        assert_eq!(a.description, b.description);
    }

    #[test]
    fn test_case_record_serde_roundtrip() {
        let key = CaseKey::new("CS(COMM)", "88", 2021).expect("valid key");
        let mut record = CaseRecord::new(key);
        record.petitioner = Some("Acme Ltd".to_string());

        let json = serde_json::to_string(&record).expect("serialize record");
        let parsed: CaseRecord = serde_json::from_str(&json).expect("parse record");
        assert_eq!(parsed, record);
    }
}
