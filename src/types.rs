//! Core types for nav-query

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of the bare tax number (7 digits + check digit)
pub const BASE_LEN: usize = 8;

/// Length of a full registration number (base + VAT code + county code)
pub const FULL_LEN: usize = 11;

/// Maximum number of identifiers in one upload.
///
/// The service accepts files up to 200 KiB; each record is 8 digits + newline.
pub const MAX_RECORD_COUNT: usize = (200 << 10) / (BASE_LEN + 1);

/// Default number of identifiers per chunk in streaming lookups
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// One answered (or locally rejected) tax number
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxRecord {
    /// Identifier as returned by the service (or as submitted, when invalid)
    pub tax_number: String,
    /// True only for records present in the authority's response
    pub valid: bool,
    /// True if the service returned a full 11-character registration number
    pub exists: bool,
    /// Registered owner name (empty for invalid records)
    pub owner: String,
}

impl TaxRecord {
    /// Record for an identifier that failed the local checksum
    pub fn invalid(tax_number: impl Into<String>) -> Self {
        Self {
            tax_number: tax_number.into(),
            valid: false,
            exists: false,
            owner: String::new(),
        }
    }

    /// Record for an identifier found in the result document
    pub fn found(tax_number: impl Into<String>, owner: impl Into<String>) -> Self {
        let tax_number = tax_number.into();
        let exists = tax_number.len() == FULL_LEN;
        Self {
            tax_number,
            valid: true,
            exists,
            owner: owner.into(),
        }
    }

    /// The 8-character base form of the identifier
    pub fn base(&self) -> &str {
        base_of(&self.tax_number)
    }
}

/// Line format used on the process boundary: `<id>;"<owner>"` or `<id>;INVALID`
impl std::fmt::Display for TaxRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.valid {
            write!(f, "{};{:?}", self.tax_number, self.owner)
        } else {
            write!(f, "{};INVALID", self.tax_number)
        }
    }
}

/// Session parameters scraped from the service's upload form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionParams {
    /// Upload endpoint (the iframe target)
    pub url: String,
    /// Hidden and visible form fields, name -> values in document order
    pub fields: BTreeMap<String, Vec<String>>,
    /// Name of the `type=file` input
    pub upload_field: String,
}

/// First [`BASE_LEN`] bytes of an identifier, or all of it if shorter or not ASCII-aligned
pub(crate) fn base_of(tax_number: &str) -> &str {
    tax_number.get(..BASE_LEN).unwrap_or(tax_number)
}

/// Submitted identifiers that no record answers.
///
/// Identifiers are matched on their 8-character base, so a full
/// registration number in the response answers its base-form submission.
/// Absence can mean either "unknown to the authority" or "its chunk failed";
/// only the error returned by the lookup tells the two apart.
pub fn unanswered<'a, S: AsRef<str>>(submitted: &'a [S], records: &[TaxRecord]) -> Vec<&'a str> {
    let answered: std::collections::HashSet<&str> = records.iter().map(TaxRecord::base).collect();
    submitted
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !id.is_empty() && !answered.contains(base_of(id)))
        .collect()
}
