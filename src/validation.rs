//! Local tax-number validation
//!
//! The eighth digit of a Hungarian tax number is a check digit over the first
//! seven, weighted 9, 7, 3, 1 repeating from the left. Identifiers failing the
//! check are answered locally and never sent to the service.

use crate::types::BASE_LEN;

/// Number of digits covered by the check digit
const CHECKED_DIGITS: usize = 7;

/// Returns the check digit for the first seven digits of `prefix`.
///
/// Scanning stops at the first non-digit; anything past the seventh
/// character is ignored.
///
/// # Examples
///
/// ```
/// use nav_query::validation::checksum;
///
/// assert_eq!(checksum("1234567"), '6');
/// assert_eq!(checksum("8888888"), '8');
/// ```
#[must_use]
pub fn checksum(prefix: &str) -> char {
    checksum_digits(prefix.as_bytes())
}

fn checksum_digits(digits: &[u8]) -> char {
    let mut sum = 0u32;
    for (i, &b) in digits.iter().take(CHECKED_DIGITS).enumerate() {
        if !b.is_ascii_digit() {
            break;
        }
        let weight = match (i + 1) % 4 {
            1 => 9,
            2 => 7,
            3 => 3,
            _ => 1,
        };
        sum = (sum + weight * u32::from(b - b'0')) % 10;
    }
    if sum == 0 {
        '0'
    } else {
        char::from(b'0' + (10 - sum) as u8)
    }
}

/// Returns true iff the identifier's eighth character is the check digit of the first seven.
///
/// # Examples
///
/// ```
/// use nav_query::validation::is_valid;
///
/// assert!(is_valid("12345676"));
/// assert!(!is_valid("12345678"));
/// assert!(!is_valid("1234567"));
/// ```
#[must_use]
pub fn is_valid(tax_number: &str) -> bool {
    let bytes = tax_number.as_bytes();
    if bytes.len() < BASE_LEN {
        return false;
    }
    checksum_digits(&bytes[..CHECKED_DIGITS]) == char::from(bytes[CHECKED_DIGITS])
}

/// Identifiers split by local validity
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition<'a> {
    /// Identifiers that pass the checksum and must be asked from the service
    pub to_query: Vec<&'a str>,
    /// Non-empty identifiers that fail the checksum
    pub invalid: Vec<&'a str>,
}

/// Split identifiers into those to query and those locally invalid.
///
/// Input order is kept within each side and the input is left untouched.
/// Empty identifiers land on neither side.
pub fn partition<S: AsRef<str>>(tax_numbers: &[S]) -> Partition<'_> {
    let mut parts = Partition::default();
    for id in tax_numbers.iter().map(AsRef::as_ref) {
        if id.is_empty() {
            continue;
        }
        if is_valid(id) {
            parts.to_query.push(id);
        } else {
            parts.invalid.push(id);
        }
    }
    parts
}
