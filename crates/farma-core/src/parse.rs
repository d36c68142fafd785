//! # Text Parsers
//!
//! Barcode cleaning and locale-tolerant number parsing for manual entry and
//! spreadsheet imports.
//!
//! ## Price Separators
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  input            separators        reading                             │
//! │  ─────            ──────────        ───────                             │
//! │  1.234.567,89     both              last one (,) is decimal → 1234567.89│
//! │  1,234,567.89     both              last one (.) is decimal → 1234567.89│
//! │  12,500           commas only       3-digit tail → thousands → 12500    │
//! │  12,5             commas only       otherwise decimal        → 12.5     │
//! │  12.500           periods only      3-digit tail → thousands → 12500    │
//! │  'ABC             -                 not a number             → None     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invalid text is `None` / `Err`, never zero: callers must be able to tell
//! "not a number" apart from an explicit `0`.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::validation::ValidationResult;

const ZERO_WIDTH_CHARS: [char; 3] = ['\u{200B}', '\u{200C}', '\u{FEFF}'];
const CURRENCY_CHARS: [char; 4] = ['$', '€', '£', '\u{00A0}'];

/// Drops surrounding whitespace and one leading apostrophe (spreadsheet
/// text marker).
fn strip_cell_noise(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('\'').unwrap_or(text).trim()
}

// =============================================================================
// Barcodes
// =============================================================================

/// Normalizes a barcode from user input or an import.
///
/// Removes surrounding whitespace, a leading apostrophe, zero-width spaces
/// and every interior space. Hyphens and letter case are kept. Numbers are
/// accepted and converted to text first.
///
/// ```rust
/// use farma_core::parse::clean_barcode;
///
/// assert_eq!(clean_barcode(" '770 2001\u{200B} "), "7702001");
/// assert_eq!(clean_barcode("Ab-12"), "Ab-12");
/// assert_eq!(clean_barcode(7702001), "7702001");
/// ```
pub fn clean_barcode(input: impl fmt::Display) -> String {
    let text = input.to_string();
    strip_cell_noise(&text)
        .chars()
        .filter(|c| *c != ' ' && !ZERO_WIDTH_CHARS.contains(c))
        .collect()
}

// =============================================================================
// Prices
// =============================================================================

/// Parses a price written in either `1.234,56` or `1,234.56` notation.
///
/// Returns `None` for empty or non-numeric text.
pub fn parse_price(text: &str) -> Option<Money> {
    let text = strip_cell_noise(text);
    if text.is_empty() {
        return None;
    }

    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_CHARS.contains(c))
        .collect();

    let (negative, digits) = match compact.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };

    let normalized = normalize_separators(digits)?;
    if normalized.is_empty()
        || normalized.starts_with('.')
        || normalized.ends_with('.')
        || !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let value = Decimal::from_str_exact(&normalized).ok()?;
    Some(Money::new(if negative { -value } else { value }))
}

/// Rewrites the separators of `text` so the only one left is a `.` decimal
/// point. `None` when the grouping cannot be read either way.
fn normalize_separators(text: &str) -> Option<String> {
    let last_comma = text.rfind(',');
    let last_period = text.rfind('.');

    match (last_comma, last_period) {
        (None, None) => Some(text.to_string()),
        (Some(comma), Some(period)) => {
            let (decimal, thousands) = if comma > period { (',', '.') } else { ('.', ',') };
            if text.matches(decimal).count() > 1 {
                return None;
            }
            Some(text.replace(thousands, "").replace(decimal, "."))
        }
        (Some(_), None) => single_separator(text, ','),
        (None, Some(_)) => single_separator(text, '.'),
    }
}

/// Only `sep` appears: a final group of exactly three digits makes it a
/// thousands separator, otherwise a lone occurrence is the decimal point.
fn single_separator(text: &str, sep: char) -> Option<String> {
    let groups: Vec<&str> = text.split(sep).collect();
    let tail = groups.last()?;

    if tail.len() == 3 {
        return Some(groups.concat());
    }
    if groups.len() == 2 {
        return Some(groups.join("."));
    }
    None
}

// =============================================================================
// Quantities
// =============================================================================

/// Parses a sale quantity in boxes, allowing fractions.
///
/// Either `,` or `.` may be the decimal separator. Zero and negative
/// quantities are rejected.
///
/// ```rust
/// use farma_core::parse::parse_quantity;
/// use farma_core::Quantity;
///
/// assert_eq!(parse_quantity("0,5").unwrap(), Quantity::from_str_exact("0.5").unwrap());
/// assert!(parse_quantity("0").is_err());
/// assert!(parse_quantity("dos").is_err());
/// ```
pub fn parse_quantity(text: &str) -> ValidationResult<Quantity> {
    let text = strip_cell_noise(text);
    if text.is_empty() {
        return Err(ValidationError::required("quantity"));
    }

    let value = Decimal::from_str_exact(&text.replace(',', "."))
        .map_err(|_| ValidationError::invalid_format("quantity", "not a number"))?;

    if value <= Decimal::ZERO {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(Quantity::new(value))
}

/// Parses a whole, non-negative quantity (bulk import defaults, counts).
///
/// Fractions, signs and any other characters are rejected.
pub fn parse_whole_quantity(text: &str) -> ValidationResult<i64> {
    let text = strip_cell_noise(text);
    if text.is_empty() {
        return Err(ValidationError::required("quantity"));
    }

    if let Some(rest) = text.strip_prefix('-') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::negative("quantity"));
        }
    }

    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "quantity",
            "must be a whole number",
        ));
    }

    text.parse::<i64>()
        .map_err(|_| ValidationError::invalid_format("quantity", "too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Option<Money> {
        Some(Money::from_str_exact(s).unwrap())
    }

    #[test]
    fn test_clean_barcode() {
        assert_eq!(clean_barcode("  7702001  "), "7702001");
        assert_eq!(clean_barcode("'7702001"), "7702001");
        assert_eq!(clean_barcode("77 02 001"), "7702001");
        assert_eq!(clean_barcode("770\u{200B}2001"), "7702001");
        assert_eq!(clean_barcode("SERV-iny"), "SERV-iny");
        assert_eq!(clean_barcode(12345_u64), "12345");
    }

    #[test]
    fn test_parse_price_locale_formats() {
        assert_eq!(parse_price("1.234.567,89"), money("1234567.89"));
        assert_eq!(parse_price("1,234,567.89"), money("1234567.89"));
        assert_eq!(parse_price("'1000"), money("1000"));
        assert_eq!(parse_price("5000"), money("5000"));
    }

    #[test]
    fn test_parse_price_single_separator() {
        assert_eq!(parse_price("12,500"), money("12500"));
        assert_eq!(parse_price("1,250,000"), money("1250000"));
        assert_eq!(parse_price("12,5"), money("12.5"));
        assert_eq!(parse_price("12.500"), money("12500"));
        assert_eq!(parse_price("12.50"), money("12.50"));
        assert_eq!(parse_price("1,25,5"), None);
    }

    #[test]
    fn test_parse_price_currency_and_sign() {
        assert_eq!(parse_price("$ 5.000"), money("5000"));
        assert_eq!(parse_price("€12,99"), money("12.99"));
        assert_eq!(parse_price("-1.500"), money("-1500"));
    }

    #[test]
    fn test_parse_price_invalid_is_none_not_zero() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
        assert_eq!(parse_price("ABC"), None);
        assert_eq!(parse_price("12abc"), None);
        assert_eq!(parse_price("$"), None);
        assert_eq!(parse_price("0"), money("0"));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3").unwrap(), Quantity::from_units(3));
        assert_eq!(parse_quantity("0.25").unwrap(), Quantity::from_str_exact("0.25").unwrap());
        assert_eq!(parse_quantity("0,3").unwrap(), Quantity::from_str_exact("0.3").unwrap());

        assert_eq!(
            parse_quantity("0"),
            Err(ValidationError::must_be_positive("quantity"))
        );
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("uno").is_err());
        assert!(parse_quantity("").is_err());
    }

    #[test]
    fn test_parse_whole_quantity() {
        assert_eq!(parse_whole_quantity("12"), Ok(12));
        assert_eq!(parse_whole_quantity("0"), Ok(0));
        assert_eq!(
            parse_whole_quantity("-3"),
            Err(ValidationError::negative("quantity"))
        );
        assert!(parse_whole_quantity("1.5").is_err());
        assert!(parse_whole_quantity("x").is_err());
    }
}
