// src/collect/price.rs
//! Price and rating text parsing.
//!
//! Listing pages render prices in many shapes: `$1,299.99`, `1.299,99 €`,
//! `EUR 12`, `From 10 - 12 USD`. We take the first amount, detect the
//! currency from a symbol or 3-letter code, and otherwise fall back to the
//! source's configured currency.

use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::types::Price;
use crate::error::ParseError;

const SYMBOLS: &[(char, &str)] = &[('$', "USD"), ('€', "EUR"), ('£', "GBP"), ('¥', "JPY")];

fn amount_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // optional minus, then digits with `,` / `.` / thin-space groupings
    RE.get_or_init(|| Regex::new(r"-?\s*\d[\d.,\u{00A0}\u{202F} ]*").unwrap())
}

fn code_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z]{3})\b").unwrap())
}

fn rating_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap())
}

/// Parse a raw price text into a validated [`Price`].
pub fn parse_price(raw: &str, default_currency: &str) -> Result<Price, ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseError::MissingPrice);
    }

    let m = amount_re()
        .find(text)
        .ok_or_else(|| ParseError::InvalidPrice(text.to_string()))?;
    let currency = detect_currency(text).unwrap_or(default_currency);
    let decimal_comma = DECIMAL_COMMA_CODES.contains(&currency.trim().to_ascii_uppercase().as_str());
    let amount = parse_amount(m.as_str(), decimal_comma)
        .ok_or_else(|| ParseError::InvalidPrice(text.to_string()))?;

    Price::new(amount, currency)
}

fn detect_currency(text: &str) -> Option<&'static str> {
    if let Some((_, code)) = SYMBOLS.iter().find(|(sym, _)| text.contains(*sym)) {
        return Some(code);
    }
    let upper = text.to_ascii_uppercase();
    code_re()
        .captures_iter(&upper)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| KNOWN_CODES.iter().copied().find(|c| *c == m.as_str()))
}

const KNOWN_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "CZK", "PLN", "SEK", "NOK", "DKK",
];

/// Currencies whose pages usually write `1.299,00`.
const DECIMAL_COMMA_CODES: &[&str] = &["EUR", "CZK", "PLN", "SEK", "NOK", "DKK"];

/// Decide which of `,` / `.` is the decimal separator and build a Decimal.
/// `decimal_comma` settles a lone `.` followed by exactly three digits.
fn parse_amount(raw: &str, decimal_comma: bool) -> Option<Decimal> {
    let negative = raw.trim_start().starts_with('-');
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let digits = digits.trim_end_matches([',', '.']);
    if digits.is_empty() {
        return None;
    }

    let last_comma = digits.rfind(',');
    let last_dot = digits.rfind('.');
    let canonical = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (Some(c), None) => {
            // `12,50` is a decimal comma; `1,299` is a thousands group.
            let tail = digits.len() - c - 1;
            if tail == 3 || digits.matches(',').count() > 1 {
                digits.replace(',', "")
            } else {
                digits.replace(',', ".")
            }
        }
        (None, Some(_)) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        // `1.299 €` is a thousands group, `1.299 $` is not.
        (None, Some(d)) if decimal_comma && digits.len() - d - 1 == 3 => digits.replace('.', ""),
        _ => digits.to_string(),
    };

    let value = Decimal::from_str(&canonical).ok()?;
    Some(if negative { -value } else { value })
}

/// First number in the text, e.g. `4.5 out of 5 stars` -> 4.5.
pub fn parse_rating(raw: &str) -> Option<f32> {
    let m = rating_re().find(raw)?;
    m.as_str().replace(',', ".").parse::<f32>().ok()
}
