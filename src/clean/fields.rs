// src/clean/fields.rs
// =============================================================================
// String-level normalizers for the raw fields of a listing.
//
// Every function here is total: bad input gives None, never an error.
//
//   clean_price("1 234 €")              -> Some(1234.0)
//   clean_surface("85,5 m²")            -> Some(855.0)   (only '.' is decimal)
//   clean_rooms("4 pièces")             -> Some(4)
//   clean_location("— Melun 77000 —")   -> (Some("Melun"), Some("77000"))
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::parse_digits;

// First run of five ASCII digits (`\d` would also match other scripts)
static POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{5}").expect("postal code pattern is valid"));

// Keeps digits and decimal points, then parses a float.
// No digit at all -> None. Something like "1.2.3" doesn't parse -> None.
fn clean_decimal(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    kept.parse().ok()
}

pub fn clean_price(raw: &str) -> Option<f64> {
    clean_decimal(raw)
}

// Living surface and land surface share the price rule
pub fn clean_surface(raw: &str) -> Option<f64> {
    clean_decimal(raw)
}

pub fn clean_rooms(raw: &str) -> Option<u32> {
    parse_digits(raw).and_then(|n| u32::try_from(n).ok())
}

// Splits a location into (city, postal code).
//
// The postal code is the first run of 5 digits. The city is what remains once
// that code is removed, trimmed of whitespace and dashes on both ends.
// Without a 5-digit run both parts are None.
pub fn clean_location(raw: &str) -> (Option<String>, Option<String>) {
    let code = match POSTAL_CODE.find(raw) {
        Some(m) => m.as_str().to_string(),
        None => return (None, None),
    };

    let city = raw
        .replace(&code, "")
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—'))
        .to_string();

    let city = if city.is_empty() { None } else { Some(city) };
    (city, Some(code))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// prix / surface rounded to cents, only when both exist and surface isn't 0
pub fn price_per_area(prix: Option<f64>, surface: Option<f64>) -> Option<f64> {
    match (prix, surface) {
        (Some(prix), Some(surface)) if surface != 0.0 => Some(round2(prix / surface)),
        _ => None,
    }
}
