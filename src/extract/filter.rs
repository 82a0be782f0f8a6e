// src/extract/filter.rs
// =============================================================================
// Keep/discard predicates applied to each listing right after extraction.
//
// The filter document is JSON, e.g.
//
//   { "type": ["maison"], "ville": ["melun", "paris"],
//     "prix_min": 100000, "prix_max": 300000 }
//
// Every key is optional. A missing key means "no constraint" on that
// dimension, and all active dimensions must pass (logical AND).
//
// The predicates run on RAW values, before cleaning:
// - type / ville: case-insensitive substring match against the raw text
// - prix / surface: the digits of the raw text read as an integer; when the
//   text has no digits ("Prix sur demande") the range check is skipped
// =============================================================================

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::listing::RawListing;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Allowed property types (substrings of the raw type)
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Allowed cities (substrings of the raw location)
    #[serde(rename = "ville")]
    pub cities: Vec<String>,
    pub prix_min: Option<u64>,
    pub prix_max: Option<u64>,
    pub surface_min: Option<u64>,
    pub surface_max: Option<u64>,
}

impl FilterConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid filter configuration")
    }

    /// Reads the filter document from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read filter file {}", path.display()))?;
        Self::from_json(&json)
    }

    // True when no dimension is constrained
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    // Decides whether a freshly extracted listing is kept.
    //
    // A type or city filter that is active while the listing has no type or
    // location never matches: the listing is discarded.
    pub fn keep(&self, listing: &RawListing) -> bool {
        contains_any(listing.property_type.as_deref(), &self.types)
            && contains_any(listing.localisation.as_deref(), &self.cities)
            && within(listing.prix.as_deref(), self.prix_min, self.prix_max)
            && within(listing.surface.as_deref(), self.surface_min, self.surface_max)
    }
}

// Case-insensitive "contains at least one of". An empty allow-list accepts
// everything.
fn contains_any(value: Option<&str>, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let value = match value {
        Some(v) if !v.trim().is_empty() => v.to_lowercase(),
        _ => return false,
    };

    allowed
        .iter()
        .any(|needle| value.contains(&needle.to_lowercase()))
}

// Range check on the digits of a raw value. Unparsable values pass.
fn within(raw: Option<&str>, min: Option<u64>, max: Option<u64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }

    match raw.and_then(parse_digits) {
        Some(n) => n >= min.unwrap_or(0) && n <= max.unwrap_or(u64::MAX),
        None => true,
    }
}

// Reads the ASCII digits of `raw` as one integer: "250 000 €" -> 250000.
//
// Returns None when there are no digits or when they don't fit in a u64.
pub fn parse_digits(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
