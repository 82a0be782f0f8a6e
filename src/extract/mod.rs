// src/extract/mod.rs
// =============================================================================
// Turning a fetched detail page into a raw listing, and deciding whether that
// listing is kept.
//
// Submodules:
// - listing: selector-based field extraction (RawListing, Amenity)
// - filter: the externally supplied keep/discard predicates (FilterConfig)
// =============================================================================

mod filter;
mod listing;

pub use filter::{parse_digits, FilterConfig};
pub use listing::{extract_listing, parse_selector, Amenity, DetailSelectors, RawListing};
