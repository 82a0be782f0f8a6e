// src/clean/mod.rs
// =============================================================================
// The cleaning stage: raw scraped records -> typed dataset.
//
// Submodules:
// - fields: string normalizers (price, surface, rooms, location)
// - property_type: the PropertyType enum and the plural -> singular mapping
// - record: ListingInput / CleanListing and the per-record pipeline
// - io: JSON input, CSV / JSON output
// =============================================================================

mod fields;
mod io;
mod property_type;
mod record;

pub use fields::{price_per_area, round2};
pub use io::{from_csv, load_raw_records, to_csv, to_json};
pub use property_type::PropertyType;
pub use record::{clean_dataset, CleanListing, ListingInput};
