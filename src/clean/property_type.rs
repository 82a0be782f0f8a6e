// src/clean/property_type.rs
// =============================================================================
// Property types.
//
// Listing pages show the type as a plural breadcrumb ("Maisons à vendre").
// The dataset stores the singular ("Maison"). Types we don't know are kept as
// written (minus the "à vendre" suffix) in PropertyType::Other.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

// Trailing "à vendre" / "à louer", accent optional
static QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|\s+)[àa]\s+(vendre|louer)\s*$").expect("qualifier pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Maison,
    Appartement,
    Terrain,
    Immeuble,
    Parking,
    Bureau,
    Commerce,
    Chateau,
    Ferme,
    /// Anything else, as written on the page
    Other(String),
}

impl PropertyType {
    // Maps a plural or singular French name, ignoring case
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        match name.to_lowercase().as_str() {
            "maisons" | "maison" => PropertyType::Maison,
            "appartements" | "appartement" => PropertyType::Appartement,
            "terrains" | "terrain" => PropertyType::Terrain,
            "immeubles" | "immeuble" => PropertyType::Immeuble,
            "parkings" | "parking" => PropertyType::Parking,
            "bureaux" | "bureau" => PropertyType::Bureau,
            "commerces" | "commerce" => PropertyType::Commerce,
            "châteaux" | "château" | "chateaux" | "chateau" => PropertyType::Chateau,
            "fermes" | "ferme" => PropertyType::Ferme,
            _ => PropertyType::Other(name.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PropertyType::Maison => "Maison",
            PropertyType::Appartement => "Appartement",
            PropertyType::Terrain => "Terrain",
            PropertyType::Immeuble => "Immeuble",
            PropertyType::Parking => "Parking",
            PropertyType::Bureau => "Bureau",
            PropertyType::Commerce => "Commerce",
            PropertyType::Chateau => "Château",
            PropertyType::Ferme => "Ferme",
            PropertyType::Other(name) => name,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// "Maisons à vendre" -> Maison, "Lofts à vendre" -> Other("Lofts").
// Empty input (or a bare qualifier) -> None.
pub fn clean_type(raw: &str) -> Option<PropertyType> {
    let name = QUALIFIER.replace(raw.trim(), "");
    let name = name.trim();

    if name.is_empty() {
        None
    } else {
        Some(PropertyType::from_name(name))
    }
}
