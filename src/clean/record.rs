// src/clean/record.rs
// =============================================================================
// Cleaning one listing: raw record in, typed record out.
//
// The input side is deliberately loose. A field may hold the scraped text
// ("250 000 €"), or a value that is already typed (250000.0, true) because
// the record went through `clean` before. Typed values pass through
// untouched, which makes cleaning idempotent: cleaning the JSON output of
// `clean` gives the same dataset back.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fields::{clean_location, clean_price, clean_rooms, clean_surface, price_per_area};
use super::property_type::clean_type;
use crate::extract::Amenity;

// A field value as found in a JSON record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    // Any non-empty value counts as "present"
    fn is_truthy(&self) -> bool {
        match self {
            RawValue::Bool(b) => *b,
            RawValue::Number(n) => *n != 0.0,
            RawValue::Text(s) => !s.is_empty(),
            RawValue::List(items) => !items.is_empty(),
        }
    }
}

// One record on its way into the cleaner.
//
// Unknown keys (e.g. `prix_m2` in an already-clean file) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingInput {
    pub titre: Option<RawValue>,
    #[serde(rename = "type")]
    pub property_type: Option<RawValue>,
    pub lien: Option<RawValue>,
    pub prix: Option<RawValue>,
    pub surface: Option<RawValue>,
    pub surface_terrain: Option<RawValue>,
    pub pieces: Option<RawValue>,
    pub dpe: Option<RawValue>,
    pub ges: Option<RawValue>,
    pub localisation: Option<RawValue>,
    pub ville: Option<RawValue>,
    pub code_postal: Option<RawValue>,
    pub image_principale: Option<RawValue>,
    pub images_page: Option<RawValue>,
    pub parking: Option<RawValue>,
    pub jardin: Option<RawValue>,
    pub balcon_terrasse: Option<RawValue>,
    pub piscine: Option<RawValue>,
    pub ascenseur: Option<RawValue>,
    pub acces_handicape: Option<RawValue>,
    pub agence: Option<RawValue>,
}

/// A listing of the cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanListing {
    pub titre: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub lien: String,
    pub prix: f64,
    pub surface: f64,
    pub surface_terrain: Option<f64>,
    pub pieces: Option<u32>,
    pub dpe: Option<String>,
    pub ges: Option<String>,
    pub ville: Option<String>,
    pub code_postal: Option<String>,
    pub image_principale: Option<String>,
    pub images_page: Vec<String>,
    pub parking: bool,
    pub jardin: bool,
    pub balcon_terrasse: bool,
    pub piscine: bool,
    pub ascenseur: bool,
    pub acces_handicape: bool,
    pub agence: Option<String>,
    pub prix_m2: Option<f64>,
}

impl CleanListing {
    pub fn has(&self, amenity: Amenity) -> bool {
        match amenity {
            Amenity::Parking => self.parking,
            Amenity::Jardin => self.jardin,
            Amenity::BalconTerrasse => self.balcon_terrasse,
            Amenity::Piscine => self.piscine,
            Amenity::Ascenseur => self.ascenseur,
            Amenity::AccesHandicape => self.acces_handicape,
        }
    }
}

// Cleans one record.
//
// Returns None when the record has no usable price or living surface: such
// records are not part of the dataset.
pub fn clean_listing(input: &ListingInput) -> Option<CleanListing> {
    let prix = decimal(input.prix.as_ref(), clean_price)?;
    let surface = decimal(input.surface.as_ref(), clean_surface)?;

    let (ville, code_postal) = match input.localisation.as_ref() {
        Some(RawValue::Text(raw)) => clean_location(raw),
        _ => (text(input.ville.as_ref()), text(input.code_postal.as_ref())),
    };

    let property_type = match input.property_type.as_ref() {
        Some(RawValue::Text(raw)) => clean_type(raw).map(|t| t.to_string()),
        other => text(other),
    };

    Some(CleanListing {
        titre: text(input.titre.as_ref()),
        property_type,
        lien: text(input.lien.as_ref()).unwrap_or_default(),
        prix,
        surface,
        surface_terrain: decimal(input.surface_terrain.as_ref(), clean_surface),
        pieces: rooms(input.pieces.as_ref()),
        dpe: text(input.dpe.as_ref()),
        ges: text(input.ges.as_ref()),
        ville,
        code_postal,
        image_principale: text(input.image_principale.as_ref()),
        images_page: images(input.images_page.as_ref()),
        parking: flag(input.parking.as_ref()),
        jardin: flag(input.jardin.as_ref()),
        balcon_terrasse: flag(input.balcon_terrasse.as_ref()),
        piscine: flag(input.piscine.as_ref()),
        ascenseur: flag(input.ascenseur.as_ref()),
        acces_handicape: flag(input.acces_handicape.as_ref()),
        agence: text(input.agence.as_ref()),
        prix_m2: price_per_area(Some(prix), Some(surface)),
    })
}

// Cleans every record, dropping the ones without price or surface
pub fn clean_dataset(inputs: &[ListingInput]) -> Vec<CleanListing> {
    let listings: Vec<CleanListing> = inputs.iter().filter_map(clean_listing).collect();

    debug!(
        total = inputs.len(),
        kept = listings.len(),
        dropped = inputs.len() - listings.len(),
        "Cleaned dataset"
    );

    listings
}

fn decimal(value: Option<&RawValue>, clean: fn(&str) -> Option<f64>) -> Option<f64> {
    match value? {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(raw) => clean(raw),
        _ => None,
    }
}

fn rooms(value: Option<&RawValue>) -> Option<u32> {
    match value? {
        RawValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => {
            Some(*n as u32)
        }
        RawValue::Text(raw) => clean_rooms(raw),
        _ => None,
    }
}

fn text(value: Option<&RawValue>) -> Option<String> {
    let text = match value? {
        RawValue::Text(s) => s.trim().to_string(),
        RawValue::Number(n) => n.to_string(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn images(value: Option<&RawValue>) -> Vec<String> {
    match value {
        Some(RawValue::List(items)) => items.clone(),
        // The CSV form joins the gallery with '|'
        Some(RawValue::Text(joined)) => joined
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn flag(value: Option<&RawValue>) -> bool {
    value.map_or(false, RawValue::is_truthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> ListingInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_cleans_scraped_record() {
        let listing = clean_listing(&input(
            r#"{
                "titre": " Maison 5 pièces ",
                "type": "Maisons à vendre",
                "lien": "https://www.etreproprio.com/immobilier-1",
                "prix": "250 000 €",
                "surface": "100 m²",
                "surface_terrain": null,
                "pieces": "5 pièces",
                "dpe": "C",
                "localisation": "\n  — Moissy-Cramayel 77550 —\n",
                "images_page": ["a.jpg", "b.jpg"],
                "parking": "parking",
                "jardin": null,
                "piscine": ""
            }"#,
        ))
        .unwrap();

        assert_eq!(listing.titre.as_deref(), Some("Maison 5 pièces"));
        assert_eq!(listing.property_type.as_deref(), Some("Maison"));
        assert_eq!(listing.prix, 250000.0);
        assert_eq!(listing.surface, 100.0);
        assert_eq!(listing.surface_terrain, None);
        assert_eq!(listing.pieces, Some(5));
        assert_eq!(listing.ville.as_deref(), Some("Moissy-Cramayel"));
        assert_eq!(listing.code_postal.as_deref(), Some("77550"));
        assert_eq!(listing.images_page, vec!["a.jpg", "b.jpg"]);
        assert!(listing.parking);
        assert!(!listing.jardin);
        assert!(!listing.piscine);
        assert!(!listing.ascenseur);
        assert_eq!(listing.prix_m2, Some(2500.0));
    }

    #[test]
    fn test_drops_records_without_price_or_surface() {
        let records = vec![
            input(r#"{ "prix": "Prix sur demande", "surface": "80 m²" }"#),
            input(r#"{ "prix": "120 000 €" }"#),
            input(r#"{ "prix": "120 000 €", "surface": "60 m²" }"#),
        ];

        let cleaned = clean_dataset(&records);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].prix_m2, Some(2000.0));
    }

    #[test]
    fn test_amenity_flags_follow_presence() {
        let listing = clean_listing(&input(
            r#"{
                "prix": "1", "surface": "1",
                "parking": " ", "jardin": "", "piscine": false,
                "ascenseur": 0, "balcon_terrasse": true, "acces_handicape": null
            }"#,
        ))
        .unwrap();

        assert!(listing.parking);
        assert!(!listing.jardin);
        assert!(!listing.piscine);
        assert!(!listing.ascenseur);
        assert!(listing.balcon_terrasse);
        assert!(!listing.acces_handicape);
    }

    #[test]
    fn test_zero_surface_has_no_price_per_area() {
        let listing = clean_listing(&input(r#"{ "prix": "1000", "surface": "0 m²" }"#)).unwrap();
        assert_eq!(listing.surface, 0.0);
        assert_eq!(listing.prix_m2, None);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = vec![input(
            r#"{
                "titre": "Appartement T3",
                "type": "Lofts à vendre",
                "lien": "https://www.etreproprio.com/immobilier-2",
                "prix": "199 500 €",
                "surface": "63.5 m²",
                "surface_terrain": "1 200 m²",
                "pieces": "3",
                "ges": "D",
                "localisation": "Melun 77000",
                "images_page": ["x.jpg"],
                "balcon_terrasse": "balcon/terrasse",
                "agence": "Agence du Centre"
            }"#,
        )];

        let first = clean_dataset(&raw);
        let json = serde_json::to_string(&first).unwrap();
        let again: Vec<ListingInput> = serde_json::from_str(&json).unwrap();
        let second = clean_dataset(&again);

        assert_eq!(first, second);
        assert_eq!(second[0].property_type.as_deref(), Some("Lofts"));
        assert_eq!(second[0].ville.as_deref(), Some("Melun"));
        assert_eq!(second[0].surface_terrain, Some(1200.0));
        assert!(second[0].balcon_terrasse);
    }
}
