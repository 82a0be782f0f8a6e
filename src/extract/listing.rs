// src/extract/listing.rs
// =============================================================================
// This module pulls the raw fields of one listing out of its detail page.
//
// Every field is looked up on its own with a CSS selector. A selector that
// matches nothing gives an absent value (None), never an error: listing pages
// are not uniform and a missing DPE label or agency name is normal.
//
// Values are kept raw (e.g. "250 000 €", "\n — Melun 77000 —\n"). Turning them
// into numbers and split fields is the job of the clean stage.
// =============================================================================

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

// One scraped listing, exactly as found on the page.
//
// The serde names are the dataset's French column names so that the JSON
// written by `crawl` can be read back by `clean` (and by anything else that
// consumed the original `annonces.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawListing {
    pub titre: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub lien: String,
    pub prix: Option<String>,
    pub surface: Option<String>,
    pub surface_terrain: Option<String>,
    pub pieces: Option<String>,
    pub dpe: Option<String>,
    pub ges: Option<String>,
    pub localisation: Option<String>,
    pub image_principale: Option<String>,
    pub images_page: Vec<String>,
    pub parking: Option<String>,
    pub jardin: Option<String>,
    pub balcon_terrasse: Option<String>,
    pub piscine: Option<String>,
    pub ascenseur: Option<String>,
    pub acces_handicape: Option<String>,
    pub agence: Option<String>,
}

impl RawListing {
    // Raw flag for an amenity: the marker text if the page showed it
    pub fn amenity(&self, amenity: Amenity) -> Option<&str> {
        let value = match amenity {
            Amenity::Parking => &self.parking,
            Amenity::Jardin => &self.jardin,
            Amenity::BalconTerrasse => &self.balcon_terrasse,
            Amenity::Piscine => &self.piscine,
            Amenity::Ascenseur => &self.ascenseur,
            Amenity::AccesHandicape => &self.acces_handicape,
        };
        value.as_deref()
    }

    fn set_amenity(&mut self, amenity: Amenity, value: Option<String>) {
        let slot = match amenity {
            Amenity::Parking => &mut self.parking,
            Amenity::Jardin => &mut self.jardin,
            Amenity::BalconTerrasse => &mut self.balcon_terrasse,
            Amenity::Piscine => &mut self.piscine,
            Amenity::Ascenseur => &mut self.ascenseur,
            Amenity::AccesHandicape => &mut self.acces_handicape,
        };
        *slot = value;
    }
}

/// The amenities a listing can advertise in its features block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    Parking,
    Jardin,
    BalconTerrasse,
    Piscine,
    Ascenseur,
    AccesHandicape,
}

impl Amenity {
    pub const ALL: [Amenity; 6] = [
        Amenity::Parking,
        Amenity::Jardin,
        Amenity::BalconTerrasse,
        Amenity::Piscine,
        Amenity::Ascenseur,
        Amenity::AccesHandicape,
    ];

    // Text searched for in the `alt` attribute of the feature icons
    pub fn marker(self) -> &'static str {
        match self {
            Amenity::Parking => "parking",
            Amenity::Jardin => "jardin",
            Amenity::BalconTerrasse => "balcon/terrasse",
            Amenity::Piscine => "piscine",
            Amenity::Ascenseur => "ascenseur",
            Amenity::AccesHandicape => "accès handicapé",
        }
    }

    // Column name in the dataset
    pub fn column(self) -> &'static str {
        match self {
            Amenity::Parking => "parking",
            Amenity::Jardin => "jardin",
            Amenity::BalconTerrasse => "balcon_terrasse",
            Amenity::Piscine => "piscine",
            Amenity::Ascenseur => "ascenseur",
            Amenity::AccesHandicape => "acces_handicape",
        }
    }
}

// Compiled selectors for the fields of a detail page.
//
// Built once per crawl (see SiteLayout) and shared by reference with every
// detail task.
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub titre: Selector,
    pub property_type: Selector,
    pub prix: Selector,
    pub surface: Selector,
    pub surface_terrain: Selector,
    pub pieces: Selector,
    pub dpe: Selector,
    pub ges: Selector,
    pub localisation: Selector,
    pub photos: Selector,
    pub agence: Selector,
    pub features: Selector,
}

impl DetailSelectors {
    /// Selectors for etreproprio.com detail pages.
    pub fn etreproprio() -> Result<Self> {
        Ok(Self {
            titre: parse_selector("h1.annonce-immobilier")?,
            property_type: parse_selector(
                r#"div.ep-breadcrumb-cla-dir li:nth-child(2) span[itemprop="name"]"#,
            )?,
            prix: parse_selector("div.ep-price")?,
            surface: parse_selector("div.ep-area")?,
            surface_terrain: parse_selector("span.dtl-main-surface-terrain")?,
            pieces: parse_selector("div.ep-room")?,
            dpe: parse_selector("div.dpe-container div.dpe-letter.selected")?,
            ges: parse_selector("div.ges-container div.ges-letter.selected")?,
            localisation: parse_selector("div.ep-loc")?,
            photos: parse_selector("div.ep-tiles-photos img")?,
            agence: parse_selector("div.ep-name a")?,
            features: parse_selector("div.ep-features img")?,
        })
    }
}

// Compiles a CSS selector, turning scraper's borrowed error into an owned one
pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector '{}': {:?}", css, e))
}

// Extracts one listing from a parsed detail page.
//
// Parameters:
//   document: the parsed detail page
//   selectors: where each field lives on the page
//   lien: URL of the detail page (becomes the record's `lien`)
//   image_principale: thumbnail seen on the list page, if any
//
// Returns: the raw listing; fields that are not on the page are None
pub fn extract_listing(
    document: &Html,
    selectors: &DetailSelectors,
    lien: &str,
    image_principale: Option<String>,
) -> RawListing {
    let text = |selector: &Selector| first_text(document, selector);

    let images_page = document
        .select(&selectors.photos)
        .filter_map(|img| img.value().attr("src"))
        .map(str::to_string)
        .collect();

    let mut listing = RawListing {
        titre: text(&selectors.titre),
        property_type: text(&selectors.property_type),
        lien: lien.to_string(),
        prix: text(&selectors.prix),
        surface: text(&selectors.surface),
        surface_terrain: text(&selectors.surface_terrain),
        pieces: text(&selectors.pieces),
        dpe: text(&selectors.dpe),
        ges: text(&selectors.ges),
        localisation: text(&selectors.localisation),
        image_principale,
        images_page,
        agence: text(&selectors.agence),
        ..RawListing::default()
    };

    let alts: Vec<String> = document
        .select(&selectors.features)
        .filter_map(|img| img.value().attr("alt"))
        .map(str::to_lowercase)
        .collect();

    for amenity in Amenity::ALL {
        let marker = amenity.marker();
        let found = alts.iter().any(|alt| alt.contains(marker));
        listing.set_amenity(amenity, found.then(|| marker.to_string()));
    }

    listing
}

// Text of the first element matching `selector`.
//
// Only the element's own text nodes are used (not its children's), the same
// way a `::text` pseudo-selector behaves. Whitespace-only text counts as
// missing.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let element = document.select(selector).next()?;
    let text = own_text(element);

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect()
}
