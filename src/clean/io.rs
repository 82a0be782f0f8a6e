// src/clean/io.rs
// =============================================================================
// Reading raw records and writing/reading the cleaned dataset.
//
// - raw records: the JSON array written by `crawl`
// - cleaned dataset: ';'-separated CSV with a header row (the format the
//   dashboard reads), or a JSON array of CleanListing
//
// CSV cells are flat, so the image gallery is joined with '|'.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::record::{CleanListing, ListingInput};

pub const CSV_DELIMITER: u8 = b';';

// Flat CSV shape of a CleanListing (same columns, same order)
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    titre: Option<String>,
    #[serde(rename = "type")]
    property_type: Option<String>,
    lien: String,
    prix: f64,
    surface: f64,
    surface_terrain: Option<f64>,
    pieces: Option<u32>,
    dpe: Option<String>,
    ges: Option<String>,
    ville: Option<String>,
    code_postal: Option<String>,
    image_principale: Option<String>,
    images_page: String,
    parking: bool,
    jardin: bool,
    balcon_terrasse: bool,
    piscine: bool,
    ascenseur: bool,
    acces_handicape: bool,
    agence: Option<String>,
    prix_m2: Option<f64>,
}

impl From<&CleanListing> for CsvRow {
    fn from(l: &CleanListing) -> Self {
        CsvRow {
            titre: l.titre.clone(),
            property_type: l.property_type.clone(),
            lien: l.lien.clone(),
            prix: l.prix,
            surface: l.surface,
            surface_terrain: l.surface_terrain,
            pieces: l.pieces,
            dpe: l.dpe.clone(),
            ges: l.ges.clone(),
            ville: l.ville.clone(),
            code_postal: l.code_postal.clone(),
            image_principale: l.image_principale.clone(),
            images_page: l.images_page.join("|"),
            parking: l.parking,
            jardin: l.jardin,
            balcon_terrasse: l.balcon_terrasse,
            piscine: l.piscine,
            ascenseur: l.ascenseur,
            acces_handicape: l.acces_handicape,
            agence: l.agence.clone(),
            prix_m2: l.prix_m2,
        }
    }
}

impl From<CsvRow> for CleanListing {
    fn from(row: CsvRow) -> Self {
        let images_page = row
            .images_page
            .split('|')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        CleanListing {
            titre: row.titre,
            property_type: row.property_type,
            lien: row.lien,
            prix: row.prix,
            surface: row.surface,
            surface_terrain: row.surface_terrain,
            pieces: row.pieces,
            dpe: row.dpe,
            ges: row.ges,
            ville: row.ville,
            code_postal: row.code_postal,
            image_principale: row.image_principale,
            images_page,
            parking: row.parking,
            jardin: row.jardin,
            balcon_terrasse: row.balcon_terrasse,
            piscine: row.piscine,
            ascenseur: row.ascenseur,
            acces_handicape: row.acces_handicape,
            agence: row.agence,
            prix_m2: row.prix_m2,
        }
    }
}

// Parses the JSON array produced by `crawl` (or by `clean --format json`)
pub fn parse_raw_records(json: &str) -> Result<Vec<ListingInput>> {
    serde_json::from_str(json).context("Input is not a JSON array of listing records")
}

pub async fn load_raw_records(path: &Path) -> Result<Vec<ListingInput>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_raw_records(&json).with_context(|| format!("Could not parse {}", path.display()))
}

pub fn to_csv(listings: &[CleanListing]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(Vec::new());

    for listing in listings {
        writer.serialize(CsvRow::from(listing))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Could not flush CSV output: {}", e))
}

pub fn from_csv(bytes: &[u8]) -> Result<Vec<CleanListing>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_reader(bytes);

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| {
            row.map(CleanListing::from)
                .with_context(|| format!("Invalid dataset row {}", i + 1))
        })
        .collect()
}

pub fn to_json(listings: &[CleanListing]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(listings)?)
}
