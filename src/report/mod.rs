// src/report/mod.rs
// =============================================================================
// Market report over the cleaned dataset.
//
// This is the data side of the dashboard: the same filters (cities, types,
// amenities, price and surface ranges) and the same figures (headline
// metrics, price histogram, price-per-m² boxplot, per-city counts and
// rankings, DPE/GES distributions), plus one page of the data table.
// Drawing the charts is left to whoever consumes the JSON output.
// =============================================================================

mod stats;

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::clean::{round2, CleanListing, PropertyType};
use crate::extract::Amenity;

use stats::{FiveNumber, HistogramBin};

pub const HISTOGRAM_BINS: usize = 30;

// Energy / emission labels, best to worst
const LABELS: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];
const UNKNOWN_LABEL: &str = "?";

#[derive(Debug, Clone)]
pub struct ReportQuery {
    /// Keep only these cities (case-insensitive); empty = all
    pub cities: Vec<String>,
    /// Keep only these property types; empty = all
    pub types: Vec<String>,
    /// Listings must have every one of these
    pub amenities: Vec<Amenity>,
    pub prix_min: Option<f64>,
    pub prix_max: Option<f64>,
    pub surface_min: Option<f64>,
    pub surface_max: Option<f64>,
    /// 1-based page of the data table
    pub page: usize,
    pub per_page: usize,
    /// Length of the per-city rankings
    pub top: usize,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            cities: Vec::new(),
            types: Vec::new(),
            amenities: Vec::new(),
            prix_min: None,
            prix_max: None,
            surface_min: None,
            surface_max: None,
            page: 1,
            per_page: 20,
            top: 10,
        }
    }
}

impl ReportQuery {
    pub fn matches(&self, listing: &CleanListing) -> bool {
        let city_ok = self.cities.is_empty()
            || listing.ville.as_deref().map_or(false, |ville| {
                let ville = ville.to_lowercase();
                self.cities.iter().any(|c| c.trim().to_lowercase() == ville)
            });

        let type_ok = self.types.is_empty()
            || listing.property_type.as_deref().map_or(false, |t| {
                let listing_type = PropertyType::from_name(t);
                self.types.iter().any(|wanted| PropertyType::from_name(wanted) == listing_type)
            });

        let amenities_ok = self.amenities.iter().all(|a| listing.has(*a));

        city_ok
            && type_ok
            && amenities_ok
            && in_range(listing.prix, self.prix_min, self.prix_max)
            && in_range(listing.surface, self.surface_min, self.surface_max)
    }
}

fn in_range(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityCount {
    pub ville: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAverage {
    pub ville: String,
    pub value: f64,
    pub listings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub rows: Vec<CleanListing>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total: usize,
    pub matching: usize,
    pub mean_prix_m2: Option<f64>,
    pub mean_surface: Option<f64>,
    pub price_histogram: Vec<HistogramBin>,
    pub prix_m2_boxplot: Option<FiveNumber>,
    pub listings_per_city: Vec<CityCount>,
    pub dpe: Vec<LabelCount>,
    pub ges: Vec<LabelCount>,
    pub top_prix_m2: Vec<CityAverage>,
    pub top_surface: Vec<CityAverage>,
    pub page: Page,
}

// Builds the report for the listings matching `query`
pub fn build_report(listings: &[CleanListing], query: &ReportQuery) -> Report {
    let selected: Vec<&CleanListing> = listings.iter().filter(|l| query.matches(l)).collect();

    let prices: Vec<f64> = selected.iter().map(|l| l.prix).collect();
    let surfaces: Vec<f64> = selected.iter().map(|l| l.surface).collect();
    let prix_m2: Vec<f64> = selected.iter().filter_map(|l| l.prix_m2).collect();

    Report {
        total: listings.len(),
        matching: selected.len(),
        mean_prix_m2: stats::mean(&prix_m2),
        mean_surface: stats::mean(&surfaces),
        price_histogram: stats::histogram(&prices, HISTOGRAM_BINS),
        prix_m2_boxplot: stats::five_number(&prix_m2),
        listings_per_city: city_counts(&selected),
        dpe: label_counts(selected.iter().map(|l| l.dpe.as_deref())),
        ges: label_counts(selected.iter().map(|l| l.ges.as_deref())),
        top_prix_m2: city_ranking(&selected, |l| l.prix_m2, query.top),
        top_surface: city_ranking(&selected, |l| Some(l.surface), query.top),
        page: paginate(&selected, query.page, query.per_page),
    }
}

// Listings per city, most listed first
fn city_counts(listings: &[&CleanListing]) -> Vec<CityCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for ville in listings.iter().filter_map(|l| l.ville.as_deref()) {
        *counts.entry(ville).or_default() += 1;
    }

    let mut result: Vec<CityCount> = counts
        .into_iter()
        .map(|(ville, count)| CityCount {
            ville: ville.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ville.cmp(&b.ville)));
    result
}

// Counts for A..G (always present, possibly 0), then unknown labels if any
fn label_counts<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> Vec<LabelCount> {
    let mut counts = [0usize; LABELS.len()];
    let mut unknown = 0;

    for label in labels {
        let label = label.map(|l| l.trim().to_uppercase());
        match label.and_then(|l| LABELS.iter().position(|known| *known == l)) {
            Some(index) => counts[index] += 1,
            None => unknown += 1,
        }
    }

    let mut result: Vec<LabelCount> = LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();

    if unknown > 0 {
        result.push(LabelCount {
            label: UNKNOWN_LABEL.to_string(),
            count: unknown,
        });
    }
    result
}

// Average of `value` per city, highest first, `top` cities at most
fn city_ranking(
    listings: &[&CleanListing],
    value: impl Fn(&CleanListing) -> Option<f64>,
    top: usize,
) -> Vec<CityAverage> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for listing in listings {
        if let (Some(ville), Some(v)) = (listing.ville.as_deref(), value(listing)) {
            groups.entry(ville).or_default().push(v);
        }
    }

    let mut ranking: Vec<CityAverage> = groups
        .into_iter()
        .filter_map(|(ville, values)| {
            stats::mean(&values).map(|avg| CityAverage {
                ville: ville.to_string(),
                value: round2(avg),
                listings: values.len(),
            })
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ville.cmp(&b.ville))
    });
    ranking.truncate(top);
    ranking
}

// One page of rows. Page numbers start at 1 (0 is read as 1); a page past
// the end is empty.
fn paginate(listings: &[&CleanListing], page: usize, per_page: usize) -> Page {
    let per_page = per_page.max(1);
    let number = page.max(1);
    let total_pages = listings.len().div_ceil(per_page);

    let rows = listings
        .iter()
        .skip((number - 1).saturating_mul(per_page))
        .take(per_page)
        .map(|l| (*l).clone())
        .collect();

    Page {
        number,
        per_page,
        total_pages,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(
        ville: &str,
        property_type: &str,
        prix: f64,
        surface: f64,
        dpe: Option<&str>,
    ) -> CleanListing {
        CleanListing {
            titre: Some(format!("{} à {}", property_type, ville)),
            property_type: Some(property_type.to_string()),
            lien: format!("https://www.etreproprio.com/immobilier-{}", prix),
            prix,
            surface,
            surface_terrain: None,
            pieces: None,
            dpe: dpe.map(str::to_string),
            ges: None,
            ville: Some(ville.to_string()),
            code_postal: None,
            image_principale: None,
            images_page: Vec::new(),
            parking: prix > 200_000.0,
            jardin: false,
            balcon_terrasse: false,
            piscine: false,
            ascenseur: false,
            acces_handicape: false,
            agence: None,
            prix_m2: crate::clean::price_per_area(Some(prix), Some(surface)),
        }
    }

    fn dataset() -> Vec<CleanListing> {
        vec![
            listing("Melun", "Maison", 300_000.0, 100.0, Some("C")),
            listing("Melun", "Appartement", 150_000.0, 50.0, Some("d")),
            listing("Paris", "Appartement", 500_000.0, 50.0, None),
            listing("Meaux", "Maison", 200_000.0, 125.0, Some("C")),
        ]
    }

    #[test]
    fn test_headline_metrics() {
        let report = build_report(&dataset(), &ReportQuery::default());

        assert_eq!(report.total, 4);
        assert_eq!(report.matching, 4);
        assert_eq!(report.mean_surface, Some(81.25));
        // (3000 + 3000 + 10000 + 1600) / 4
        assert_eq!(report.mean_prix_m2, Some(4400.0));
        assert_eq!(
            report.price_histogram.iter().map(|b| b.count).sum::<usize>(),
            4
        );
        assert_eq!(report.prix_m2_boxplot.as_ref().unwrap().max, 10000.0);
    }

    #[test]
    fn test_city_counts_and_rankings() {
        let report = build_report(&dataset(), &ReportQuery::default());

        assert_eq!(report.listings_per_city[0], CityCount { ville: "Melun".to_string(), count: 2 });
        assert_eq!(report.top_prix_m2[0].ville, "Paris");
        assert_eq!(report.top_surface[0].ville, "Meaux");
        assert_eq!(report.top_surface[1].value, 75.0);
    }

    #[test]
    fn test_label_distribution() {
        let report = build_report(&dataset(), &ReportQuery::default());

        let count = |label: &str| report.dpe.iter().find(|l| l.label == label).unwrap().count;
        assert_eq!(count("C"), 2);
        assert_eq!(count("D"), 1);
        assert_eq!(count("A"), 0);
        assert_eq!(count("?"), 1);
        // No GES at all: everything unknown
        assert_eq!(report.ges.last().unwrap(), &LabelCount { label: "?".to_string(), count: 4 });
    }

    #[test]
    fn test_filters() {
        let query = ReportQuery {
            cities: vec!["melun".to_string(), "meaux".to_string()],
            types: vec!["maisons".to_string()],
            ..ReportQuery::default()
        };
        let report = build_report(&dataset(), &query);
        assert_eq!(report.matching, 2);

        let query = ReportQuery {
            amenities: vec![Amenity::Parking],
            prix_max: Some(400_000.0),
            ..ReportQuery::default()
        };
        let report = build_report(&dataset(), &query);
        assert_eq!(report.matching, 1);
        assert_eq!(report.page.rows[0].prix, 300_000.0);
    }

    #[test]
    fn test_pagination() {
        let query = ReportQuery {
            per_page: 3,
            page: 2,
            ..ReportQuery::default()
        };
        let report = build_report(&dataset(), &query);
        assert_eq!(report.page.total_pages, 2);
        assert_eq!(report.page.rows.len(), 1);

        let query = ReportQuery { page: 9, ..query };
        let report = build_report(&dataset(), &query);
        assert!(report.page.rows.is_empty());
    }

    #[test]
    fn test_pagination_with_huge_values() {
        let query = ReportQuery {
            per_page: usize::MAX,
            ..ReportQuery::default()
        };
        let report = build_report(&dataset(), &query);
        assert_eq!(report.page.total_pages, 1);
        assert_eq!(report.page.rows.len(), 4);

        let query = ReportQuery {
            page: usize::MAX,
            ..ReportQuery::default()
        };
        let report = build_report(&dataset(), &query);
        assert_eq!(report.page.total_pages, 1);
        assert!(report.page.rows.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let report = build_report(&[], &ReportQuery::default());
        assert_eq!(report.matching, 0);
        assert_eq!(report.mean_prix_m2, None);
        assert!(report.price_histogram.is_empty());
        assert_eq!(report.page.total_pages, 0);
    }
}
