// src/crawl/site.rs
// =============================================================================
// Describes the site being crawled: where the crawl starts, how pages of each
// level link to the next level, and where the fields of a detail page are.
//
// The hierarchy is:
//
//   TypeIndex    one entry page per property type (maisons, appartements...)
//     └ Department   one page per département
//         └ City         one page per city
//             └ ListingList  paginated list of listing cards
//                 └ Detail       one listing -> one record
// =============================================================================

use anyhow::Result;
use scraper::Selector;

use crate::extract::{parse_selector, DetailSelectors};

pub const BASE_URL: &str = "https://www.etreproprio.com";

// One entry page per property type
const PROPERTY_TYPE_PATHS: [&str; 6] = [
    "/annonces/maison",
    "/annonces/appartement",
    "/annonces/terrain",
    "/annonces/immeuble",
    "/annonces/parking",
    "/annonces/local-commercial",
];

// What kind of page a frontier URL points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    TypeIndex,
    Department,
    City,
    ListingList,
    /// Carries the thumbnail seen on the list card
    Detail { image_principale: Option<String> },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::TypeIndex => "type",
            Stage::Department => "department",
            Stage::City => "city",
            Stage::ListingList => "list",
            Stage::Detail { .. } => "detail",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub entry_urls: Vec<String>,
    /// Type page -> département pages
    pub department_links: Selector,
    /// Département page -> city pages
    pub city_links: Selector,
    /// City page -> listing list pages
    pub listing_list_links: Selector,
    /// Listing cards on a list page (links + thumbnails)
    pub listing_cards: Selector,
    pub card_image: Selector,
    /// Only card links containing this are listings
    pub listing_marker: String,
    pub next_page: Selector,
    pub detail: DetailSelectors,
}

impl SiteLayout {
    // Layout of etreproprio.com
    pub fn etreproprio() -> Result<Self> {
        Ok(Self {
            entry_urls: PROPERTY_TYPE_PATHS
                .iter()
                .map(|path| format!("{}{}", BASE_URL, path))
                .collect(),
            department_links: parse_selector("div.ep-dir-dept a[href]")?,
            city_links: parse_selector("div.ep-dir-city a[href]")?,
            listing_list_links: parse_selector("div.ep-dir-list a[href]")?,
            listing_cards: parse_selector("div.ep-search-list-wrapper a[href]")?,
            card_image: parse_selector("img[src]")?,
            listing_marker: "/immobilier-".to_string(),
            next_page: parse_selector("a.ep-nav-link-next[href]")?,
            detail: DetailSelectors::etreproprio()?,
        })
    }

    // Replaces the entry pages; an empty list keeps the defaults
    pub fn with_entry_urls(mut self, urls: Vec<String>) -> Self {
        if !urls.is_empty() {
            self.entry_urls = urls;
        }
        self
    }

    // Selector for the child links of a directory-level page, None for the
    // levels that are handled differently (list pages, detail pages)
    pub fn directory_links(&self, stage: &Stage) -> Option<(&Selector, Stage)> {
        match stage {
            Stage::TypeIndex => Some((&self.department_links, Stage::Department)),
            Stage::Department => Some((&self.city_links, Stage::City)),
            Stage::City => Some((&self.listing_list_links, Stage::ListingList)),
            Stage::ListingList | Stage::Detail { .. } => None,
        }
    }
}
