// src/crawl/links.rs
// =============================================================================
// Finding the next pages to visit in an already-parsed page.
//
// Links are returned in document order and as absolute URLs: relative hrefs
// are resolved against the page URL, and anything that isn't http(s) (anchors,
// mailto:, tel:, javascript:) is dropped.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

use super::site::SiteLayout;

// A listing card of a list page: link to the detail page + thumbnail
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub url: String,
    pub image: Option<String>,
}

// Links of every element matching `selector` (the selector targets <a href>)
pub fn extract_links(document: &Html, selector: &Selector, page_url: &Url) -> Vec<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(page_url, href))
        .collect()
}

// Listing cards of a list page.
//
// Only links whose URL contains the layout's listing marker are listings;
// the other anchors of the list (ads, agency pages...) are ignored.
pub fn extract_listing_cards(
    document: &Html,
    layout: &SiteLayout,
    page_url: &Url,
) -> Vec<ListingCard> {
    let mut cards = Vec::new();

    for element in document.select(&layout.listing_cards) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(page_url, href) else {
            continue;
        };
        if !url.contains(&layout.listing_marker) {
            continue;
        }

        let image = element
            .select(&layout.card_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        cards.push(ListingCard { url, image });
    }

    cards
}

// "Next page" link of a list page, if any
pub fn extract_next_page(document: &Html, layout: &SiteLayout, page_url: &Url) -> Option<String> {
    extract_links(document, &layout.next_page, page_url)
        .into_iter()
        .next()
}

// Resolves a link (possibly relative) to an absolute http(s) URL
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    // Skip anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
