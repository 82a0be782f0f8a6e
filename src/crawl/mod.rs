// src/crawl/mod.rs
// =============================================================================
// This module handles crawling the listing site.
//
// Features:
// - Walks the site hierarchy: property type -> département -> city ->
//   listing list -> listing detail
// - Runs fetches concurrently from an explicit frontier (no global state)
// - Follows "next page" links of list pages after a polite delay
// - Extracts and filters one record per detail page
//
// Submodules:
// - site: entry URLs and selectors of the crawled site
// - fetch: HTTP client and classified fetch errors
// - links: child links of a page
// - queue: the frontier / task loop
// =============================================================================

mod fetch;
mod links;
mod queue;
mod site;

pub use fetch::build_client;
pub use queue::{crawl, CrawlOptions, CrawlSummary};
pub use site::SiteLayout;
