// src/crawl/queue.rs
// =============================================================================
// This module runs the crawl as an explicit task queue.
//
// How it works:
// 1. The frontier starts with one entry per property type page
// 2. Up to `concurrency` entries are fetched at the same time
// 3. Each finished task hands back its own output: child entries for the
//    next level, and/or the listing record of a detail page
// 4. The coordinator (this loop) merges outputs and refills the in-flight set
// 5. The crawl ends when the frontier is empty and nothing is in flight
//
// Tasks complete in any order. Nothing is shared between tasks except
// read-only data (HTTP client, site layout, filters), so there is no locking.
//
// Politeness:
// - A "next page" link of a list page is fetched only after a fixed delay
// - The same URL is never fetched twice in one run
// =============================================================================

use anyhow::{anyhow, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::fetch::fetch_page;
use super::links::{extract_links, extract_listing_cards, extract_next_page};
use super::site::{SiteLayout, Stage};
use crate::extract::{extract_listing, FilterConfig, RawListing};

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Maximum number of fetches in flight
    pub concurrency: usize,
    /// Wait applied before fetching a "next page" link
    pub next_page_delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            next_page_delay: Duration::from_secs(5),
        }
    }
}

// A page waiting to be fetched
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub url: String,
    pub stage: Stage,
    pub delay: Duration,
}

impl FrontierEntry {
    fn new(url: String, stage: Stage) -> Self {
        Self {
            url,
            stage,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub listings_kept: usize,
    pub listings_discarded: usize,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub listings: Vec<RawListing>,
    pub summary: CrawlSummary,
}

// What one task hands back to the coordinator
#[derive(Debug, Default)]
struct TaskOutput {
    children: Vec<FrontierEntry>,
    listing: Option<RawListing>,
    discarded: bool,
    failed: bool,
}

// Crawls the site from the layout's entry pages down to every listing.
//
// Parameters:
//   client: shared HTTP client
//   layout: entry URLs and selectors of the site
//   filters: keep/discard predicates applied to each extracted listing
//   options: concurrency and next-page delay
//
// Returns: every listing that passed the filters, plus run counters.
// Only an invalid entry URL is an error; page failures just end their branch.
pub async fn crawl(
    client: &Client,
    layout: &SiteLayout,
    filters: &FilterConfig,
    options: &CrawlOptions,
) -> Result<CrawlOutcome> {
    let mut frontier = VecDeque::new();
    for url in &layout.entry_urls {
        Url::parse(url).map_err(|e| anyhow!("Invalid URL '{}': {}", url, e))?;
        frontier.push_back(FrontierEntry::new(url.clone(), Stage::TypeIndex));
    }

    info!(
        entries = frontier.len(),
        concurrency = options.concurrency,
        filtered = !filters.is_empty(),
        "Starting crawl"
    );

    let concurrency = options.concurrency.max(1);
    let mut visited = HashSet::new();
    let mut in_flight = FuturesUnordered::new();
    let mut listings = Vec::new();
    let mut summary = CrawlSummary::default();

    loop {
        // Refill the in-flight set from the frontier
        while in_flight.len() < concurrency {
            let Some(entry) = frontier.pop_front() else {
                break;
            };
            if !visited.insert(entry.url.clone()) {
                continue;
            }
            in_flight.push(run_task(client, layout, filters, options.next_page_delay, entry));
        }

        // Nothing in flight and nothing left to start: done
        let Some(output) = in_flight.next().await else {
            break;
        };

        if output.failed {
            summary.pages_failed += 1;
        } else {
            summary.pages_fetched += 1;
        }
        if output.discarded {
            summary.listings_discarded += 1;
        }
        if let Some(listing) = output.listing {
            summary.listings_kept += 1;
            listings.push(listing);
        }
        frontier.extend(output.children);
    }

    info!(
        pages = summary.pages_fetched,
        failed = summary.pages_failed,
        kept = summary.listings_kept,
        discarded = summary.listings_discarded,
        "Crawl finished"
    );

    Ok(CrawlOutcome { listings, summary })
}

// Fetches one frontier entry and parses it according to its stage
async fn run_task(
    client: &Client,
    layout: &SiteLayout,
    filters: &FilterConfig,
    next_page_delay: Duration,
    entry: FrontierEntry,
) -> TaskOutput {
    if !entry.delay.is_zero() {
        tokio::time::sleep(entry.delay).await;
    }

    debug!(stage = entry.stage.name(), url = %entry.url, "Fetching");

    match fetch_page(client, &entry.url).await {
        Ok(html) => parse_page(layout, filters, next_page_delay, &entry, &html),
        Err(e) => {
            warn!(stage = entry.stage.name(), url = %entry.url, error = %e, "Failed to fetch page");
            TaskOutput {
                failed: true,
                ..TaskOutput::default()
            }
        }
    }
}

// Turns a fetched page into the task's output. Never fails: a page without
// the expected blocks simply has no children.
//
// The next-page entry carries its delay, so the sleep happens inside the
// task that fetches it and never blocks the coordinator.
fn parse_page(
    layout: &SiteLayout,
    filters: &FilterConfig,
    next_page_delay: Duration,
    entry: &FrontierEntry,
    html: &str,
) -> TaskOutput {
    let mut output = TaskOutput::default();

    let page_url = match Url::parse(&entry.url) {
        Ok(url) => url,
        Err(_) => return output,
    };
    let document = Html::parse_document(html);

    match &entry.stage {
        Stage::ListingList => {
            for card in extract_listing_cards(&document, layout, &page_url) {
                output.children.push(FrontierEntry::new(
                    card.url,
                    Stage::Detail {
                        image_principale: card.image,
                    },
                ));
            }
            if let Some(next) = extract_next_page(&document, layout, &page_url) {
                output.children.push(FrontierEntry {
                    url: next,
                    stage: Stage::ListingList,
                    delay: next_page_delay,
                });
            }
        }
        Stage::Detail { image_principale } => {
            let listing = extract_listing(
                &document,
                &layout.detail,
                &entry.url,
                image_principale.clone(),
            );
            if filters.keep(&listing) {
                output.listing = Some(listing);
            } else {
                debug!(url = %entry.url, "Listing discarded by filters");
                output.discarded = true;
            }
        }
        directory => {
            if let Some((selector, child_stage)) = layout.directory_links(directory) {
                for url in extract_links(&document, selector, &page_url) {
                    output.children.push(FrontierEntry::new(url, child_stage.clone()));
                }
            }
        }
    }

    debug!(
        stage = entry.stage.name(),
        url = %entry.url,
        children = output.children.len(),
        "Parsed page"
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fetch::build_client;
    use std::time::Instant;

    #[test]
    fn test_parse_directory_page() {
        let layout = SiteLayout::etreproprio().unwrap();
        let entry = FrontierEntry::new(
            "https://www.etreproprio.com/annonces/maison".to_string(),
            Stage::TypeIndex,
        );
        let html = r#"<div class="ep-dir-dept">
                        <a href="/annonces/maison/77">Seine-et-Marne</a>
                        <a href="/annonces/maison/91">Essonne</a>
                      </div>"#;

        let output = parse_page(&layout, &FilterConfig::default(), Duration::ZERO, &entry, html);

        assert_eq!(output.children.len(), 2);
        assert!(output.children.iter().all(|c| c.stage == Stage::Department));
        assert!(output.listing.is_none());
    }

    #[test]
    fn test_parse_page_without_links_ends_branch() {
        let layout = SiteLayout::etreproprio().unwrap();
        let entry = FrontierEntry::new(
            "https://www.etreproprio.com/annonces/maison/77".to_string(),
            Stage::Department,
        );

        let html = "<html>oops</html>";
        let output = parse_page(&layout, &FilterConfig::default(), Duration::ZERO, &entry, html);
        assert!(output.children.is_empty());
        assert!(!output.failed);
    }

    #[test]
    fn test_only_next_page_entry_is_delayed() {
        let layout = SiteLayout::etreproprio().unwrap();
        let entry = FrontierEntry::new(
            "https://www.etreproprio.com/liste/melun".to_string(),
            Stage::ListingList,
        );
        let html = r#"<div class="ep-search-list-wrapper">
                        <a href="/immobilier-1"><img src="/thumb/1.jpg"></a>
                      </div>
                      <a class="ep-nav-link-next" href="/liste/melun-2">Suivant</a>"#;
        let delay = Duration::from_millis(250);

        let output = parse_page(&layout, &FilterConfig::default(), delay, &entry, html);

        assert_eq!(output.children.len(), 2);
        let detail = &output.children[0];
        assert!(matches!(detail.stage, Stage::Detail { .. }));
        assert_eq!(detail.delay, Duration::ZERO);

        let next = &output.children[1];
        assert_eq!(next.url, "https://www.etreproprio.com/liste/melun-2");
        assert_eq!(next.stage, Stage::ListingList);
        assert_eq!(next.delay, delay);
    }

    const DETAIL: &str = r#"<html><body>
        <div class="ep-breadcrumb-cla-dir"><ul>
          <li><span itemprop="name">Accueil</span></li>
          <li><span itemprop="name">{type}</span></li>
        </ul></div>
        <h1 class="annonce-immobilier">{title}</h1>
        <div class="ep-price">{price}</div>
        <div class="ep-area">90 m²</div>
        <div class="ep-loc">Melun 77000</div>
      </body></html>"#;

    fn detail(property_type: &str, title: &str, price: &str) -> String {
        DETAIL
            .replace("{type}", property_type)
            .replace("{title}", title)
            .replace("{price}", price)
    }

    // Builds a small site on a mock server:
    //
    //   /annonces/maison -> /dept/77 -> /ville/melun -> /liste/melun (+ page 2)
    //                    -> /dept/91 (404: dead branch)
    //
    // with three listings, one being an apartment, and one non-listing link.
    async fn mock_site(server: &mut mockito::Server) -> Vec<mockito::Mock> {
        let pages = vec![
            (
                "/annonces/maison",
                r#"<div class="ep-dir-dept">
                     <a href="/dept/77">77</a>
                     <a href="/dept/91">91</a>
                   </div>"#
                    .to_string(),
            ),
            (
                "/dept/77",
                r#"<div class="ep-dir-city"><a href="/ville/melun">Melun</a></div>"#.to_string(),
            ),
            (
                "/ville/melun",
                r#"<div class="ep-dir-list"><a href="/liste/melun">Annonces</a></div>"#.to_string(),
            ),
            (
                "/liste/melun",
                r#"<div class="ep-search-list-wrapper">
                     <a href="/immobilier-1"><img src="/thumb/1.jpg"></a>
                     <a href="/immobilier-2"><img src="/thumb/2.jpg"></a>
                     <a href="/partenaires">Pub</a>
                   </div>
                   <a class="ep-nav-link-next" href="/liste/melun-2">Suivant</a>"#
                    .to_string(),
            ),
            (
                "/liste/melun-2",
                r#"<div class="ep-search-list-wrapper">
                     <a href="/immobilier-3"><img src="/thumb/3.jpg"></a>
                     <a href="/immobilier-1"><img src="/thumb/1.jpg"></a>
                   </div>"#
                    .to_string(),
            ),
            ("/immobilier-1", detail("Maisons à vendre", "Maison 1", "250 000 €")),
            ("/immobilier-2", detail("Appartements à vendre", "Appartement 2", "180 000 €")),
            ("/immobilier-3", detail("Maisons à vendre", "Maison 3", "Prix sur demande")),
        ];

        let mut mocks = Vec::new();
        for (path, body) in pages {
            let mock = server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "text/html; charset=utf-8")
                .with_body(body)
                .expect(1)
                .create_async()
                .await;
            mocks.push(mock);
        }

        let dead = server
            .mock("GET", "/dept/91")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        mocks.push(dead);
        mocks
    }

    fn options() -> CrawlOptions {
        CrawlOptions {
            concurrency: 4,
            next_page_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_crawl_walks_the_whole_hierarchy() {
        let mut server = mockito::Server::new_async().await;
        let mocks = mock_site(&mut server).await;

        let layout = SiteLayout::etreproprio()
            .unwrap()
            .with_entry_urls(vec![format!("{}/annonces/maison", server.url())]);
        let client = build_client().unwrap();

        let outcome = crawl(&client, &layout, &FilterConfig::default(), &options())
            .await
            .unwrap();

        let mut titles: Vec<_> = outcome
            .listings
            .iter()
            .filter_map(|l| l.titre.clone())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Appartement 2", "Maison 1", "Maison 3"]);

        let first = outcome
            .listings
            .iter()
            .find(|l| l.lien.ends_with("/immobilier-1"))
            .unwrap();
        assert_eq!(first.image_principale.as_deref(), Some("/thumb/1.jpg"));

        // 8 pages served, /dept/91 failed, /immobilier-1 fetched only once
        assert_eq!(outcome.summary.pages_fetched, 8);
        assert_eq!(outcome.summary.pages_failed, 1);
        assert_eq!(outcome.summary.listings_kept, 3);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_crawl_applies_filters() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_site(&mut server).await;

        let layout = SiteLayout::etreproprio()
            .unwrap()
            .with_entry_urls(vec![format!("{}/annonces/maison", server.url())]);
        let filters = FilterConfig::from_json(
            r#"{ "type": ["maison"], "prix_min": 200000, "prix_max": 300000 }"#,
        )
        .unwrap();
        let client = build_client().unwrap();

        let outcome = crawl(&client, &layout, &filters, &options()).await.unwrap();

        // Maison 3 has no parsable price, so the price filter is skipped for it
        let mut titles: Vec<_> = outcome
            .listings
            .iter()
            .filter_map(|l| l.titre.clone())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Maison 1", "Maison 3"]);
        assert_eq!(outcome.summary.listings_discarded, 1);
    }

    #[tokio::test]
    async fn test_crawl_waits_before_next_page() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mock_site(&mut server).await;

        let layout = SiteLayout::etreproprio()
            .unwrap()
            .with_entry_urls(vec![format!("{}/annonces/maison", server.url())]);
        let client = build_client().unwrap();
        let delay = Duration::from_millis(400);
        let options = CrawlOptions {
            concurrency: 4,
            next_page_delay: delay,
        };

        let started = Instant::now();
        let outcome = crawl(&client, &layout, &FilterConfig::default(), &options)
            .await
            .unwrap();

        // /immobilier-3 is only linked from the second list page
        assert!(started.elapsed() >= delay);
        assert!(outcome
            .listings
            .iter()
            .any(|l| l.lien.ends_with("/immobilier-3")));
    }

    #[tokio::test]
    async fn test_crawl_rejects_invalid_entry_url() {
        let layout = SiteLayout::etreproprio()
            .unwrap()
            .with_entry_urls(vec!["not a url".to_string()]);
        let client = build_client().unwrap();

        let result = crawl(&client, &layout, &FilterConfig::default(), &options()).await;
        assert!(result.is_err());
    }
}
