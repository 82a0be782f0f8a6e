// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, printed to stderr)
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = nothing produced, 2 = error)
//
// The pipeline:
//   crawl  -> annonces.json          raw listings, as found on the pages
//   clean  -> annonces_propres.csv   typed, normalized dataset
//   report -> figures over the dataset (tables, or JSON for a dashboard)
// =============================================================================

mod clean;         // src/clean/ - raw records -> typed dataset
mod cli;           // src/cli.rs - command-line parsing
mod crawl;         // src/crawl/ - walking the listing site
mod extract;       // src/extract/ - detail page fields and filters
mod github;        // src/github/ - reading the published dataset
mod report;        // src/report/ - market figures

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{CleanArgs, Cli, Commands, CrawlArgs, OutputFormat, ReportArgs};
use crawl::{CrawlOptions, CrawlSummary, SiteLayout};
use extract::{Amenity, FilterConfig, RawListing};
use report::{LabelCount, Report, ReportQuery};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = output written / report printed
//   Ok(1) = ran fine but produced nothing (no listing kept, empty dataset,
//           no listing matching the report filters)
//   Err = unexpected error (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Crawl(args) => handle_crawl(args).await,
        Commands::Clean(args) => handle_clean(args).await,
        Commands::Report(args) => handle_report(args).await,
    }
}

// Logs go to stderr so that `report --json` stays pipeable.
// RUST_LOG wins over --verbose when set.
fn init_logging(verbose: bool) {
    let default = if verbose { "immo_scout=debug" } else { "immo_scout=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Handles the 'crawl' subcommand
async fn handle_crawl(args: CrawlArgs) -> Result<i32> {
    let client = crawl::build_client()?;
    let layout = SiteLayout::etreproprio()?.with_entry_urls(args.start_urls);

    let filters = match &args.filters {
        Some(path) => FilterConfig::load(path).await?,
        None => FilterConfig::default(),
    };
    if filters.is_empty() {
        info!("No filters given, every listing is kept");
    } else {
        info!(?filters, "Filters loaded");
    }

    let options = CrawlOptions {
        concurrency: args.concurrency,
        next_page_delay: Duration::from_millis(args.next_page_delay_ms),
    };

    println!("🔍 Crawling {} entry page(s)", layout.entry_urls.len());
    let outcome = crawl::crawl(&client, &layout, &filters, &options).await?;

    let json = serde_json::to_vec_pretty(&outcome.listings)?;
    tokio::fs::write(&args.output, json)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_crawl_summary(&outcome.summary, &outcome.listings);
    println!("💾 Listings written to {}", args.output.display());

    if outcome.listings.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn print_crawl_summary(summary: &CrawlSummary, listings: &[RawListing]) {
    println!();
    println!("📊 Summary:");
    println!("   📄 Pages fetched: {}", summary.pages_fetched);
    println!("   ❌ Pages failed: {}", summary.pages_failed);
    println!("   ✅ Listings kept: {}", summary.listings_kept);
    println!("   🚫 Listings discarded: {}", summary.listings_discarded);

    if listings.is_empty() {
        return;
    }
    for amenity in Amenity::ALL {
        let count = listings.iter().filter(|l| l.amenity(amenity).is_some()).count();
        println!("   {:<16} {}", amenity.column(), count);
    }
}

// Handles the 'clean' subcommand
async fn handle_clean(args: CleanArgs) -> Result<i32> {
    let records = clean::load_raw_records(&args.input).await?;
    let dataset = clean::clean_dataset(&records);

    let bytes = match args.format {
        OutputFormat::Csv => clean::to_csv(&dataset)?,
        OutputFormat::Json => clean::to_json(&dataset)?,
    };
    let output = args.output_path();
    tokio::fs::write(&output, bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "🧹 {} raw record(s) -> {} clean listing(s) ({} dropped)",
        records.len(),
        dataset.len(),
        records.len() - dataset.len()
    );
    println!("💾 Dataset written to {}", output.display());

    if dataset.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'report' subcommand
async fn handle_report(args: ReportArgs) -> Result<i32> {
    let bytes = if args.github {
        info!(repo = %args.source, path = %args.path, "Reading dataset from GitHub");
        let client = crawl::build_client()?;
        github::fetch_repo_file(&client, &args.source, &args.path, args.token.as_deref()).await?
    } else {
        tokio::fs::read(&args.source)
            .await
            .with_context(|| format!("Failed to read {}", args.source))?
    };

    let listings = clean::from_csv(&bytes)?;
    let query = ReportQuery {
        cities: args.cities,
        types: args.types,
        amenities: args.amenities,
        prix_min: args.prix_min,
        prix_max: args.prix_max,
        surface_min: args.surface_min,
        surface_max: args.surface_max,
        page: args.page,
        per_page: args.per_page,
        top: args.top,
    };

    let report = report::build_report(&listings, &query);
    print_results(&report, &query, args.json)?;

    if report.matching == 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Prints the report either as tables or JSON
fn print_results(report: &Report, query: &ReportQuery, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_tables(report, query);
    }
    Ok(())
}

// Prints the report as human-readable tables in the terminal
fn print_tables(report: &Report, query: &ReportQuery) {
    println!("📊 {} listing(s) out of {} match", report.matching, report.total);
    if !query.amenities.is_empty() {
        let required: Vec<&str> = query.amenities.iter().map(|a| a.column()).collect();
        println!("   required: {}", required.join(", "));
    }
    println!("   mean price per m²: {}", format_amount(report.mean_prix_m2, " €"));
    println!("   mean surface:      {}", format_amount(report.mean_surface, " m²"));

    if let Some(boxplot) = &report.prix_m2_boxplot {
        println!(
            "   price per m²: min {:.0} | q1 {:.0} | median {:.0} | q3 {:.0} | max {:.0}",
            boxplot.min, boxplot.q1, boxplot.median, boxplot.q3, boxplot.max
        );
    }

    if !report.top_prix_m2.is_empty() {
        println!();
        println!("{:<30} {:>12} {:>10}", "VILLE", "€/m²", "ANNONCES");
        println!("{}", "=".repeat(54));
        for city in &report.top_prix_m2 {
            println!(
                "{:<30} {:>12.2} {:>10}",
                truncate(&city.ville, 30),
                city.value,
                city.listings
            );
        }
    }

    println!();
    println!("   DPE: {}", format_labels(&report.dpe));
    println!("   GES: {}", format_labels(&report.ges));

    println!();
    println!(
        "{:<40} {:<20} {:<12} {:>12} {:>8} {:>9}",
        "TITRE", "VILLE", "TYPE", "PRIX", "M²", "€/M²"
    );
    println!("{}", "=".repeat(106));
    for row in &report.page.rows {
        println!(
            "{:<40} {:<20} {:<12} {:>12.0} {:>8.1} {:>9}",
            truncate(row.titre.as_deref().unwrap_or("-"), 40),
            truncate(row.ville.as_deref().unwrap_or("-"), 20),
            truncate(row.property_type.as_deref().unwrap_or("-"), 12),
            row.prix,
            row.surface,
            row.prix_m2.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v)),
        );
    }
    println!(
        "   page {}/{}",
        report.page.number,
        report.page.total_pages.max(1)
    );
}

fn format_labels(counts: &[LabelCount]) -> String {
    counts
        .iter()
        .map(|c| format!("{}:{}", c.label, c.count))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_amount(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, unit),
        None => "-".to_string(),
    }
}

// Cuts on characters, not bytes: titles are full of accents
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
