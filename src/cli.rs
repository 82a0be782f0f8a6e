// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Three subcommands, one per stage of the pipeline:
//   crawl  -> annonces.json          (raw listings)
//   clean  -> annonces_propres.csv   (typed dataset)
//   report -> metrics / chart data / one page of rows
// =============================================================================

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::extract::Amenity;

#[derive(Parser, Debug)]
#[command(
    name = "immo-scout",
    version,
    about = "Crawl French real-estate listings, clean them into a dataset and summarize the market",
    long_about = "immo-scout walks a listing site (property type -> département -> city -> \
                  listing list -> listing), keeps the listings matching your filters, turns \
                  them into a clean ';'-separated dataset and reports on it."
)]
pub struct Cli {
    /// Log debug output (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the listing site and write the raw listings as JSON
    ///
    /// Example: immo-scout crawl --filters filtres.json --output annonces.json
    Crawl(CrawlArgs),

    /// Clean raw listings into the dataset
    ///
    /// Example: immo-scout clean annonces.json --output annonces_propres.csv
    Clean(CleanArgs),

    /// Summarize a cleaned dataset (local file or GitHub repository)
    ///
    /// Example: immo-scout report cedric-mc/analyse-marche --github --ville Melun
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Entry page(s) of the crawl, one per property type (default: built-in list)
    #[arg(long = "start-url", value_name = "URL")]
    pub start_urls: Vec<String>,

    /// JSON filter document (keys: type, ville, prix_min, prix_max, surface_min, surface_max)
    #[arg(long, env = "IMMO_FILTERS", value_name = "PATH")]
    pub filters: Option<PathBuf>,

    /// Where to write the raw listings
    #[arg(long, default_value = "annonces.json")]
    pub output: PathBuf,

    /// Maximum number of pages fetched at the same time
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,

    /// Delay before following a "next page" link, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub next_page_delay_ms: u64,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Raw listings (JSON array written by `crawl`)
    pub input: PathBuf,

    /// Where to write the dataset (default: annonces_propres.csv, or .json with --format json)
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
}

impl CleanArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_file_name()))
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// ';'-separated values with a header row
    Csv,
    /// JSON array
    Json,
}

impl OutputFormat {
    fn default_file_name(self) -> &'static str {
        match self {
            OutputFormat::Csv => "annonces_propres.csv",
            OutputFormat::Json => "annonces_propres.json",
        }
    }
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Dataset CSV path, or "owner/repo" with --github
    pub source: String,

    /// Read the dataset from a GitHub repository
    #[arg(long)]
    pub github: bool,

    /// Dataset path inside the repository
    #[arg(long, default_value = "annonces_propres.csv")]
    pub path: String,

    /// GitHub token for private repositories
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Only these cities (repeatable)
    #[arg(long = "ville", value_name = "VILLE")]
    pub cities: Vec<String>,

    /// Only these property types (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Required amenities (repeatable)
    #[arg(long = "amenity", value_enum)]
    pub amenities: Vec<Amenity>,

    #[arg(long)]
    pub prix_min: Option<f64>,

    #[arg(long)]
    pub prix_max: Option<f64>,

    #[arg(long)]
    pub surface_min: Option<f64>,

    #[arg(long)]
    pub surface_max: Option<f64>,

    /// Page of the data table (starts at 1)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = 20)]
    pub per_page: usize,

    /// Number of cities in the rankings
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Output the report as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_crawl_defaults() {
        let args = ["immo-scout", "crawl", "--start-url", "https://example.com/a"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Crawl(args) => {
                assert_eq!(args.start_urls, vec!["https://example.com/a"]);
                assert_eq!(args.output, PathBuf::from("annonces.json"));
                assert_eq!(args.concurrency, 8);
                assert_eq!(args.next_page_delay_ms, 5000);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_clean_output_follows_format() {
        fn clean_args(argv: &[&str]) -> CleanArgs {
            match Cli::try_parse_from(argv.iter().copied()).unwrap().command {
                Commands::Clean(args) => args,
                other => panic!("unexpected command: {:?}", other),
            }
        }

        let csv = clean_args(&["immo-scout", "clean", "annonces.json"]);
        assert_eq!(csv.output_path(), PathBuf::from("annonces_propres.csv"));

        let json = clean_args(&["immo-scout", "clean", "annonces.json", "--format", "json"]);
        assert_eq!(json.output_path(), PathBuf::from("annonces_propres.json"));

        let explicit = clean_args(&[
            "immo-scout", "clean", "annonces.json", "--format", "json", "--output", "out.txt",
        ]);
        assert_eq!(explicit.output_path(), PathBuf::from("out.txt"));
    }

    #[test]
    fn test_parse_report_filters() {
        let cli = Cli::try_parse_from([
            "immo-scout", "-v", "report", "data.csv", "--ville", "Melun", "--ville", "Meaux",
            "--amenity", "balcon-terrasse", "--prix-max", "300000", "--json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.cities, vec!["Melun", "Meaux"]);
                assert_eq!(args.amenities, vec![Amenity::BalconTerrasse]);
                assert_eq!(args.prix_max, Some(300000.0));
                assert!(args.json);
                assert!(!args.github);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
