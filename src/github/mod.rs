// src/github/mod.rs
// =============================================================================
// This module fetches files from GitHub repositories.
//
// The cleaned dataset is usually committed to a repository (a scheduled job
// crawls, cleans and pushes `annonces_propres.csv`). `report --github` reads
// it from there instead of from a local file.
// =============================================================================

mod fetch;

pub use fetch::fetch_repo_file;
