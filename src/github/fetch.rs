// src/github/fetch.rs
// =============================================================================
// This module fetches the published dataset from a GitHub repository.
//
// Strategy:
// - Accept "owner/repo" or a full https://github.com/owner/repo URL
// - Fetch the file from raw.githubusercontent.com, branch `main` first, then
//   `master`
// - Send `Authorization: token <GITHUB_TOKEN>` when a token is given, so
//   private repositories work
// =============================================================================

use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::{debug, warn};

const RAW_BASE: &str = "https://raw.githubusercontent.com";
const BRANCHES: [&str; 2] = ["main", "master"];

// Fetches one file of a GitHub repository.
//
// Parameters:
//   client: reqwest HTTP client
//   repo: "owner/repo" or a GitHub URL
//   path: file path inside the repository (e.g. "annonces_propres.csv")
//   token: optional GitHub token
//
// Returns: the file's raw bytes
pub async fn fetch_repo_file(
    client: &Client,
    repo: &str,
    path: &str,
    token: Option<&str>,
) -> Result<Vec<u8>> {
    fetch_from(client, RAW_BASE, repo, path, token).await
}

async fn fetch_from(
    client: &Client,
    base: &str,
    repo: &str,
    path: &str,
    token: Option<&str>,
) -> Result<Vec<u8>> {
    let (owner, repo) = parse_github_repo(repo)?;
    let path = path.trim_start_matches('/');

    let mut last_error = None;
    for branch in BRANCHES {
        let url = format!("{}/{}/{}/{}/{}", base, owner, repo, branch, path);
        debug!(%url, "Fetching dataset from GitHub");

        match fetch_file(client, &url, token).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                warn!(branch, error = %e, "Dataset not available on branch");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("No branch to fetch from")))
}

// Parses a GitHub repository reference to extract owner and repository name
//
// Supported formats:
//   - owner/repo
//   - https://github.com/owner/repo
//   - https://github.com/owner/repo.git
//   - github.com/owner/repo
fn parse_github_repo(reference: &str) -> Result<(String, String)> {
    let trimmed = reference
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    let path = trimmed.strip_prefix("github.com/").unwrap_or(trimmed);

    // Owners never contain a dot, hosts do (gitlab.com/...)
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 || parts[0].contains('.') {
        return Err(anyhow!("Not a GitHub repository: {}", reference));
    }

    let owner = parts[0].to_string();
    let repo = parts[1].trim_end_matches(".git").to_string();
    Ok((owner, repo))
}

async fn fetch_file(client: &Client, url: &str, token: Option<&str>) -> Result<Vec<u8>> {
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.header("Authorization", format!("token {}", token));
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("Failed to fetch {}: HTTP {}", url, response.status()));
    }

    Ok(response.bytes().await?.to_vec())
}
