// src/crawl/fetch.rs
// =============================================================================
// Fetching pages over HTTP.
//
// One reqwest Client is built per run and shared by every crawl task
// (cloning it is cheap, it's a handle to a shared connection pool).
//
// A failed fetch is not fatal for the crawl: the caller logs the FetchError
// and treats the page as having no links and no record. The error is still
// classified (timeout, HTTP status, connection...) so the logs say why.
// =============================================================================

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("immo-scout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("{0}")]
    Request(String),
}

// HTTP client used for the whole crawl:
// 10 second timeout, at most 5 redirects, identifies itself as immo-scout
pub fn build_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

// Fetches a page and returns its HTML.
//
// Non-2xx responses are errors (FetchError::Status).
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await.map_err(categorize_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    response.text().await.map_err(categorize_error)
}

// Maps reqwest's error to the failure modes we log
fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else if let Some(status) = error.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Request(error.to_string())
    }
}
