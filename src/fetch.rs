use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{error, info};

use crate::config::Settings;

/// Anything that can hand back the raw body of a page.
///
/// `None` is the skip sentinel: the page failed, or the site says it does not
/// exist. Implementations log the reason.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

/// Single-shot blocking HTTP fetcher. No retries.
pub struct HttpFetcher {
    client: Client,
    not_found_marker: String,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpFetcher {
            client,
            not_found_marker: settings.not_found_marker.clone(),
        })
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).send() {
            Ok(r) => r,
            Err(e) => {
                error!("Request failed for {}: {}", url, e);
                return None;
            }
        };
        let status = response.status();
        let body = match response.bytes() {
            Ok(b) => b.to_vec(),
            Err(e) => {
                error!("Failed to read body of {}: {}", url, e);
                return None;
            }
        };
        classify_response(url, status, body, &self.not_found_marker)
    }
}

/// Decide whether a response is usable content.
pub fn classify_response(
    url: &str,
    status: StatusCode,
    body: Vec<u8>,
    not_found_marker: &str,
) -> Option<Vec<u8>> {
    if status != StatusCode::OK {
        error!("Failed to fetch {} (HTTP {})", url, status.as_u16());
        return None;
    }
    if String::from_utf8_lossy(&body).contains(not_found_marker) {
        info!("Skipping {} - no such page", url);
        return None;
    }
    Some(body)
}

// ── Tests ──
