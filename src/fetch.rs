// src/fetch.rs
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, USER_AGENT};
use reqwest::redirect::Policy;
use std::{thread, time::Duration};

use crate::error::{Error, Result};

pub const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const BACKOFF_START_MS: u64 = 300;
const BACKOFF_MAX_MS: u64 = 3000;

/// Public pages behind bot protection: browser-looking headers plus a
/// bounded retry budget.
pub struct Fetcher {
    client: Client,
    retries: u32,
}

impl Fetcher {
    pub fn new(timeout: Duration, retries: u32) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fa-IR,fa;q=0.9,en-US;q=0.8,en;q=0.7"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(Policy::limited(10))
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, retries: retries.max(1) })
    }

    fn get_once(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status { url: url.to_string(), status });
        }
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Err(Error::EmptyBody { url: url.to_string() });
        }
        Ok(text)
    }

    /// Fetches `url`, retrying with exponential backoff. Fails with
    /// `Error::Exhausted` once the budget is spent.
    pub fn try_fetch_text(&self, url: &str) -> Result<String> {
        let mut backoff = BACKOFF_START_MS;
        for attempt in 1..=self.retries {
            match self.get_once(url) {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.retries => {
                    tracing::warn!("attempt {attempt} for {url} failed ({e}), retrying...");
                    thread::sleep(Duration::from_millis(backoff));
                    backoff = (backoff * 2).min(BACKOFF_MAX_MS);
                }
                Err(e) => {
                    tracing::warn!("failed to fetch {url} after {} attempts: {e}", self.retries);
                }
            }
        }
        Err(Error::Exhausted { url: url.to_string(), attempts: self.retries })
    }

    /// Same as `try_fetch_text`, with exhaustion reported as `None`.
    pub fn fetch_text(&self, url: &str) -> Option<String> {
        self.try_fetch_text(url).ok()
    }
}
