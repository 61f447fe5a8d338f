// src/sepehr.rs
//! IRIB TV schedule from the Sepehr API (OAuth 1.0a signed).

use chrono::{Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration as StdDuration;
use url::Url;

use crate::error::{DropReason, Error, Result};
use crate::fetch::BROWSER_UA;
use crate::oauth::{Credentials, authorization_header, nonce};
use crate::programme::{Channel, Programme, from_millis};
use crate::xmltv::Tv;

pub const API_BASE: &str = "https://sepehrapi.sepehrtv.ir/v3/epg/tvprogram";

/// Channel used for the credential health check.
pub const PROBE_CHANNEL: i64 = 46;

pub struct SepehrChannel {
    pub id: i64,
    pub tvg_id: &'static str,
    pub display_name: &'static str,
    pub logo: &'static str,
}

impl SepehrChannel {
    pub fn channel(&self) -> Channel {
        Channel::new(self.tvg_id, self.display_name, self.logo)
    }
}

pub const CHANNELS: &[SepehrChannel] = &[SepehrChannel {
    id: 46,
    tvg_id: "QuranTV.ir@SD",
    display_name: "IRIB Quran",
    logo: "https://lb-cdn.sepehrtv.ir/img/channel/quarnlogo.png",
}];

/// One entry of the API's `list`. Only the fields the guide needs.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)] pub start: Option<i64>,       // epoch ms
    #[serde(default)] pub duration: Option<i64>,    // minutes
    #[serde(default)] pub title: Option<String>,
    #[serde(default)] pub desc_summary: Option<String>,
    #[serde(default)] pub desc_full: Option<String>,
    #[serde(default)] pub image_url: Option<String>,
}

/// Full description wins over the summary; blank counts as missing.
fn pick_description(item: &Item) -> String {
    [&item.desc_full, &item.desc_summary]
        .into_iter()
        .flatten()
        .map(|d| d.trim())
        .find(|d| !d.is_empty())
        .unwrap_or("")
        .to_string()
}

fn to_programme(item: &Item) -> std::result::Result<Programme, DropReason> {
    let start_ms = item.start.filter(|ms| *ms != 0).ok_or(DropReason::MissingStart)?;
    let title = item.title.as_deref().unwrap_or("").trim();
    if title.is_empty() {
        return Err(DropReason::EmptyTitle);
    }
    let start = from_millis(start_ms).ok_or(DropReason::OutOfRange)?;

    // a duration too large to add leaves the programme open ended
    let stop = match item.duration.unwrap_or(0) {
        d if d > 0 => Duration::try_minutes(d).and_then(|d| start.checked_add_signed(d)),
        _ => None,
    };

    Ok(Programme {
        start,
        stop,
        title: title.to_string(),
        description: pick_description(item),
        image: item.image_url.clone().unwrap_or_default(),
    })
}

/// Normalises API items, skipping any that lack a start or a title.
pub fn parse_items(items: &[Item]) -> Vec<Programme> {
    items
        .iter()
        .filter_map(|it| match to_programme(it) {
            Ok(p) => Some(p),
            Err(reason) => {
                tracing::debug!("[sepehr] item skipped: {reason}");
                None
            }
        })
        .collect()
}

/// Reads `list` out of a response body. Items that do not decode are
/// skipped one by one.
pub fn items_from_body(body: &Value) -> Vec<Item> {
    body.get("list")
        .and_then(|l| l.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| serde_json::from_value::<Item>(e.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Appends one channel-day of API items to `tv`. Returns entries added.
pub fn append_sepehr(tv: &mut Tv, items: &[Item], tvg_id: &str) -> usize {
    tv.add_programmes(tvg_id, parse_items(items))
}

/* ================= transport ================= */

pub struct SepehrClient {
    client: Client,
    creds: Credentials,
    base: String,
}

impl SepehrClient {
    pub fn new(creds: &Credentials, timeout: StdDuration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://sepehrtv.ir"));
        headers.insert(REFERER, HeaderValue::from_static("https://sepehrtv.ir/"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, creds: creds.clone(), base: API_BASE.to_string() })
    }

    #[cfg(test)]
    fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    /// One day of one channel. HTTP 500 is how the API says "no data for
    /// this date yet" and comes back as an empty list.
    pub fn fetch_day(&self, channel_id: i64, date: NaiveDate) -> Result<Vec<Item>> {
        let url = Url::parse_with_params(
            &self.base,
            &[("channel_id", channel_id.to_string()), ("date", date.format("%Y-%m-%d").to_string())],
        )?;
        let auth = authorization_header(&self.creds, "GET", &url, &[], &nonce(), Utc::now().timestamp());

        let resp = self.client.get(url.clone()).header(AUTHORIZATION, auth).send()?;
        let status = resp.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::Status { url: url.to_string(), status });
        }

        let body: Value = resp.json()?;
        Ok(items_from_body(&body))
    }

    /// Credentials work iff today's probe channel returns programmes.
    pub fn check_token(&self, today: NaiveDate) -> bool {
        match self.fetch_day(PROBE_CHANNEL, today) {
            Ok(items) => !items.is_empty(),
            Err(e) => {
                tracing::debug!("[sepehr] token check failed: {e}");
                false
            }
        }
    }
}
