// src/radioquran.rs
//! Radio Quran schedule from radioquran.ir: the ChannelConductor HTML page
//! (descriptions and durations) with the lighter JSON feed as fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{DropReason, Result};
use crate::fetch::Fetcher;
use crate::programme::{Channel, Slot, parse_number};

pub const TVG_ID: &str = "Radio Quran";
pub const DISPLAY_NAME: &str = "Radio Quran";
pub const LOGO: &str = "https://logoyab.com/wp-content/uploads/2024/08/Radio-Quran-Logo.png";
pub const HTML_URL: &str = "https://radioquran.ir/ChannelConductor/";
pub const JSON_URL: &str = "https://radioquran.ir/jsonfeeders/epg/";
/// Prefixed to relative image paths from the JSON feed.
pub const ORIGIN: &str = "https://radioquran.ir";

pub fn channel() -> Channel {
    Channel::new(TVG_ID, DISPLAY_NAME, LOGO)
}

/* ================= HTML ================= */

static RE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fontsize-3">\s*(\d{1,2}:\d{2})\s*</div>"#).expect("time pattern"));
static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)itemprop="name ">(.*?)</h4>"#).expect("title pattern"));
static RE_DESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)itemprop="description">(.*?)</p>"#).expect("desc pattern"));
static RE_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"مدت:(\d+)\s*دقیقه").expect("duration pattern"));
static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"img class="lazy" alt="[^"]*" src="([^"]+)""#).expect("image pattern"));
static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").expect("br pattern"));
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// Raw per-field matches, each in document order. The sequences are not
/// guaranteed to line up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub times: Vec<String>,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
    pub durations: Vec<String>,
    pub images: Vec<String>,
}

impl Extracted {
    /// Number of blocks every field agrees on.
    pub fn aligned_len(&self) -> usize {
        [
            self.times.len(),
            self.titles.len(),
            self.descriptions.len(),
            self.durations.len(),
            self.images.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }
}

/// Pulls the per-field sequences out of a schedule page.
pub trait Extractor {
    fn extract(&self, html: &str) -> Extracted;
}

/// Pattern scans over the ChannelConductor markup.
pub struct RegexExtractor;

fn captures(re: &Regex, html: &str) -> Vec<String> {
    re.captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

impl Extractor for RegexExtractor {
    fn extract(&self, html: &str) -> Extracted {
        Extracted {
            times: captures(&RE_TIME, html),
            titles: captures(&RE_TITLE, html),
            descriptions: captures(&RE_DESC, html),
            durations: captures(&RE_DURATION, html),
            images: captures(&RE_IMAGE, html),
        }
    }
}

/// `<br>` → newline, other tags stripped.
fn clean_description(raw: &str) -> String {
    let text = RE_BR.replace_all(raw.trim(), "\n");
    RE_TAG.replace_all(&text, "").trim().to_string()
}

pub fn parse_html(html: &str) -> Vec<Slot> {
    parse_html_with(&RegexExtractor, html)
}

/// Zips the extracted fields positionally, truncating to the shortest
/// sequence. An empty result means "try the fallback source".
pub fn parse_html_with(extractor: &dyn Extractor, html: &str) -> Vec<Slot> {
    let ex = extractor.extract(html);
    let n = ex.aligned_len();
    if n == 0 {
        tracing::warn!(
            "[radio] regex found: times={}, titles={}, descs={}, durations={}, images={} (HTML was {} chars)",
            ex.times.len(),
            ex.titles.len(),
            ex.descriptions.len(),
            ex.durations.len(),
            ex.images.len(),
            html.len()
        );
        return Vec::new();
    }

    (0..n)
        .map(|i| Slot {
            time: ex.times[i].trim().to_string(),
            title: ex.titles[i].trim().to_string(),
            description: clean_description(&ex.descriptions[i]),
            duration: parse_number(ex.durations[i].trim()).unwrap_or(0),
            image: ex.images[i].clone(),
        })
        .collect()
}

/* ================= JSON feed ================= */

/// "0:5" → "00:05". Anything after a second `:` is ignored.
fn pad_time(raw: &str) -> Option<String> {
    let mut parts = raw.trim().split(':');
    let h = parse_number(parts.next()?.trim())?;
    let m = parse_number(parts.next()?.trim())?;
    Some(format!("{h:02}:{m:02}"))
}

/// Relative paths get the site origin; anything starting with "http" is
/// taken as absolute.
fn absolutize(image: &str) -> String {
    if image.is_empty() || image.starts_with("http") {
        image.to_string()
    } else {
        format!("{ORIGIN}{image}")
    }
}

fn feed_box_to_slot(b: &Value) -> std::result::Result<Slot, DropReason> {
    let text = |k: &str| b.get(k).and_then(|x| x.as_str()).unwrap_or("");

    let title = text("title").trim();
    if title.is_empty() {
        return Err(DropReason::EmptyTitle);
    }
    let time = text("time");
    if !time.contains(':') {
        return Err(DropReason::BadTime);
    }
    let time = pad_time(time).ok_or(DropReason::BadTime)?;

    Ok(Slot {
        time,
        title: title.to_string(),
        description: String::new(),
        duration: 0,
        image: absolutize(text("image")),
    })
}

/// Reads the boxes of the feed's first container. The feed never carries
/// descriptions or durations.
pub fn parse_feed(data: &Value) -> Vec<Slot> {
    let Some(first) = data
        .get("Containers")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        return Vec::new();
    };
    let Some(boxes) = first.get("boxes").and_then(|b| b.as_array()) else {
        return Vec::new();
    };

    boxes
        .iter()
        .filter_map(|b| match feed_box_to_slot(b) {
            Ok(slot) => Some(slot),
            Err(reason) => {
                tracing::debug!("[radio] feed box skipped: {reason}");
                None
            }
        })
        .collect()
}

pub fn parse_feed_str(raw: &str) -> Result<Vec<Slot>> {
    let data: Value = serde_json::from_str(raw)?;
    Ok(parse_feed(&data))
}

/* ================= fetch ================= */

/// Which source the day's slots came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Html(Vec<Slot>),
    Feed(Vec<Slot>),
    /// Something answered but held no programmes.
    Empty,
    /// Neither source could be fetched or decoded.
    Unavailable,
}

pub fn fetch_html(fetcher: &Fetcher) -> Option<String> {
    fetcher.fetch_text(HTML_URL)
}

/// `None` when the feed could not be fetched or is not JSON.
pub fn fetch_feed(fetcher: &Fetcher) -> Option<Vec<Slot>> {
    let raw = fetcher.fetch_text(JSON_URL)?;
    match parse_feed_str(&raw) {
        Ok(slots) => Some(slots),
        Err(e) => {
            tracing::warn!("[radio] JSON decode error: {e}");
            None
        }
    }
}

/// Chooses between the page and the feed given what each produced. The
/// feed is only consulted when the page yields nothing.
pub fn choose<F>(html: Option<String>, feed: F) -> Outcome
where
    F: FnOnce() -> Option<Vec<Slot>>,
{
    if let Some(html) = html {
        let slots = parse_html(&html);
        if !slots.is_empty() {
            let with_desc = slots.iter().filter(|s| !s.description.is_empty()).count();
            let with_dur = slots.iter().filter(|s| s.duration > 0).count();
            tracing::info!(
                "[radio] HTML parsed: {} programmes ({with_desc} with descriptions, {with_dur} with durations)",
                slots.len()
            );
            return Outcome::Html(slots);
        }
        tracing::warn!("[radio] HTML fetched but no programmes parsed");
    }

    tracing::info!("[radio] falling back to JSON feed...");
    match feed() {
        None => Outcome::Unavailable,
        Some(slots) if slots.is_empty() => Outcome::Empty,
        Some(slots) => {
            tracing::info!("[radio] JSON parsed: {} programmes (no descriptions/durations)", slots.len());
            Outcome::Feed(slots)
        }
    }
}

pub fn collect(fetcher: &Fetcher) -> Outcome {
    tracing::info!("[radio] trying HTML page (ChannelConductor)...");
    choose(fetch_html(fetcher), || fetch_feed(fetcher))
}
