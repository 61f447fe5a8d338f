// src/main.rs
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::process::ExitCode;
use tracing::{error, info, warn};

mod config;
mod error;
mod fetch;
mod logging;
mod oauth;
mod programme;
mod radioquran;
mod schedule;
mod sepehr;
mod xmltv;

use config::{Config, GENERATOR_NAME, GENERATOR_URL};
use programme::{day_start, iran_tz};
use radioquran::Outcome;
use xmltv::Tv;

/// How one source fared this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStatus {
    Skipped,
    Failed,
    Added(usize),
}

fn run_sepehr(cfg: &Config, tv: &mut Tv, now: &DateTime<FixedOffset>) -> SourceStatus {
    if cfg.skip_sepehr {
        info!("[sepehr] skipped by flag");
        return SourceStatus::Skipped;
    }
    let Some(creds) = cfg.sepehr.as_ref() else {
        info!("[sepehr] OAuth credentials not set, skipping TV channels");
        return SourceStatus::Skipped;
    };

    let client = match sepehr::SepehrClient::new(creds, cfg.timeout) {
        Ok(c) => c,
        Err(e) => {
            error!("[sepehr] client setup failed: {e}");
            return SourceStatus::Failed;
        }
    };

    let today = now.date_naive();
    info!("[sepehr] credentials found, checking token...");
    if !client.check_token(today) {
        warn!("[sepehr] token is INVALID (may need rotation)");
        return SourceStatus::Failed;
    }
    info!("[sepehr] token is valid");

    for ch in sepehr::CHANNELS {
        tv.add_channel(ch.channel());
    }

    let mut added = 0;
    for ch in sepehr::CHANNELS {
        match client.fetch_day(ch.id, today) {
            Ok(items) => {
                let n = sepehr::append_sepehr(tv, &items, ch.tvg_id);
                info!("[sepehr] {} (channel {}) {today}: {n} programmes", ch.display_name, ch.id);
                added += n;
            }
            Err(e) => warn!("[sepehr] {} (channel {}) {today}: FAILED: {e}", ch.display_name, ch.id),
        }
    }
    SourceStatus::Added(added)
}

fn run_radio(cfg: &Config, tv: &mut Tv, now: &DateTime<FixedOffset>) -> SourceStatus {
    if cfg.skip_radio {
        info!("[radio] skipped by flag");
        return SourceStatus::Skipped;
    }
    tv.add_channel(radioquran::channel());

    let fetcher = match fetch::Fetcher::new(cfg.timeout, cfg.retries) {
        Ok(f) => f,
        Err(e) => {
            error!("[radio] client setup failed: {e}");
            return SourceStatus::Failed;
        }
    };

    let today = now.date_naive();
    let slots = match radioquran::collect(&fetcher) {
        Outcome::Html(s) | Outcome::Feed(s) => s,
        Outcome::Empty => {
            warn!("[radio] {today}: no programmes found in either source");
            return SourceStatus::Failed;
        }
        Outcome::Unavailable => {
            warn!("[radio] {today}: FAILED, both HTML and JSON returned nothing");
            return SourceStatus::Failed;
        }
    };

    let added = schedule::append_radio(tv, &slots, radioquran::TVG_ID, &day_start(now));
    if added == 0 {
        warn!("[radio] {today}: no programmes converted (page structure may have changed)");
        return SourceStatus::Failed;
    }
    info!("[radio] {today}: {added} programmes added to EPG");
    SourceStatus::Added(added)
}

fn main() -> Result<ExitCode> {
    let cfg = Config::load();
    logging::init();

    let now = Utc::now().with_timezone(&iran_tz());
    info!("[start] EPG generation at {}", now.to_rfc3339());

    let mut tv = Tv::new(GENERATOR_NAME, GENERATOR_URL);

    // sequential on purpose: authenticated source, then radio
    let sepehr_status = run_sepehr(&cfg, &mut tv, &now);
    let radio_status = run_radio(&cfg, &mut tv, &now);

    let total = tv.programme_count();
    if total == 0 {
        error!("no programmes from ANY source, EPG is completely empty");
        return Ok(ExitCode::FAILURE);
    }

    tv.write_to(&cfg.output)
        .with_context(|| format!("writing {}", cfg.output.display()))?;
    info!(
        "wrote {total} total programmes for {} channels to {}",
        tv.channels().len(),
        cfg.output.display()
    );

    for (name, status) in [("sepehr", sepehr_status), ("radio", radio_status)] {
        if let SourceStatus::Added(n) = status {
            info!("[{name}] contributed {n} programmes");
        }
    }
    if sepehr_status == SourceStatus::Failed {
        warn!("Sepehr failed but Radio Quran succeeded, partial EPG written (OAuth keys may need rotation)");
    }
    if radio_status == SourceStatus::Failed {
        warn!("Radio Quran returned no data, only Sepehr TV in EPG");
    }

    if cfg.preview > 0 {
        println!("[Programmes: {total}]\n");
        for e in tv.entries().iter().take(cfg.preview) {
            println!("- [{}] {}", e.channel, e.programme);
        }
    }

    info!("[done]");
    Ok(ExitCode::SUCCESS)
}
