// src/config.rs
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::oauth::Credentials;

pub const GENERATOR_NAME: &str = "EPG-IRIB";
pub const GENERATOR_URL: &str = "https://github.com/saif-at-github/EPG-IRIB";

#[derive(Parser, Debug)]
#[command(
    name = "epg-irib",
    about = "IRIB Quran TV (Sepehr API) + Radio Quran (radioquran.ir) → one XMLTV file"
)]
pub struct Args {
    /// Output XMLTV file
    #[arg(long, env = "EPG_OUTPUT", default_value = "epg.xml")]
    pub output: PathBuf,

    /// Attempts per public page fetch
    #[arg(long, env = "EPG_FETCH_RETRIES", default_value_t = 3)]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "EPG_FETCH_TIMEOUT", default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long)]
    pub skip_sepehr: bool,

    #[arg(long)]
    pub skip_radio: bool,

    /// Print the first N programmes after writing
    #[arg(long, env = "PREVIEW_N", default_value_t = 0)]
    pub preview: usize,

    #[arg(long, env = "SEPEHR_CONSUMER_KEY", hide_env_values = true)]
    pub consumer_key: Option<String>,
    #[arg(long, env = "SEPEHR_CONSUMER_SECRET", hide_env_values = true)]
    pub consumer_secret: Option<String>,
    #[arg(long, env = "SEPEHR_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    #[arg(long, env = "SEPEHR_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,
}

/// Everything one run needs, built once in `main`.
#[derive(Debug)]
pub struct Config {
    pub output: PathBuf,
    pub retries: u32,
    pub timeout: Duration,
    pub skip_sepehr: bool,
    pub skip_radio: bool,
    pub preview: usize,
    /// `None` when any of the four OAuth values is missing.
    pub sepehr: Option<Credentials>,
}

impl From<Args> for Config {
    fn from(a: Args) -> Self {
        Self {
            output: a.output,
            retries: a.retries,
            timeout: Duration::from_secs(a.timeout_secs),
            skip_sepehr: a.skip_sepehr,
            skip_radio: a.skip_radio,
            preview: a.preview,
            sepehr: Credentials::from_parts(a.consumer_key, a.consumer_secret, a.access_token, a.token_secret),
        }
    }
}

impl Config {
    /// `.env` first (if present), then flags and environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Args::parse().into()
    }
}
