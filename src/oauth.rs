// src/oauth.rs
//! OAuth 1.0a request signing (HMAC-SHA1), header form.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::{Rng, distributions::Alphanumeric};
use sha1::Sha1;
use std::fmt;
use url::{Position, Url};

#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl Credentials {
    /// `None` unless all four values are present and non-empty.
    pub fn from_parts(
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
        token: Option<String>,
        token_secret: Option<String>,
    ) -> Option<Self> {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Self {
            consumer_key: keep(consumer_key)?,
            consumer_secret: keep(consumer_secret)?,
            token: keep(token)?,
            token_secret: keep(token_secret)?,
        })
    }
}

// secrets stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("token", &self.token)
            .field("token_secret", &"***")
            .finish()
    }
}

fn enc(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

pub fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn oauth_params(creds: &Credentials, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".into(), creds.consumer_key.clone()),
        ("oauth_nonce".into(), nonce.to_string()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
        ("oauth_token".into(), creds.token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ]
}

/// Signature base string: method, base URL (no query) and the sorted,
/// encoded union of query, body and protocol parameters.
pub(crate) fn base_string(method: &str, url: &Url, extra: &[(&str, &str)], oauth: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (enc(&k), enc(&v)))
        .chain(extra.iter().map(|(k, v)| (enc(k), enc(v))))
        .chain(oauth.iter().map(|(k, v)| (enc(k), enc(v))))
        .collect();
    params.sort();

    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_url = &url[..Position::AfterPath];
    format!("{}&{}&{}", method.to_ascii_uppercase(), enc(base_url), enc(&joined))
}

pub fn signature(base: &str, creds: &Credentials) -> String {
    let key = format!("{}&{}", enc(&creds.consumer_secret), enc(&creds.token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// `Authorization` header value for one request. `extra` holds
/// form-encoded body parameters, if any.
pub fn authorization_header(
    creds: &Credentials,
    method: &str,
    url: &Url,
    extra: &[(&str, &str)],
    nonce: &str,
    timestamp: i64,
) -> String {
    let mut oauth = oauth_params(creds, nonce, timestamp);
    let sig = signature(&base_string(method, url, extra, &oauth), creds);
    oauth.push(("oauth_signature".into(), sig));
    oauth.sort();

    let fields = oauth
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, enc(k), enc(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}
