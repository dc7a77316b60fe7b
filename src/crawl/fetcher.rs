//! Single-page HTTP fetching
//!
//! The [`Fetch`] trait is the crawler's only network primitive. [`Fetcher`]
//! implements it over reqwest with:
//! - browser-like default headers and a locale-biased `Accept-Language`
//! - a per-request timeout
//! - bounded retries with a fixed backoff, for transport failures only
//! - charset detection for pages that do not declare one

use crate::config::CrawlConfig;
use crate::error::{Error, FetchError, Result};
use async_trait::async_trait;
use encoding_rs::Encoding;
use regex::bytes::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Bytes scanned for an in-document charset declaration
const CHARSET_SNIFF_BYTES: usize = 4096;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
        .expect("meta charset pattern is valid")
});

/// A successfully fetched page, decoded to text
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers as (lower-case name, value)
    pub headers: Vec<(String, String)>,
    /// Decoded body
    pub body: String,
}

impl FetchedPage {
    /// Look up a header by name, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Network seam for everything that crawls
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a page
    async fn get(&self, url: &str) -> std::result::Result<FetchedPage, FetchError>;

    /// POST with an empty body (used by random-sample circle APIs)
    async fn post(&self, url: &str) -> std::result::Result<FetchedPage, FetchError>;
}

/// reqwest-backed [`Fetch`] implementation
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
    fallback: &'static Encoding,
}

impl Fetcher {
    /// Create a new fetcher
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| Error::Config(format!("Invalid accept_language: {}", e)))?,
        );

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let fallback = Encoding::for_label(config.fallback_encoding.as_bytes()).ok_or_else(|| {
            Error::Config(format!(
                "Unknown fallback encoding: {}",
                config.fallback_encoding
            ))
        })?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            fallback,
        })
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
    ) -> std::result::Result<FetchedPage, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut attempt = 1;
        loop {
            match self.attempt(method.clone(), &parsed).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    debug!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, self.max_attempts, self.backoff, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &Url,
    ) -> std::result::Result<FetchedPage, FetchError> {
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| FetchError::transport(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url.as_str(), &e))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            headers,
            body: decode_body(&bytes, content_type.as_deref(), self.fallback),
        })
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn get(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        self.request(Method::GET, url).await
    }

    async fn post(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        self.request(Method::POST, url).await
    }
}

/// Decode a response body.
///
/// Order: byte-order mark, `charset` in the Content-Type header, a `<meta>`
/// charset near the top of the document, then UTF-8 if the bytes are valid
/// UTF-8, else `fallback`.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>, fallback: &'static Encoding) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }

    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| sniff_meta_charset(bytes));

    let encoding = match declared {
        Some(encoding) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => encoding_rs::UTF_8,
        None => fallback,
    };

    encoding.decode(bytes).0.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Encoding::for_label(value.trim().trim_matches('"').as_bytes())
        } else {
            None
        }
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?.as_bytes();
    let encoding = Encoding::for_label(label)?;
    // A document cannot declare itself UTF-16 from inside ASCII-compatible bytes
    if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
        Some(encoding_rs::UTF_8)
    } else {
        Some(encoding)
    }
}
