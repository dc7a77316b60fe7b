//! Site identity keys
//!
//! Every URL that enters the queue, the node store or an edge goes through
//! [`normalize`] first, so the key it produces is the only identity a site has.

use url::Url;

/// Canonicalize a raw URL into a site identity key.
///
/// Keys always use `https://`, so `http`/`https` variants of a site share
/// one identity; the host is lower-cased and stripped of leading `www.`
/// labels; query, fragment, user info and trailing slashes are dropped.
/// Returns an empty string for anything that does not parse to an http(s)
/// URL with a host.
pub fn normalize(raw: &str) -> String {
    match parse_lenient(raw) {
        Some(url) => render(&url, true),
        None => String::new(),
    }
}

/// Like [`normalize`] but keeps only `https://host[:port]`
pub fn base(raw: &str) -> String {
    match parse_lenient(raw) {
        Some(url) => render(&url, false),
        None => String::new(),
    }
}

/// Host of a URL as it appears in its identity key
pub fn host_of(raw: &str) -> Option<String> {
    parse_lenient(raw).and_then(|url| canonical_host(&url))
}

/// Parse with the same leniency as [`normalize`]: add a scheme when missing
pub(crate) fn parse_lenient(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        Url::parse(trimmed).ok()?
    } else if has_foreign_scheme(trimmed) {
        return None;
    } else {
        Url::parse(&format!("https://{}", trimmed.trim_start_matches('/'))).ok()?
    };

    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// `mailto:x`, `ftp://x`, `javascript:x`; but not `host:8080`
fn has_foreign_scheme(raw: &str) -> bool {
    let Some((scheme, rest)) = raw.split_once(':') else {
        return false;
    };
    let is_scheme = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    is_scheme && !rest.starts_with(|c: char| c.is_ascii_digit())
}

fn canonical_host(url: &Url) -> Option<String> {
    let mut host = url.host_str()?.to_lowercase();
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest.to_string();
    }
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

fn render(url: &Url, with_path: bool) -> String {
    let Some(host) = canonical_host(url) else {
        return String::new();
    };

    let mut key = format!("https://{}", host);
    // 443 is the default for the rendered scheme even when the input was http
    if let Some(port) = url.port().filter(|p| *p != 443) {
        key.push_str(&format!(":{}", port));
    }
    if with_path {
        key.push_str(url.path().trim_end_matches('/'));
    }
    key
}
