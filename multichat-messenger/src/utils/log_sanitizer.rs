//! Log sanitization utilities
//!
//! Webhook URLs carry their signing key in the path and query, and API
//! responses may echo message content. Neither is written to logs in full.

use url::Url;

/// Maximum number of bytes of a response body included in log output.
const TRUNCATE_LIMIT: usize = 256;

/// Truncate a string for safe logging, on a char boundary.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        return s.to_string();
    }
    let mut end = TRUNCATE_LIMIT;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, total {} bytes]", &s[..end], s.len())
}

/// Reduce a URL to `scheme://host/…` so webhook secrets never reach the logs.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{host}/…", url.scheme()),
            None => format!("{}:…", url.scheme()),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
