//! Webhook URL 校验
//!
//! Host checks are advisory: tenants use regional and custom endpoints, so an
//! unknown host is logged and still attempted. Only URLs that cannot be posted
//! to at all are rejected.

use url::Url;

use crate::error::{MessengerError, Result};
use crate::utils::log_sanitizer::redact_url;

/// Exact hosts or host prefixes used by workflow and connector webhooks.
const KNOWN_HOST_PATTERNS: &[&str] = &[
    "prod.apiflow.microsoft.com",
    "prod-",
    "outlook.office.com",
    "outlook.office365.com",
    "webhook.office.com",
];

/// Per-tenant connector hosts, e.g. `contoso.webhook.office.com`.
const KNOWN_HOST_SUFFIX: &str = ".webhook.office.com";

/// Parse a webhook URL. Returns the URL and whether its host is a known Teams endpoint.
pub(crate) fn parse_webhook_url(raw: &str) -> Result<(Url, bool)> {
    let invalid = |detail: String| MessengerError::InvalidIdentifier {
        value: redact_url(raw),
        detail,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(format!("invalid URL format: {e}")))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| invalid("URL has no host".to_string()))?
        .to_ascii_lowercase();

    let known = is_known_host(&host);
    if !known {
        log::warn!("Webhook host '{host}' doesn't match known Teams patterns - will attempt anyway");
    }
    Ok((url, known))
}

fn is_known_host(host: &str) -> bool {
    KNOWN_HOST_PATTERNS
        .iter()
        .any(|pattern| host == *pattern || host.starts_with(pattern))
        || host.ends_with(KNOWN_HOST_SUFFIX)
}

/// O365 connectors answer `200 "1"` on success and `200 <error text>` otherwise.
pub(crate) fn is_connector_host(host: &str) -> bool {
    host == "outlook.office.com"
        || host == "outlook.office365.com"
        || host == "webhook.office.com"
        || host.ends_with(KNOWN_HOST_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn known_hosts() {
        for raw in [
            "https://prod-27.westus.logic.azure.com:443/workflows/abc/triggers/manual/paths/invoke",
            "https://prod.apiflow.microsoft.com/flows/1",
            "https://outlook.office.com/webhook/abc",
            "https://contoso.webhook.office.com/webhookb2/abc",
        ] {
            let (_, known) = parse_webhook_url(raw).unwrap();
            assert!(known, "{raw}");
        }
    }

    #[test]
    fn unknown_host_is_accepted() {
        let (url, known) = parse_webhook_url("https://hooks.example.com/teams").unwrap();
        assert!(!known);
        assert_eq!(url.host_str(), Some("hooks.example.com"));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let err = parse_webhook_url("not a url").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Identifier);
        assert!(err.to_string().contains("invalid URL format"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = parse_webhook_url("ftp://outlook.office.com/webhook").unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn error_does_not_echo_the_secret_path() {
        let err = parse_webhook_url("mailto:someone@example.com").unwrap_err();
        assert!(!err.to_string().contains("someone"));
    }

    #[test]
    fn connector_hosts() {
        assert!(is_connector_host("contoso.webhook.office.com"));
        assert!(!is_connector_host("prod-27.westus.logic.azure.com"));
    }
}
