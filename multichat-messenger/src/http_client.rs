//! Shared HTTP plumbing for webhook and REST backends.
//!
//! Each backend builds its own `RequestBuilder` (auth headers, body); this
//! module owns sending, status classification, and logging.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::error::{MessengerError, Result};
use crate::utils::log_sanitizer::truncate_for_log;

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// 默认请求超时（秒）
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Create an HTTP client with the default timeouts.
pub fn create_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| MessengerError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Send a request and return `(status, body)` for any non-throttled response.
    ///
    /// HTTP 429 becomes [`MessengerError::RateLimited`]; connection failures and
    /// timeouts become [`MessengerError::Transport`]. Other statuses are returned
    /// to the caller, which knows what the platform's success codes are.
    ///
    /// `target` is only used for logging and must already be redacted.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        platform: &str,
        method_name: &str,
        target: &str,
    ) -> Result<(u16, String)> {
        log::debug!("[{platform}] {method_name} {target}");

        let response = request_builder.send().await.map_err(|e| {
            let detail = if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                format!("request failed: {e}")
            };
            log::error!("[{platform}] {detail}");
            MessengerError::transport(platform, detail)
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{platform}] Response Status: {status_code}");

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status_code == 429 {
            log::warn!("[{platform}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(MessengerError::RateLimited {
                platform: platform.to_string(),
                retry_after,
            });
        }

        let response_text = response.text().await.map_err(|e| {
            MessengerError::transport(platform, format!("failed to read response body: {e}"))
        })?;

        log::debug!(
            "[{platform}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }
}
