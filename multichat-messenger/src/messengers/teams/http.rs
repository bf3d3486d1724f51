//! Teams webhook 请求

use url::Url;

use crate::error::{MessengerError, Result};
use crate::http_client::HttpUtils;
use crate::utils::log_sanitizer::{redact_url, truncate_for_log};

use super::webhook::is_connector_host;
use super::{MessageCard, PLATFORM, TeamsMessenger};

impl TeamsMessenger {
    /// POST a card to a webhook.
    pub(crate) async fn post_card(&self, url: &Url, card: &MessageCard) -> Result<()> {
        let target = redact_url(url.as_str());
        let request = self.client.post(url.clone()).json(card);
        let (status, body) =
            HttpUtils::execute_request(request, PLATFORM, "POST", &target).await?;

        if !(200..300).contains(&status) {
            log::error!("Webhook {target} returned HTTP {status}");
            return Err(MessengerError::transport(
                PLATFORM,
                format!("webhook returned HTTP {status}: {}", truncate_for_log(&body)),
            ));
        }

        // Connector 失败时仍返回 200
        let connector = url.host_str().is_some_and(is_connector_host);
        let body = body.trim();
        if connector && !body.is_empty() && body != "1" {
            log::error!("Webhook {target} rejected the card");
            return Err(MessengerError::transport(
                PLATFORM,
                format!("webhook rejected the card: {}", truncate_for_log(body)),
            ));
        }

        Ok(())
    }
}
