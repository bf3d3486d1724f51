//! Teams Messenger trait 实现

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{DeliveryError, MessengerError, Result};
use crate::operation::Namespace;
use crate::traits::Messenger;
use crate::types::ConnectionState;
use crate::utils::log_sanitizer::redact_url;

use super::webhook::parse_webhook_url;
use super::{MessageCard, MessageReceipt, PLATFORM, TeamsMessenger, WebhookCheck};

type Delivery = std::result::Result<MessageReceipt, DeliveryError<MessageReceipt>>;

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl TeamsMessenger {
    fn ensure_connected(&self) -> Result<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(MessengerError::not_connected(PLATFORM))
        }
    }

    /// Pick the per-call webhook, falling back to the default one.
    fn resolve_webhook(&self, webhook_url: Option<&str>) -> Result<String> {
        non_empty(webhook_url)
            .or_else(|| self.default_webhook_url.clone())
            .ok_or_else(|| {
                MessengerError::InvalidArguments(
                    "webhook URL is required - either provide it or set a default webhook URL"
                        .to_string(),
                )
            })
    }

    async fn deliver(&self, webhook_url: Option<&str>, card: MessageCard) -> Delivery {
        self.ensure_connected()?;

        if card.text.trim().is_empty() {
            return Err(MessengerError::InvalidArguments("message text cannot be empty".to_string()).into());
        }
        let webhook_url = self.resolve_webhook(webhook_url)?;
        let (url, _) = parse_webhook_url(&webhook_url)?;

        let mut receipt = MessageReceipt {
            webhook_url,
            title: card.title.clone(),
            text: card.text.clone(),
            color: card.theme_color.clone(),
            success: true,
            error: None,
        };

        match self.post_card(&url, &card).await {
            Ok(()) => {
                log::info!("Teams message sent to {}", redact_url(url.as_str()));
                Ok(receipt)
            }
            Err(e) => {
                receipt.success = false;
                receipt.error = Some(e.to_string());
                Err(DeliveryError::with_receipt(e, receipt))
            }
        }
    }

    /// Send a plain card with optional title and theme color.
    pub async fn send_message(
        &self,
        webhook_url: Option<&str>,
        message: &str,
        title: Option<&str>,
        color: Option<&str>,
    ) -> Delivery {
        let card = MessageCard::new(non_empty(title), message.to_string(), normalize_color(color));
        self.deliver(webhook_url, card).await
    }

    /// Send a card with a "Details" section of key/value facts.
    pub async fn send_rich_message(
        &self,
        webhook_url: Option<&str>,
        title: Option<&str>,
        text: &str,
        color: Option<&str>,
        facts: &BTreeMap<String, String>,
    ) -> Delivery {
        let card = MessageCard::new(non_empty(title), text.to_string(), normalize_color(color))
            .with_facts(facts);
        self.deliver(webhook_url, card).await
    }

    /// Check a webhook URL without sending anything.
    pub fn validate_webhook(&self, webhook_url: &str) -> Result<WebhookCheck> {
        self.ensure_connected()?;

        Ok(match parse_webhook_url(webhook_url) {
            Ok((_, known)) => WebhookCheck {
                valid: true,
                webhook_url: webhook_url.to_string(),
                warning: (!known).then(|| {
                    "host doesn't match known Teams webhook patterns; delivery will still be attempted"
                        .to_string()
                }),
                error: None,
            },
            Err(e) => WebhookCheck {
                valid: false,
                webhook_url: webhook_url.to_string(),
                warning: None,
                error: Some(e.to_string()),
            },
        })
    }
}

/// 去掉前导 `#`
fn normalize_color(color: Option<&str>) -> Option<String> {
    non_empty(color).map(|c| c.trim_start_matches('#').to_string())
}

#[async_trait]
impl Messenger for TeamsMessenger {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    async fn connect(&self, _ct: &CancellationToken) -> Result<()> {
        match &self.default_webhook_url {
            Some(url) => {
                parse_webhook_url(url).map_err(|e| {
                    MessengerError::Configuration(format!("invalid default webhook URL: {e}"))
                })?;
                log::info!("Default webhook URL validated: {}", redact_url(url));
            }
            None => {
                log::warn!(
                    "No default webhook URL provided - webhook URL must be specified for each message"
                );
            }
        }

        self.state.set(ConnectionState::Connected);
        log::info!("Teams messenger connected");
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.set(ConnectionState::Disconnected);
        log::info!("Teams messenger disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn register_operations(self: Arc<Self>, namespace: &mut Namespace) -> Result<()> {
        for operation in self.operations() {
            namespace.register(operation)?;
        }
        Ok(())
    }
}
