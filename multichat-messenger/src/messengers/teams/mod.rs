//! Microsoft Teams Messenger (incoming webhooks)

mod http;
mod messenger;
mod tools;
mod types;
mod webhook;

use reqwest::Client;

use crate::error::Result;
use crate::http_client::create_http_client;
use crate::types::ConnectionCell;

pub use types::{CardFact, CardSection, MessageCard, MessageReceipt, WebhookCheck};

pub(crate) const PLATFORM: &str = "Teams";

/// Microsoft Teams Messenger
///
/// Sends MessageCards to Power Automate workflow or O365 connector webhooks.
/// Webhooks are write-only, so there are no contacts or chats to browse.
pub struct TeamsMessenger {
    pub(crate) client: Client,
    pub(crate) default_webhook_url: Option<String>,
    pub(crate) state: ConnectionCell,
}

impl TeamsMessenger {
    pub fn new(default_webhook_url: Option<String>) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            default_webhook_url: default_webhook_url.filter(|u| !u.trim().is_empty()),
            state: ConnectionCell::new(),
        })
    }
}
