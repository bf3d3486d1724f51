//! Teams 工具定义

use std::collections::BTreeMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::operation::{Operation, ToolOutput};

use super::TeamsMessenger;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    /// Teams webhook URL (Power Automate workflow URL or O365 connector URL). If not provided, uses the default webhook URL set at initialization.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// The message text to send
    pub message: String,
    /// Optional title for the message card
    #[serde(default)]
    pub title: Option<String>,
    /// Optional theme color in hex format (e.g., '0078D4' for blue, 'FF0000' for red)
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendRichMessageParams {
    /// Teams webhook URL. If not provided, uses the default webhook URL.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Title of the message card
    #[serde(default)]
    pub title: Option<String>,
    /// Main text content of the message
    pub text: String,
    /// Theme color in hex format (e.g., '0078D4', 'FF0000', '00FF00')
    #[serde(default)]
    pub color: Option<String>,
    /// Key-value pairs to display as facts (e.g., {'Status': 'Active', 'Priority': 'High'})
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateWebhookParams {
    /// Teams webhook URL to validate
    pub webhook_url: String,
}

impl TeamsMessenger {
    pub(crate) fn operations(self: &Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::with_target(
                self,
                "send_message",
                "Send a simple message to a Microsoft Teams channel or chat via webhook URL",
                |teams, p: SendMessageParams| async move {
                    let result = teams
                        .send_message(
                            p.webhook_url.as_deref(),
                            &p.message,
                            p.title.as_deref(),
                            p.color.as_deref(),
                        )
                        .await;
                    ToolOutput::from_delivery("failed to send message", result)
                },
            ),
            Operation::with_target(
                self,
                "send_rich_message",
                "Send a rich adaptive card message with title, text, color, and structured facts to Teams",
                |teams, p: SendRichMessageParams| async move {
                    let result = teams
                        .send_rich_message(
                            p.webhook_url.as_deref(),
                            p.title.as_deref(),
                            &p.text,
                            p.color.as_deref(),
                            &p.facts,
                        )
                        .await;
                    ToolOutput::from_delivery("failed to send rich message", result)
                },
            ),
            Operation::with_target(
                self,
                "validate_webhook",
                "Validate a Teams webhook URL to ensure it's properly formatted",
                |teams, p: ValidateWebhookParams| async move {
                    ToolOutput::from_result(
                        "failed to validate webhook",
                        teams.validate_webhook(&p.webhook_url),
                    )
                },
            ),
        ]
    }
}
