//! Teams 数据类型

use std::collections::BTreeMap;

use serde::Serialize;

/// Legacy actionable MessageCard payload, accepted by both workflow and
/// connector webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    /// Connectors reject cards without a summary when `text` is markdown-only.
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(rename = "themeColor", skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<CardSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSection {
    #[serde(rename = "activityTitle")]
    pub title: String,
    pub facts: Vec<CardFact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

impl MessageCard {
    pub fn new(title: Option<String>, text: String, theme_color: Option<String>) -> Self {
        let summary = title.clone().unwrap_or_else(|| text.clone());
        Self {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            summary,
            title,
            text,
            theme_color,
            sections: Vec::new(),
        }
    }

    /// Attach facts as a "Details" section. Empty maps add nothing.
    #[must_use]
    pub fn with_facts(mut self, facts: &BTreeMap<String, String>) -> Self {
        if !facts.is_empty() {
            self.sections.push(CardSection {
                title: "Details".to_string(),
                facts: facts
                    .iter()
                    .map(|(name, value)| CardFact {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            });
        }
        self
    }
}

/// Outcome of one webhook delivery, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageReceipt {
    pub webhook_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `validate_webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookCheck {
    pub valid: bool,
    pub webhook_url: String,
    /// Set when the URL parses but its host is not a known Teams endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
