//! WhatsApp 工具定义

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::Result;
use crate::operation::{Operation, ToolOutput};
use crate::types::{MessageFilter, effective_limit};
use crate::utils::datetime::parse_optional_rfc3339;

use super::WhatsAppMessenger;

const HISTORY_NOTE: &str = "Message history is not available on WhatsApp; only new activity is visible to this server.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchContactsParams {
    /// Search term to match against contact names or phone numbers
    pub query: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListMessagesParams {
    /// ISO-8601 formatted date to only return messages after this date
    #[serde(default)]
    pub after: Option<String>,
    /// ISO-8601 formatted date to only return messages before this date
    #[serde(default)]
    pub before: Option<String>,
    /// Filter messages by sender JID
    #[serde(default)]
    pub sender_jid: Option<String>,
    /// Filter messages by chat JID
    #[serde(default)]
    pub chat_jid: Option<String>,
    /// Search term to filter messages by content
    #[serde(default)]
    pub query: Option<String>,
    /// Maximum number of messages to return
    #[serde(default)]
    #[schemars(extend("default" = 20))]
    pub limit: Option<u32>,
    /// Page number for pagination
    #[serde(default)]
    #[schemars(extend("default" = 0))]
    pub page: Option<u32>,
}

impl ListMessagesParams {
    fn into_filter(self) -> Result<MessageFilter> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(MessageFilter {
            after: parse_optional_rfc3339("after", self.after.as_deref())?,
            before: parse_optional_rfc3339("before", self.before.as_deref())?,
            sender_jid: non_empty(self.sender_jid),
            chat_jid: non_empty(self.chat_jid),
            query: non_empty(self.query),
            limit: effective_limit(self.limit),
            page: self.page.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListChatsParams {
    /// Maximum number of chats to return
    #[serde(default)]
    #[schemars(extend("default" = 20))]
    pub limit: Option<u32>,
    /// Page number for pagination
    #[serde(default)]
    #[schemars(extend("default" = 0))]
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetChatParams {
    /// The JID of the chat to retrieve
    pub chat_jid: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetDirectChatParams {
    /// Phone number of the contact (with country code, no + or spaces)
    pub phone_number: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetContactChatsParams {
    /// The JID of the contact
    pub contact_jid: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    /// Phone number (with country code) or JID of the recipient
    pub recipient: String,
    /// The message text to send
    pub message: String,
}

impl WhatsAppMessenger {
    pub(crate) fn operations(self: &Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::with_target(
                self,
                "search_contacts",
                "Search for contacts by name or phone number",
                |wa, p: SearchContactsParams| async move {
                    ToolOutput::from_result("search failed", wa.search_contacts(&p.query).await)
                },
            ),
            Operation::with_target(
                self,
                "list_messages",
                "Retrieve messages with optional filters (e.g. time, sender) and context",
                |wa, p: ListMessagesParams| async move {
                    let filter = match p.into_filter() {
                        Ok(filter) => filter,
                        Err(e) => return ToolOutput::error(&e),
                    };
                    match wa.list_messages(&filter).await {
                        Ok(messages) => ToolOutput::json(&messages).with_note(HISTORY_NOTE),
                        Err(e) => ToolOutput::failed("list messages failed", &e),
                    }
                },
            ),
            Operation::with_target(
                self,
                "list_chats",
                "List available chats with metadata (name, JID, last message)",
                |wa, p: ListChatsParams| async move {
                    let limit = effective_limit(p.limit);
                    let page = p.page.unwrap_or(0);
                    ToolOutput::from_result("list chats failed", wa.list_chats(limit, page).await)
                },
            ),
            Operation::with_target(
                self,
                "get_chat",
                "Get information about a specific chat (metadata, messages)",
                |wa, p: GetChatParams| async move {
                    ToolOutput::from_result("get chat failed", wa.get_chat(&p.chat_jid).await)
                },
            ),
            Operation::with_target(
                self,
                "get_direct_chat_by_contact",
                "Find a direct chat with a specific contact by phone number",
                |wa, p: GetDirectChatParams| async move {
                    ToolOutput::from_result(
                        "get direct chat failed",
                        wa.get_direct_chat_by_contact(&p.phone_number).await,
                    )
                },
            ),
            Operation::with_target(
                self,
                "get_contact_chats",
                "List all chats involving a specific contact",
                |wa, p: GetContactChatsParams| async move {
                    ToolOutput::from_result(
                        "get contact chats failed",
                        wa.get_contact_chats(&p.contact_jid).await,
                    )
                },
            ),
            Operation::with_target(
                self,
                "send_message",
                "Send a WhatsApp message to a specified phone number or group JID",
                |wa, p: SendMessageParams| async move {
                    match wa.send_message(&p.recipient, &p.message).await {
                        Ok(_) => ToolOutput::text("Message sent successfully"),
                        Err(e) => ToolOutput::failed("send message failed", &e),
                    }
                },
            ),
        ]
    }
}
