use std::fmt;
#[cfg(feature = "whatsapp")]
use std::path::PathBuf;
use std::str::FromStr;
#[cfg(feature = "whatsapp")]
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MessengerError;
#[cfg(feature = "whatsapp")]
use crate::messengers::WhatsAppSession;

// ============ Pagination ============

/// Page size used when a caller omits `limit` or passes `0`.
pub const DEFAULT_LIMIT: u32 = 20;

/// Resolve the effective page size. `None` and `Some(0)` both mean [`DEFAULT_LIMIT`].
pub fn effective_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_LIMIT,
        Some(n) => n,
    }
}

/// Slice one zero-based page out of `items`.
///
/// Returns exactly `items[page*limit .. min(page*limit + limit, len)]`. A page that
/// starts past the end yields an empty vector.
pub fn paginate<T>(items: Vec<T>, limit: u32, page: u32) -> Vec<T> {
    let limit = limit as usize;
    let start = (page as usize).saturating_mul(limit);
    if start >= items.len() {
        return Vec::new();
    }
    items.into_iter().skip(start).take(limit).collect()
}

// ============ Entities ============

/// A person reachable on the chat network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub jid: String,
    pub phone_number: String,
    pub name: String,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_jid: String,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A conversation, either direct or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub jid: String,
    pub name: String,
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
}

/// Criteria for message queries.
///
/// `limit` is always the effective page size (never zero) and `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub sender_jid: Option<String>,
    pub chat_jid: Option<String>,
    pub query: Option<String>,
    pub limit: u32,
    pub page: u32,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            sender_jid: None,
            chat_jid: None,
            query: None,
            limit: DEFAULT_LIMIT,
            page: 0,
        }
    }
}

// ============ Messenger selection ============

/// Supported messaging backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessengerType {
    Whatsapp,
    Teams,
    Twitter,
}

impl MessengerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Teams => "teams",
            Self::Twitter => "twitter",
        }
    }
}

impl fmt::Display for MessengerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessengerType {
    type Err = MessengerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whatsapp" => Ok(Self::Whatsapp),
            "teams" => Ok(Self::Teams),
            "twitter" | "x" => Ok(Self::Twitter),
            other => Err(MessengerError::Configuration(format!(
                "unsupported messenger type: {other} (expected whatsapp, teams or twitter)"
            ))),
        }
    }
}

/// Startup configuration for one backend.
///
/// Built once from the command line and never re-read.
#[derive(Clone)]
pub enum MessengerConfig {
    /// WhatsApp, persisted in a local device store.
    #[cfg(feature = "whatsapp")]
    Whatsapp {
        /// Path of the `SQLite` device/contact store (created if missing).
        device_path: PathBuf,
        /// Client for the WhatsApp multi-device protocol; `None` uses
        /// the built-in `whatsapp-rust` client on the same store.
        session: Option<Arc<dyn WhatsAppSession>>,
    },
    /// Microsoft Teams incoming webhooks.
    #[cfg(feature = "teams")]
    Teams {
        /// Webhook used when an invocation does not name one.
        default_webhook_url: Option<String>,
    },
    /// Twitter/X v2 API with OAuth 1.0a user context.
    #[cfg(feature = "twitter")]
    Twitter {
        api_key: String,
        api_secret: String,
        access_token: String,
        access_token_secret: String,
    },
}

impl MessengerConfig {
    pub fn messenger_type(&self) -> MessengerType {
        match self {
            #[cfg(feature = "whatsapp")]
            Self::Whatsapp { .. } => MessengerType::Whatsapp,
            #[cfg(feature = "teams")]
            Self::Teams { .. } => MessengerType::Teams,
            #[cfg(feature = "twitter")]
            Self::Twitter { .. } => MessengerType::Twitter,
        }
    }
}

impl fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "whatsapp")]
            Self::Whatsapp {
                device_path,
                session,
            } => f
                .debug_struct("Whatsapp")
                .field("device_path", device_path)
                .field("session", &session.is_some())
                .finish(),
            #[cfg(feature = "teams")]
            Self::Teams {
                default_webhook_url,
            } => f
                .debug_struct("Teams")
                .field("default_webhook_url", &default_webhook_url.is_some())
                .finish(),
            #[cfg(feature = "twitter")]
            Self::Twitter { .. } => f
                .debug_struct("Twitter")
                .field("credentials", &"<redacted>")
                .finish(),
        }
    }
}

// ============ Connection state ============

/// Lifecycle of the single backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Lock-free holder for a [`ConnectionState`], shared by handlers and lifecycle calls.
#[derive(Debug)]
pub struct ConnectionCell(AtomicU8);

impl ConnectionCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::Acquire) {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn set(&self, state: ConnectionState) {
        let raw = match state {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        };
        self.0.store(raw, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }
}

impl Default for ConnectionCell {
    fn default() -> Self {
        Self::new()
    }
}
