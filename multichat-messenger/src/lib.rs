//! # multichat-messenger
//!
//! Messaging backends behind one operation-dispatch abstraction. A process
//! picks one backend at startup, connects it, collects its tools into a
//! [`Namespace`], and serves them to a tool-calling client.
//!
//! ## Supported Messengers
//!
//! | Messenger | Feature Flag | Transport |
//! |-----------|-------------|-----------|
//! | WhatsApp | `whatsapp` | `whatsapp-rust` multi-device client ([`WebSession`]) + SQLite device store |
//! | Microsoft Teams | `teams` | Incoming webhooks (MessageCard) |
//! | Twitter/X | `twitter` | API v2, OAuth 1.0a user context |
//!
//! ## Feature Flags
//!
//! - **`all-messengers`** *(default)*: enable every backend above.
//! - **`whatsapp`**, **`teams`**, **`twitter`**: enable one backend.
//! - **`native-tls`** *(default)* / **`rustls`**: TLS backend for HTTP clients.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use multichat_messenger::{create_messenger, MessengerConfig, Namespace};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> multichat_messenger::Result<()> {
//! let messenger = create_messenger(MessengerConfig::Teams {
//!     default_webhook_url: Some("https://contoso.webhook.office.com/webhookb2/...".into()),
//! })
//! .await?;
//! messenger.connect(&CancellationToken::new()).await?;
//!
//! let mut namespace = Namespace::new();
//! std::sync::Arc::clone(&messenger).register_operations(&mut namespace)?;
//!
//! let args = serde_json::json!({"message": "Build finished"});
//! let output = namespace
//!     .dispatch("send_message", args.as_object().cloned().unwrap_or_default(), &CancellationToken::new())
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Backend methods return [`Result<T, MessengerError>`](MessengerError). Tool
//! handlers never raise: every failure becomes a [`ToolOutput`] with
//! `is_error = true` and an [`ErrorKind`] tag, so one bad call never takes the
//! server down.

mod error;
mod factory;
mod http_client;
mod messengers;
mod operation;
mod traits;
mod types;
mod utils;

pub use error::{DeliveryError, ErrorKind, MessengerError, Result};

pub use factory::create_messenger;

pub use operation::{JsonObject, Namespace, Operation, ToolOutput, decode_args, input_schema_for};

pub use traits::Messenger;

pub use types::{
    Chat, ConnectionState, Contact, DEFAULT_LIMIT, Message, MessageFilter, MessengerConfig,
    MessengerType, effective_limit, paginate,
};

pub use utils::datetime;

#[cfg(feature = "teams")]
pub use messengers::{
    CardFact, CardSection, MessageCard, MessageReceipt, TeamsMessenger, WebhookCheck,
};

#[cfg(feature = "twitter")]
pub use messengers::{MAX_TWEET_CHARS, TweetDeletion, TweetReceipt, TwitterMessenger};

#[cfg(feature = "whatsapp")]
pub use messengers::{
    DeviceIdentity, DeviceStore, Jid, KeyStore, PairingEvent, WebSession, WhatsAppMessenger,
    WhatsAppSession,
};
