//! Messenger implementations

#[cfg(feature = "teams")]
mod teams;
#[cfg(feature = "twitter")]
mod twitter;
#[cfg(feature = "whatsapp")]
mod whatsapp;

#[cfg(feature = "teams")]
pub use teams::{CardFact, CardSection, MessageCard, MessageReceipt, TeamsMessenger, WebhookCheck};
#[cfg(feature = "twitter")]
pub use twitter::{MAX_TWEET_CHARS, TweetDeletion, TweetReceipt, TwitterMessenger};
#[cfg(feature = "whatsapp")]
pub use whatsapp::{
    DeviceIdentity, DeviceStore, Jid, KeyStore, PairingEvent, WebSession, WhatsAppMessenger,
    WhatsAppSession,
};
