//! WhatsApp session seam.
//!
//! The multi-device protocol client is an external collaborator. The messenger
//! only needs the handful of primitives below, so any client that can pair a
//! device, resume it, and send text can back it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::Contact;

use super::Jid;

/// A paired device, as persisted in the device store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// The account JID including the device suffix.
    pub jid: Jid,
    /// Display name announced by the account, if any.
    pub push_name: Option<String>,
    /// Opaque key material owned by the session client.
    pub credentials: String,
}

/// Progress of an interactive device pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A new code to show the user (rendered as a QR code by the client).
    Code(String),
    /// Pairing finished; persist this identity.
    Success(DeviceIdentity),
    /// The user did not scan any code in time.
    Timeout,
    /// The client gave up.
    Error(String),
}

/// 多设备协议客户端
#[async_trait]
pub trait WhatsAppSession: Send + Sync {
    /// Start pairing a new device. Events arrive on the returned channel.
    async fn pair(&self) -> Result<mpsc::Receiver<PairingEvent>>;

    /// Reconnect as an already paired device.
    async fn resume(&self, device: &DeviceIdentity) -> Result<()>;

    /// Contacts known to the account after (re)connecting.
    async fn fetch_contacts(&self) -> Result<Vec<Contact>>;

    /// Send a text message and return its server-assigned ID.
    async fn send_text(&self, to: &Jid, text: &str) -> Result<String>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self);
}
