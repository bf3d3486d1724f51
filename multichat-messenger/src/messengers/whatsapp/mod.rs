//! WhatsApp Messenger

mod jid;
mod messenger;
mod session;
mod store;
mod tools;
mod web;

use std::sync::Arc;

use crate::types::ConnectionCell;

pub use jid::Jid;
pub use session::{DeviceIdentity, PairingEvent, WhatsAppSession};
pub use store::{DeviceStore, KeyStore};
pub use web::WebSession;

pub(crate) const PLATFORM: &str = "WhatsApp";

/// WhatsApp Messenger
pub struct WhatsAppMessenger {
    pub(crate) store: DeviceStore,
    pub(crate) session: Arc<dyn WhatsAppSession>,
    pub(crate) state: ConnectionCell,
}

impl WhatsAppMessenger {
    pub fn new(store: DeviceStore, session: Arc<dyn WhatsAppSession>) -> Self {
        Self {
            store,
            session,
            state: ConnectionCell::new(),
        }
    }
}
