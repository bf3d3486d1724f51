//! WhatsApp Messenger trait 实现

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{MessengerError, Result};
use crate::operation::Namespace;
use crate::traits::Messenger;
use crate::types::{Chat, ConnectionState, Contact, Message, MessageFilter, paginate};
use crate::utils::phone::digits_only;

use super::{DeviceIdentity, Jid, PLATFORM, PairingEvent, WhatsAppMessenger};

impl WhatsAppMessenger {
    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(MessengerError::not_connected(PLATFORM))
        }
    }

    /// 配对新设备，等待用户扫码
    async fn pair_new_device(&self, ct: &CancellationToken) -> Result<DeviceIdentity> {
        let mut events = self.session.pair().await?;
        log::info!("No paired device found, waiting for QR code scan");

        loop {
            tokio::select! {
                biased;
                () = ct.cancelled() => return Err(MessengerError::Cancelled),
                event = events.recv() => match event {
                    Some(PairingEvent::Code(code)) => {
                        log::info!("Scan this code with WhatsApp on your phone: {code}");
                    }
                    Some(PairingEvent::Success(identity)) => {
                        self.store.save_device(&identity).await?;
                        log::info!("Paired as {}", identity.jid);
                        return Ok(identity);
                    }
                    Some(PairingEvent::Timeout) => {
                        return Err(MessengerError::transport(
                            PLATFORM,
                            "pairing timed out before a code was scanned",
                        ));
                    }
                    Some(PairingEvent::Error(detail)) => {
                        return Err(MessengerError::transport(
                            PLATFORM,
                            format!("pairing failed: {detail}"),
                        ));
                    }
                    None => {
                        return Err(MessengerError::transport(
                            PLATFORM,
                            "pairing ended without a result",
                        ));
                    }
                },
            }
        }
    }

    /// Refresh the stored contact list. Failures keep the previous snapshot.
    async fn sync_contacts(&self) {
        let contacts = match self.session.fetch_contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                log::warn!("Failed to fetch WhatsApp contacts: {e}");
                return;
            }
        };

        let mut synced = 0usize;
        for contact in &contacts {
            let jid = match Jid::parse(&contact.jid) {
                Ok(jid) => jid,
                Err(e) => {
                    log::debug!("Skipping contact: {e}");
                    continue;
                }
            };
            let name = Some(contact.name.as_str()).filter(|n| *n != jid.user);
            match self.store.upsert_contact(&jid, name).await {
                Ok(()) => synced += 1,
                Err(e) => log::warn!("Failed to store contact {jid}: {e}"),
            }
        }
        log::info!("Synced {synced} WhatsApp contacts");
    }

    async fn establish(&self, ct: &CancellationToken) -> Result<()> {
        match self.store.device().await? {
            Some(device) => {
                log::info!("Resuming paired device {}", device.jid);
                tokio::select! {
                    biased;
                    () = ct.cancelled() => return Err(MessengerError::Cancelled),
                    resumed = self.session.resume(&device) => resumed?,
                }
            }
            None => {
                self.pair_new_device(ct).await?;
            }
        }
        self.sync_contacts().await;
        Ok(())
    }

    // ============ 业务方法 ============

    /// Case-insensitive match on contact name, or on the phone number.
    pub async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>> {
        self.ensure_connected()?;

        let needle = query.trim().to_lowercase();
        let digits = digits_only(query);
        let contacts = self.store.contacts().await?;

        Ok(contacts
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.phone_number.contains(&needle)
                    || (!digits.is_empty() && c.phone_number.contains(&digits))
            })
            .collect())
    }

    /// No local message history is kept, so this only validates the call.
    pub async fn list_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        self.ensure_connected()?;
        log::warn!("WhatsApp message history is not available (filter: {filter:?})");
        Ok(Vec::new())
    }

    pub async fn list_chats(&self, limit: u32, page: u32) -> Result<Vec<Chat>> {
        self.ensure_connected()?;

        let chats = self
            .store
            .contacts()
            .await?
            .into_iter()
            .map(contact_to_chat)
            .collect();
        Ok(paginate(chats, limit, page))
    }

    pub async fn get_chat(&self, chat_jid: &str) -> Result<Chat> {
        self.ensure_connected()?;

        let jid = Jid::parse(chat_jid)?.to_non_device();
        let name = self
            .store
            .contact(&jid)
            .await?
            .map_or_else(|| jid.user.clone(), |c| c.name);

        Ok(Chat {
            jid: jid.to_string(),
            name,
            is_group: jid.is_group(),
            last_message: None,
        })
    }

    pub async fn get_direct_chat_by_contact(&self, phone_number: &str) -> Result<Chat> {
        let digits = digits_only(phone_number);
        if digits.is_empty() {
            self.ensure_connected()?;
            return Err(MessengerError::InvalidIdentifier {
                value: phone_number.to_string(),
                detail: "no digits in phone number".to_string(),
            });
        }
        self.get_chat(&Jid::user(digits).to_string()).await
    }

    /// Only the direct chat is known for a contact.
    pub async fn get_contact_chats(&self, contact_jid: &str) -> Result<Vec<Chat>> {
        Ok(vec![self.get_chat(contact_jid).await?])
    }

    /// Send a text message to a phone number or JID; returns the message ID.
    pub async fn send_message(&self, recipient: &str, message: &str) -> Result<String> {
        self.ensure_connected()?;

        if message.is_empty() {
            return Err(MessengerError::InvalidArguments(
                "message cannot be empty".to_string(),
            ));
        }
        let jid = Jid::resolve(recipient)?;
        let id = self.session.send_text(&jid, message).await?;
        log::info!("Sent WhatsApp message {id} to {jid}");
        Ok(id)
    }
}

fn contact_to_chat(contact: Contact) -> Chat {
    let is_group = contact.jid.ends_with(&format!("@{}", super::jid::GROUP_SERVER));
    Chat {
        jid: contact.jid,
        name: contact.name,
        is_group,
        last_message: None,
    }
}

#[async_trait]
impl Messenger for WhatsAppMessenger {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    async fn connect(&self, ct: &CancellationToken) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        self.state.set(ConnectionState::Connecting);
        match self.establish(ct).await {
            Ok(()) => {
                self.state.set(ConnectionState::Connected);
                log::info!("Connected to WhatsApp");
                Ok(())
            }
            Err(e) => {
                self.state.set(ConnectionState::Disconnected);
                self.session.disconnect().await;
                Err(e)
            }
        }
    }

    async fn disconnect(&self) {
        self.session.disconnect().await;
        self.state.set(ConnectionState::Disconnected);
        log::info!("Disconnected from WhatsApp");
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected() && self.session.is_connected()
    }

    fn register_operations(self: Arc<Self>, namespace: &mut Namespace) -> Result<()> {
        for operation in self.operations() {
            namespace.register(operation)?;
        }
        Ok(())
    }
}
