//! [`WhatsAppSession`] on top of the `whatsapp-rust` multi-device client.
//!
//! The client runs as a background task fed by its event callback. Pairing
//! codes are forwarded to the messenger as [`PairingEvent`]s; the connection
//! state is published on a watch channel so `resume` can wait for it.
//!
//! Contacts come from two places: the LID/phone mappings the client has
//! learned (persisted in the [`KeyStore`]) and senders of messages received
//! while the session is up.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use wacore::store::traits::{DeviceStore as _, ProtocolStore as _};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

use crate::error::{MessengerError, Result};
use crate::types::Contact;
use crate::utils::phone::digits_only;

use super::jid::DEFAULT_USER_SERVER;
use super::{DeviceIdentity, Jid, KeyStore, PLATFORM, PairingEvent, WhatsAppSession};

/// 扫码等待上限
const PAIRING_TIMEOUT: Duration = Duration::from_secs(180);
const RESUME_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Link {
    Idle,
    Connected,
    Failed(String),
}

fn storage_error(e: impl Display) -> MessengerError {
    MessengerError::Storage(e.to_string())
}

/// State shared with the client's event callback.
struct Shared {
    keys: Arc<KeyStore>,
    client: Mutex<Option<Arc<Client>>>,
    link: watch::Sender<Link>,
    pairing: Mutex<Option<mpsc::Sender<PairingEvent>>>,
    paired_jid: Mutex<Option<String>>,
    seen: Mutex<BTreeMap<String, Contact>>,
}

impl Shared {
    async fn on_event(&self, event: Event, client: Arc<Client>) {
        match event {
            Event::PairingQrCode { code, .. } => {
                let pairing = self.pairing.lock().await.clone();
                match pairing {
                    Some(tx) => {
                        let _ = tx.send(PairingEvent::Code(code)).await;
                    }
                    // 已配对设备被要求重新扫码
                    None => {
                        self.fail("device is no longer paired; remove the device store and pair again")
                            .await;
                    }
                }
            }
            Event::PairSuccess(success) => {
                *self.paired_jid.lock().await = Some(success.id.to_string());
            }
            Event::Connected(_) => {
                *self.client.lock().await = Some(client);
                self.link.send_replace(Link::Connected);
                if let Some(tx) = self.pairing.lock().await.take() {
                    let event = match self.identity().await {
                        Ok(identity) => PairingEvent::Success(identity),
                        Err(e) => PairingEvent::Error(e.to_string()),
                    };
                    let _ = tx.send(event).await;
                }
            }
            Event::Message(_, info) => {
                if !info.source.is_from_me {
                    self.remember(&info.source.sender.to_string()).await;
                }
            }
            Event::LoggedOut(_) => {
                log::warn!("WhatsApp device was logged out");
                self.fail("device was logged out").await;
            }
            Event::Disconnected(_) => {
                log::warn!("WhatsApp connection dropped");
                self.link.send_replace(Link::Idle);
            }
            other => log::debug!("Unhandled WhatsApp event: {other:?}"),
        }
    }

    /// Stop waiting on the link and end any pairing in progress.
    async fn fail(&self, detail: impl Into<String>) {
        let detail = detail.into();
        self.client.lock().await.take();
        self.link.send_replace(Link::Failed(detail.clone()));
        if let Some(tx) = self.pairing.lock().await.take() {
            let _ = tx.send(PairingEvent::Error(detail)).await;
        }
    }

    /// Identity of the freshly paired device; the credentials carry the
    /// client's device record so a lost key store can be restored.
    async fn identity(&self) -> Result<DeviceIdentity> {
        let raw = self.paired_jid.lock().await.clone().ok_or_else(|| {
            MessengerError::transport(PLATFORM, "pairing finished without an account JID")
        })?;
        let jid = Jid::parse(&raw)?;
        let credentials = self
            .keys
            .device_blob()
            .await
            .map_err(storage_error)?
            .map(|blob| STANDARD.encode(blob))
            .unwrap_or_default();

        Ok(DeviceIdentity {
            jid,
            push_name: None,
            credentials,
        })
    }

    /// Record a message sender as a contact. Hidden-ID senders carry no phone number.
    async fn remember(&self, sender: &str) {
        let jid = match Jid::parse(sender) {
            Ok(jid) if jid.server == DEFAULT_USER_SERVER => jid.to_non_device(),
            Ok(_) => return,
            Err(e) => {
                log::debug!("Ignoring sender: {e}");
                return;
            }
        };
        let key = jid.to_string();
        self.seen
            .lock()
            .await
            .entry(key.clone())
            .or_insert_with(|| Contact {
                jid: key,
                phone_number: jid.user.clone(),
                name: jid.user.clone(),
            });
    }
}

/// `whatsapp-rust` backed session.
pub struct WebSession {
    shared: Arc<Shared>,
    stop: Mutex<Option<CancellationToken>>,
}

impl WebSession {
    pub fn new(keys: KeyStore) -> Self {
        let (link, _) = watch::channel(Link::Idle);
        Self {
            shared: Arc::new(Shared {
                keys: Arc::new(keys),
                client: Mutex::new(None),
                link,
                pairing: Mutex::new(None),
                paired_jid: Mutex::new(None),
                seen: Mutex::new(BTreeMap::new()),
            }),
            stop: Mutex::new(None),
        }
    }

    /// Build and run a fresh client, replacing any previous one.
    async fn start(&self) -> Result<CancellationToken> {
        let mut stop_slot = self.stop.lock().await;
        if let Some(previous) = stop_slot.take() {
            previous.cancel();
        }
        self.shared.link.send_replace(Link::Idle);

        let shared = Arc::clone(&self.shared);
        let mut bot = Bot::builder()
            .with_backend(Arc::clone(&self.shared.keys))
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, client| {
                let shared = Arc::clone(&shared);
                async move { shared.on_event(event, client).await }
            })
            .build()
            .await
            .map_err(|e| {
                MessengerError::transport(PLATFORM, format!("failed to create client: {e}"))
            })?;

        let stop = CancellationToken::new();
        let task_stop = stop.clone();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let handle = match bot.run().await {
                Ok(handle) => handle,
                Err(e) => {
                    shared.fail(format!("client failed to start: {e}")).await;
                    return;
                }
            };
            let abort = handle.abort_handle();
            tokio::select! {
                () = task_stop.cancelled() => abort.abort(),
                _ = handle => shared.fail("client stopped").await,
            }
        });

        *stop_slot = Some(stop.clone());
        Ok(stop)
    }
}

#[async_trait]
impl WhatsAppSession for WebSession {
    async fn pair(&self) -> Result<mpsc::Receiver<PairingEvent>> {
        let (tx, rx) = mpsc::channel(8);
        *self.shared.paired_jid.lock().await = None;
        *self.shared.pairing.lock().await = Some(tx);

        let stop = match self.start().await {
            Ok(stop) => stop,
            Err(e) => {
                self.shared.pairing.lock().await.take();
                return Err(e);
            }
        };

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                () = stop.cancelled() => {}
                () = tokio::time::sleep(PAIRING_TIMEOUT) => {
                    if let Some(tx) = shared.pairing.lock().await.take() {
                        let _ = tx.send(PairingEvent::Timeout).await;
                    }
                }
            }
        });
        Ok(rx)
    }

    async fn resume(&self, device: &DeviceIdentity) -> Result<()> {
        let keys = &self.shared.keys;
        if !device.credentials.is_empty() && !keys.exists().await.map_err(storage_error)? {
            let blob = STANDARD.decode(&device.credentials).map_err(|e| {
                MessengerError::Storage(format!("invalid device credentials: {e}"))
            })?;
            keys.restore_device_blob(blob).await.map_err(storage_error)?;
            log::info!("Restored WhatsApp device record for {}", device.jid);
        }

        let mut link = self.shared.link.subscribe();
        self.start().await?;

        let waited = tokio::time::timeout(RESUME_TIMEOUT, async {
            link.wait_for(|state| *state != Link::Idle)
                .await
                .map(|state| state.clone())
        })
        .await;

        match waited {
            Ok(Ok(Link::Connected)) => Ok(()),
            Ok(Ok(Link::Failed(detail))) => Err(MessengerError::transport(PLATFORM, detail)),
            Ok(Ok(Link::Idle) | Err(_)) => {
                Err(MessengerError::transport(PLATFORM, "client stopped"))
            }
            Err(_) => Err(MessengerError::transport(
                PLATFORM,
                "timed out waiting for the connection",
            )),
        }
    }

    async fn fetch_contacts(&self) -> Result<Vec<Contact>> {
        let mut contacts = self.shared.seen.lock().await.clone();

        let mappings = self
            .shared
            .keys
            .get_all_lid_mappings()
            .await
            .map_err(storage_error)?;
        for mapping in mappings {
            let digits = digits_only(&mapping.phone_number);
            if digits.is_empty() {
                continue;
            }
            let jid = Jid::user(digits.clone()).to_string();
            contacts.entry(jid.clone()).or_insert_with(|| Contact {
                jid,
                phone_number: digits.clone(),
                name: digits,
            });
        }

        Ok(contacts.into_values().collect())
    }

    async fn send_text(&self, to: &Jid, text: &str) -> Result<String> {
        let client = self
            .shared
            .client
            .lock()
            .await
            .clone()
            .filter(|_| self.is_connected())
            .ok_or_else(|| MessengerError::not_connected(PLATFORM))?;

        let jid: wacore_binary::jid::Jid =
            to.to_string()
                .parse()
                .map_err(|e| MessengerError::InvalidIdentifier {
                    value: to.to_string(),
                    detail: format!("{e}"),
                })?;
        let message = waproto::whatsapp::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };

        client
            .send_message(jid, message)
            .await
            .map_err(|e| MessengerError::transport(PLATFORM, format!("send failed: {e}")))
    }

    fn is_connected(&self) -> bool {
        *self.shared.link.borrow() == Link::Connected
    }

    async fn disconnect(&self) {
        if let Some(stop) = self.stop.lock().await.take() {
            stop.cancel();
        }
        self.shared.client.lock().await.take();
        self.shared.pairing.lock().await.take();
        self.shared.link.send_replace(Link::Idle);
    }
}
