//! Messenger factory.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::Messenger;
use crate::types::MessengerConfig;

#[cfg(feature = "teams")]
use crate::messengers::TeamsMessenger;
#[cfg(feature = "twitter")]
use crate::messengers::TwitterMessenger;
#[cfg(feature = "whatsapp")]
use crate::messengers::{DeviceStore, WebSession, WhatsAppMessenger, WhatsAppSession};

/// Creates a [`Messenger`] instance from startup configuration.
///
/// The concrete backend is determined by the [`MessengerConfig`] variant.
/// The returned messenger is wrapped in `Arc<dyn Messenger>` so the server
/// and its handlers can share it.
///
/// # Examples
///
/// ```rust,no_run
/// use multichat_messenger::{create_messenger, MessengerConfig};
///
/// # async fn run() -> multichat_messenger::Result<()> {
/// let messenger = create_messenger(MessengerConfig::Teams {
///     default_webhook_url: None,
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_messenger(config: MessengerConfig) -> Result<Arc<dyn Messenger>> {
    log::info!("Creating {} messenger", config.messenger_type());
    match config {
        #[cfg(feature = "whatsapp")]
        MessengerConfig::Whatsapp {
            device_path,
            session,
        } => {
            let store = DeviceStore::open(&device_path).await?;
            let session: Arc<dyn WhatsAppSession> = match session {
                Some(session) => session,
                None => Arc::new(WebSession::new(store.keys())),
            };
            Ok(Arc::new(WhatsAppMessenger::new(store, session)))
        }
        #[cfg(feature = "teams")]
        MessengerConfig::Teams {
            default_webhook_url,
        } => Ok(Arc::new(TeamsMessenger::new(default_webhook_url)?)),
        #[cfg(feature = "twitter")]
        MessengerConfig::Twitter {
            api_key,
            api_secret,
            access_token,
            access_token_secret,
        } => Ok(Arc::new(TwitterMessenger::new(
            api_key,
            api_secret,
            access_token,
            access_token_secret,
        )?)),
    }
}
