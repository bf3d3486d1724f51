//! Twitter/X Messenger (API v2, OAuth 1.0a user context)

mod http;
mod messenger;
mod sign;
mod tools;
mod types;

use reqwest::Client;

use crate::error::{MessengerError, Result};
use crate::http_client::create_http_client;
use crate::types::ConnectionCell;

use sign::OAuthCredentials;

pub use types::{TweetDeletion, TweetReceipt};

pub(crate) const PLATFORM: &str = "Twitter/X";
pub(crate) const TWITTER_API_BASE: &str = "https://api.twitter.com";
/// 推文最大长度（Unicode 字符数）
pub const MAX_TWEET_CHARS: usize = 280;

/// Twitter/X Messenger
pub struct TwitterMessenger {
    pub(crate) client: Client,
    pub(crate) credentials: OAuthCredentials,
    pub(crate) base_url: String,
    pub(crate) state: ConnectionCell,
}

impl TwitterMessenger {
    /// All four credentials are required; empty values are a configuration error.
    pub fn new(
        api_key: String,
        api_secret: String,
        access_token: String,
        access_token_secret: String,
    ) -> Result<Self> {
        if [&api_key, &api_secret, &access_token, &access_token_secret]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err(MessengerError::Configuration(
                "all Twitter API credentials are required".to_string(),
            ));
        }

        Ok(Self {
            client: create_http_client()?,
            credentials: OAuthCredentials {
                consumer_key: api_key,
                consumer_secret: api_secret,
                token: access_token,
                token_secret: access_token_secret,
            },
            base_url: TWITTER_API_BASE.to_string(),
            state: ConnectionCell::new(),
        })
    }

    /// Point the client at another API host (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}
