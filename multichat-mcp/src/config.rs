//! Command-line configuration.
//!
//! Parsed once at startup and turned into a [`MessengerConfig`]; nothing here is
//! re-read while serving.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use multichat_messenger::{MessengerConfig, MessengerType};

/// MultiChat - A Model Context Protocol server for multiple messaging platforms
#[derive(Parser, Debug)]
#[command(name = "multichat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Messenger type (whatsapp, teams, twitter)
    #[arg(long, env = "MULTICHAT_MESSENGER", default_value = "whatsapp")]
    pub messenger: MessengerType,

    /// Device database file path (for WhatsApp)
    #[arg(long, env = "MULTICHAT_DEVICE", default_value = "device.db")]
    pub device: PathBuf,

    /// Default webhook URL (for Teams)
    #[arg(long, env = "MULTICHAT_WEBHOOK")]
    pub webhook: Option<String>,

    /// Twitter API Key (for Twitter/X)
    #[arg(long, env = "TWITTER_API_KEY", hide_env_values = true)]
    pub twitter_api_key: Option<String>,

    /// Twitter API Secret Key (for Twitter/X)
    #[arg(long, env = "TWITTER_API_SECRET", hide_env_values = true)]
    pub twitter_api_secret: Option<String>,

    /// Twitter Access Token (for Twitter/X)
    #[arg(long, env = "TWITTER_ACCESS_TOKEN", hide_env_values = true)]
    pub twitter_token: Option<String>,

    /// Twitter Access Token Secret (for Twitter/X)
    #[arg(long, env = "TWITTER_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub twitter_token_secret: Option<String>,

    /// Log level; `RUST_LOG` overrides it when set
    #[arg(long, value_enum, env = "MULTICHAT_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Cli {
    /// Backend configuration for the selected messenger.
    ///
    /// Missing Twitter credentials are passed through as empty strings; the
    /// messenger constructor rejects them.
    pub fn messenger_config(&self) -> MessengerConfig {
        match self.messenger {
            // None: factory 在同一个 device store 上创建 whatsapp-rust 客户端
            MessengerType::Whatsapp => MessengerConfig::Whatsapp {
                device_path: self.device.clone(),
                session: None,
            },
            MessengerType::Teams => MessengerConfig::Teams {
                default_webhook_url: self.webhook.clone().filter(|url| !url.trim().is_empty()),
            },
            MessengerType::Twitter => MessengerConfig::Twitter {
                api_key: self.twitter_api_key.clone().unwrap_or_default(),
                api_secret: self.twitter_api_secret.clone().unwrap_or_default(),
                access_token: self.twitter_token.clone().unwrap_or_default(),
                access_token_secret: self.twitter_token_secret.clone().unwrap_or_default(),
            },
        }
    }
}
