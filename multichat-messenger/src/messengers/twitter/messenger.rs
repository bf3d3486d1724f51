//! Twitter Messenger trait 实现

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::error::{DeliveryError, MessengerError, Result};
use crate::operation::Namespace;
use crate::traits::Messenger;
use crate::types::ConnectionState;

use super::types::{CreateTweetRequest, CreatedTweet, DeletedTweet, TweetReply};
use super::{MAX_TWEET_CHARS, PLATFORM, TweetDeletion, TweetReceipt, TwitterMessenger};

/// Reject empty or over-long tweet text before any network call.
pub(crate) fn check_tweet_text(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(MessengerError::InvalidArguments(
            "tweet text cannot be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_TWEET_CHARS {
        return Err(MessengerError::InvalidArguments(format!(
            "tweet text exceeds {MAX_TWEET_CHARS} characters"
        )));
    }
    Ok(())
}

impl TwitterMessenger {
    fn ensure_connected(&self) -> Result<()> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(MessengerError::not_connected(PLATFORM))
        }
    }

    /// Post a tweet, optionally as a reply.
    pub async fn post_tweet(
        &self,
        text: &str,
        reply_to_tweet_id: Option<&str>,
    ) -> std::result::Result<TweetReceipt, DeliveryError<TweetReceipt>> {
        self.ensure_connected()?;
        check_tweet_text(text)?;

        let reply_to = reply_to_tweet_id.map(str::trim).filter(|id| !id.is_empty());
        let body = CreateTweetRequest {
            text,
            reply: reply_to.map(|id| TweetReply {
                in_reply_to_tweet_id: id,
            }),
        };

        match self
            .request::<_, CreatedTweet>(Method::POST, "/2/tweets", Some(&body))
            .await
        {
            Ok(tweet) => {
                log::info!("Tweet posted successfully: {}", tweet.id);
                Ok(TweetReceipt {
                    tweet_id: tweet.id,
                    text: tweet.text,
                    success: true,
                    error: None,
                })
            }
            Err(e) => {
                log::error!("Failed to post tweet: {e}");
                let receipt = TweetReceipt {
                    tweet_id: String::new(),
                    text: text.to_string(),
                    success: false,
                    error: Some(e.to_string()),
                };
                Err(DeliveryError::with_receipt(e, receipt))
            }
        }
    }

    pub async fn delete_tweet(&self, tweet_id: &str) -> Result<TweetDeletion> {
        self.ensure_connected()?;

        let tweet_id = tweet_id.trim();
        if tweet_id.is_empty() {
            return Err(MessengerError::InvalidArguments(
                "tweet ID cannot be empty".to_string(),
            ));
        }
        if !tweet_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MessengerError::InvalidIdentifier {
                value: tweet_id.to_string(),
                detail: "tweet IDs are numeric".to_string(),
            });
        }

        let path = format!("/2/tweets/{tweet_id}");
        let deleted: DeletedTweet = self.request::<(), _>(Method::DELETE, &path, None).await?;
        if !deleted.deleted {
            return Err(MessengerError::transport(
                PLATFORM,
                format!("tweet {tweet_id} was not deleted"),
            ));
        }

        log::info!("Tweet deleted successfully: {tweet_id}");
        Ok(TweetDeletion {
            success: true,
            tweet_id: tweet_id.to_string(),
            message: "Tweet deleted successfully".to_string(),
        })
    }
}

#[async_trait]
impl Messenger for TwitterMessenger {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    /// Credentials were checked at construction; requests are signed per call,
    /// so there is no session to open.
    async fn connect(&self, _ct: &CancellationToken) -> Result<()> {
        self.state.set(ConnectionState::Connected);
        log::info!("Twitter/X messenger connected");
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.set(ConnectionState::Disconnected);
        log::info!("Twitter/X messenger disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn register_operations(self: Arc<Self>, namespace: &mut Namespace) -> Result<()> {
        for operation in self.operations() {
            namespace.register(operation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn tweet_length_counts_characters_not_bytes() {
        assert!(check_tweet_text(&"a".repeat(280)).is_ok());
        assert!(check_tweet_text(&"é".repeat(280)).is_ok());

        let err = check_tweet_text(&"a".repeat(281)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.to_string(), "invalid arguments: tweet text exceeds 280 characters");
    }

    #[test]
    fn empty_tweet_rejected() {
        let err = check_tweet_text("").unwrap_err();
        assert!(err.to_string().contains("tweet text cannot be empty"));
    }

    #[test]
    fn missing_credential_is_configuration_error() {
        let err = TwitterMessenger::new("key".into(), "secret".into(), "token".into(), " ".into())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(
            err.to_string(),
            "configuration error: all Twitter API credentials are required"
        );
    }

    /// 收集日志文本; 每个测试进程只能安装一个 logger
    struct CapturedLog(std::sync::Mutex<Vec<String>>);

    impl log::Log for CapturedLog {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: CapturedLog = CapturedLog(std::sync::Mutex::new(Vec::new()));

    #[tokio::test]
    async fn connect_keeps_credentials_out_of_logs() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Trace);

        let secrets = ["ck-7Qd2", "cs-91fA", "at-Zx30", "ats-Lm84"];
        let twitter = TwitterMessenger::new(
            secrets[0].into(),
            secrets[1].into(),
            secrets[2].into(),
            secrets[3].into(),
        )
        .unwrap();
        twitter.connect(&CancellationToken::new()).await.unwrap();
        assert!(twitter.is_connected());

        let lines = CAPTURED.0.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("Twitter/X messenger connected")));
        for line in lines.iter() {
            assert!(
                secrets.iter().all(|s| !line.contains(s)),
                "credential leaked into log: {line}"
            );
        }
    }
}
