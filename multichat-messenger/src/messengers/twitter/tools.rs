//! Twitter 工具定义

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::operation::{Operation, ToolOutput};

use super::TwitterMessenger;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PostTweetParams {
    /// The text content of the tweet (max 280 characters)
    pub text: String,
    /// Optional: ID of the tweet to reply to
    #[serde(default)]
    pub reply_to_tweet_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    /// The text content of the tweet (max 280 characters)
    pub message: String,
    /// Optional: ID of the tweet to reply to
    #[serde(default)]
    pub reply_to_tweet_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteTweetParams {
    /// The ID of the tweet to delete
    pub tweet_id: String,
}

impl TwitterMessenger {
    pub(crate) fn operations(self: &Arc<Self>) -> Vec<Operation> {
        vec![
            Operation::with_target(
                self,
                "post_tweet",
                "Post a tweet to Twitter/X (max 280 characters)",
                |tw, p: PostTweetParams| async move {
                    let result = tw.post_tweet(&p.text, p.reply_to_tweet_id.as_deref()).await;
                    ToolOutput::from_delivery("failed to post tweet", result)
                },
            ),
            // send_message 与其他平台保持一致
            Operation::with_target(
                self,
                "send_message",
                "Send a message (tweet) to Twitter/X (max 280 characters)",
                |tw, p: SendMessageParams| async move {
                    let result = tw
                        .post_tweet(&p.message, p.reply_to_tweet_id.as_deref())
                        .await;
                    ToolOutput::from_delivery("failed to send message", result)
                },
            ),
            Operation::with_target(
                self,
                "delete_tweet",
                "Delete a tweet by ID",
                |tw, p: DeleteTweetParams| async move {
                    ToolOutput::from_result("failed to delete tweet", tw.delete_tweet(&p.tweet_id).await)
                },
            ),
        ]
    }
}
