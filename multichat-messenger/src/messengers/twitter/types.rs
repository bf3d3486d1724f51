//! Twitter API v2 类型定义

use serde::{Deserialize, Serialize};

// ============ 请求/响应 ============

#[derive(Debug, Serialize)]
pub(crate) struct CreateTweetRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<TweetReply<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TweetReply<'a> {
    pub in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedTweet {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeletedTweet {
    pub deleted: bool,
}

/// Problem details returned on 4xx/5xx.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiProblemItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiProblemItem {
    pub message: Option<String>,
}

impl ApiProblem {
    /// Most specific message available.
    pub fn message(&self) -> Option<String> {
        self.detail
            .clone()
            .or_else(|| self.errors.iter().find_map(|e| e.message.clone()))
            .or_else(|| self.title.clone())
    }
}

// ============ 对外结果 ============

/// Outcome of posting a tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetReceipt {
    pub tweet_id: String,
    pub text: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetDeletion {
    pub success: bool,
    pub tweet_id: String,
    pub message: String,
}
