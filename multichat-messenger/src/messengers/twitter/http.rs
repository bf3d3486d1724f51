//! Twitter HTTP 请求方法

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{MessengerError, Result};
use crate::http_client::HttpUtils;
use crate::utils::log_sanitizer::truncate_for_log;

use super::types::{ApiProblem, DataEnvelope};
use super::{PLATFORM, TwitterMessenger};

impl TwitterMessenger {
    /// 生成 OAuth Authorization 头（每次请求新 nonce）
    fn authorization(&self, method: &Method, url: &str) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.credentials
            .authorization_header(method.as_str(), url, &[], &nonce, &timestamp)
    }

    /// Send a signed request and unwrap the `data` envelope.
    pub(crate) async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", self.authorization(&method, &url));
        if let Some(body) = body {
            request = request.json(body);
        }

        let (status, text) =
            HttpUtils::execute_request(request, PLATFORM, method.as_str(), path).await?;

        if !(200..300).contains(&status) {
            let problem: ApiProblem = serde_json::from_str(&text).unwrap_or_default();
            let message = problem
                .message()
                .unwrap_or_else(|| truncate_for_log(&text));
            log::error!("[{PLATFORM}] {method} {path} failed with HTTP {status}: {message}");
            return Err(MessengerError::transport(
                PLATFORM,
                format!("HTTP {status}: {message}"),
            ));
        }

        serde_json::from_str::<DataEnvelope<T>>(&text)
            .map(|envelope| envelope.data)
            .map_err(|e| {
                log::error!("JSON 解析失败: {e}");
                MessengerError::transport(PLATFORM, format!("failed to parse response: {e}"))
            })
    }
}
