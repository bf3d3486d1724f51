//! OAuth 1.0a HMAC-SHA1 签名 (user context)
//! 参考: <https://developer.x.com/en/docs/authentication/oauth-1-0a/creating-a-signature>

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 百分号编码（只保留 unreserved 字符）
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Consumer and access-token pairs for one account.
#[derive(Clone)]
pub(crate) struct OAuthCredentials {
    pub(crate) consumer_key: String,
    pub(crate) consumer_secret: String,
    pub(crate) token: String,
    pub(crate) token_secret: String,
}

impl OAuthCredentials {
    /// oauth_* 协议参数（不含签名）
    fn protocol_params<'a>(&'a self, nonce: &'a str, timestamp: &'a str) -> [(&'a str, &'a str); 6] {
        [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ]
    }

    /// Compute `oauth_signature`.
    ///
    /// `url` must not carry a query string; query and form parameters go in
    /// `params`. JSON bodies are not part of the signature.
    pub(crate) fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        // 1. 参数编码后按 key、value 排序
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .copied()
            .chain(self.protocol_params(nonce, timestamp))
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();

        let parameter_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        // 2. 待签名字符串
        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        log::trace!("OAuth signature base string: {base_string}");

        // 3. 签名
        let signing_key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.token_secret)
        );
        STANDARD.encode(hmac_sha1(signing_key.as_bytes(), base_string.as_bytes()))
    }

    /// Build the `Authorization: OAuth ...` header value.
    pub(crate) fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let signature = self.signature(method, url, params, nonce, timestamp);
        let mut header_params: Vec<(&str, &str)> =
            self.protocol_params(nonce, timestamp).to_vec();
        header_params.push(("oauth_signature", &signature));
        header_params.sort_unstable();

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("token", &"***")
            .field("token_secret", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documented_credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
        }
    }

    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

    fn documented_params() -> [(&'static str, &'static str); 2] {
        [
            ("include_entities", "true"),
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
        ]
    }

    // ============ 签名测试 ============

    #[test]
    fn signature_matches_documented_example() {
        let sig = documented_credentials().signature(
            "POST",
            URL,
            &documented_params(),
            NONCE,
            TIMESTAMP,
        );
        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn method_is_case_insensitive() {
        let creds = documented_credentials();
        let upper = creds.signature("POST", URL, &documented_params(), NONCE, TIMESTAMP);
        let lower = creds.signature("post", URL, &documented_params(), NONCE, TIMESTAMP);
        assert_eq!(upper, lower);
    }

    #[test]
    fn different_secret_changes_signature() {
        let mut other = documented_credentials();
        other.token_secret = "another-secret".into();
        let a = documented_credentials().signature("POST", URL, &[], NONCE, TIMESTAMP);
        let b = other.signature("POST", URL, &[], NONCE, TIMESTAMP);
        assert_ne!(a, b);
    }

    #[test]
    fn header_contains_encoded_signature() {
        let header = documented_credentials().authorization_header(
            "POST",
            URL,
            &documented_params(),
            NONCE,
            TIMESTAMP,
        );
        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        assert!(!header.contains("include_entities"));
    }

    #[test]
    fn debug_hides_secrets() {
        let debug = format!("{:?}", documented_credentials());
        assert!(!debug.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(!debug.contains("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"));
    }
}
