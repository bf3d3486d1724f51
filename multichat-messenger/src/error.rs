use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`MessengerError`].
///
/// Handlers and the protocol layer use the kind to tag failure results, so a
/// client can tell an argument problem from a platform outage without parsing
/// the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Arguments failed to decode into the operation's parameter struct.
    Argument,
    /// A date filter was not valid RFC 3339.
    Date,
    /// The backend is not connected.
    State,
    /// A JID, phone number or webhook URL could not be interpreted.
    Identifier,
    /// The platform or its transport rejected the request.
    Transport,
    /// The caller cancelled the request.
    Cancelled,
    /// Startup or registration misconfiguration.
    Configuration,
}

/// Unified error type for all messenger operations.
///
/// All variants are serializable for structured error reporting, using the same
/// `code`/`details` envelope across the workspace.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum MessengerError {
    /// Arguments could not be decoded.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A date filter field did not parse as RFC 3339.
    #[error("invalid {field} date: {detail}")]
    InvalidDate {
        /// Name of the offending field (`after`, `before`).
        field: String,
        /// Parser detail.
        detail: String,
    },

    /// The platform session is not established.
    #[error("not connected to {platform}")]
    NotConnected {
        /// Human-facing platform label.
        platform: String,
    },

    /// An identifier could not be parsed.
    #[error("invalid identifier '{value}': {detail}")]
    InvalidIdentifier {
        /// The raw value supplied by the caller.
        value: String,
        /// Why it was rejected.
        detail: String,
    },

    /// The platform call failed.
    #[error("[{platform}] {detail}")]
    Transport {
        /// Platform that produced the error.
        platform: String,
        /// Error details.
        detail: String,
    },

    /// The platform rejected the request with HTTP 429.
    #[error("[{platform}] rate limited{}", retry_suffix(.retry_after.as_ref()))]
    RateLimited {
        /// Platform that produced the error.
        platform: String,
        /// Suggested wait time in seconds, if provided.
        retry_after: Option<u64>,
    },

    /// The request was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid process configuration (unknown backend, missing credential).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Local device/contact store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Two operations were registered under the same name.
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(String),
}

impl MessengerError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments(_) => ErrorKind::Argument,
            Self::InvalidDate { .. } => ErrorKind::Date,
            Self::NotConnected { .. } => ErrorKind::State,
            Self::InvalidIdentifier { .. } => ErrorKind::Identifier,
            Self::Transport { .. } | Self::RateLimited { .. } | Self::Storage(_) => {
                ErrorKind::Transport
            }
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Configuration(_) | Self::DuplicateOperation(_) => ErrorKind::Configuration,
        }
    }

    /// 是否为预期行为（用户输入、未连接等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    pub fn is_expected(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Argument
                | ErrorKind::Date
                | ErrorKind::State
                | ErrorKind::Identifier
                | ErrorKind::Cancelled
        )
    }

    pub(crate) fn transport(platform: &str, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            platform: platform.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn not_connected(platform: &str) -> Self {
        Self::NotConnected {
            platform: platform.to_string(),
        }
    }
}

fn retry_suffix(retry_after: Option<&u64>) -> String {
    retry_after
        .map(|secs| format!(" (retry after {secs}s)"))
        .unwrap_or_default()
}

/// Convenience type alias for `Result<T, MessengerError>`.
pub type Result<T> = std::result::Result<T, MessengerError>;

/// A send that failed, with the receipt describing the attempt.
///
/// `receipt` is `None` when the request never reached the network (not
/// connected, missing target, validation failure).
#[derive(Debug, Clone)]
pub struct DeliveryError<R> {
    pub error: MessengerError,
    pub receipt: Option<R>,
}

impl<R> DeliveryError<R> {
    pub fn with_receipt(error: MessengerError, receipt: R) -> Self {
        Self {
            error,
            receipt: Some(receipt),
        }
    }
}

impl<R> From<MessengerError> for DeliveryError<R> {
    fn from(error: MessengerError) -> Self {
        Self {
            error,
            receipt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_connected() {
        let e = MessengerError::not_connected("WhatsApp");
        assert_eq!(e.to_string(), "not connected to WhatsApp");
        assert_eq!(e.kind(), ErrorKind::State);
    }

    #[test]
    fn display_invalid_date() {
        let e = MessengerError::InvalidDate {
            field: "after".to_string(),
            detail: "premature end of input".to_string(),
        };
        assert_eq!(e.to_string(), "invalid after date: premature end of input");
        assert_eq!(e.kind(), ErrorKind::Date);
    }

    #[test]
    fn display_rate_limited_with_retry() {
        let e = MessengerError::RateLimited {
            platform: "Twitter/X".to_string(),
            retry_after: Some(15),
        };
        assert_eq!(e.to_string(), "[Twitter/X] rate limited (retry after 15s)");
    }

    #[test]
    fn display_rate_limited_without_retry() {
        let e = MessengerError::RateLimited {
            platform: "Twitter/X".to_string(),
            retry_after: None,
        };
        assert_eq!(e.to_string(), "[Twitter/X] rate limited");
    }

    #[test]
    fn transport_and_storage_are_unexpected() {
        assert!(!MessengerError::transport("Teams", "HTTP 500").is_expected());
        assert!(!MessengerError::Storage("disk full".into()).is_expected());
        assert!(MessengerError::InvalidArguments("missing field".into()).is_expected());
    }

    #[test]
    fn duplicate_operation_is_configuration() {
        let e = MessengerError::DuplicateOperation("send_message".into());
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(
            e.to_string(),
            "operation 'send_message' is already registered"
        );
    }

    #[test]
    fn serialize_uses_code_envelope() {
        let e = MessengerError::InvalidIdentifier {
            value: "abc".to_string(),
            detail: "missing server".to_string(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "InvalidIdentifier");
        assert_eq!(json["details"]["value"], "abc");
    }
}
