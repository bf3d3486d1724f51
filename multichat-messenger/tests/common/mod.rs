//! 共享测试工具和辅助函数

#![allow(dead_code)]

use multichat_messenger::{JsonObject, Namespace, ToolOutput};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "whatsapp")]
pub use whatsapp::*;

/// 断言 `Option` 为 `Some`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// JSON 字面量转参数对象
pub fn args(value: serde_json::Value) -> JsonObject {
    value.as_object().cloned().unwrap_or_default()
}

/// 按名称调用工具；未注册时让测试失败
pub async fn call(namespace: &Namespace, name: &str, value: serde_json::Value) -> ToolOutput {
    let output = namespace
        .dispatch(name, args(value), &CancellationToken::new())
        .await;
    assert!(output.is_some(), "operation '{name}' is not registered");
    output.unwrap_or_else(|| ToolOutput::text(""))
}

#[cfg(feature = "whatsapp")]
mod whatsapp {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use multichat_messenger::{
        Contact, DeviceIdentity, Jid, MessengerError, PairingEvent, Result, WhatsAppSession,
    };
    use tokio::sync::mpsc;

    /// 测试用设备身份
    pub fn test_identity() -> DeviceIdentity {
        DeviceIdentity {
            jid: Jid::parse("15550100000:7@s.whatsapp.net").unwrap_or_else(|_| Jid::user("15550100000")),
            push_name: Some("Test Device".to_string()),
            credentials: "opaque-test-keys".to_string(),
        }
    }

    pub fn contact(jid: &str, name: &str) -> Contact {
        Contact {
            jid: jid.to_string(),
            phone_number: jid.split('@').next().unwrap_or_default().to_string(),
            name: name.to_string(),
        }
    }

    // ============ Mock WhatsApp session ============

    /// Scripted stand-in for the multi-device client.
    #[derive(Default)]
    pub struct MockSession {
        /// Events replayed on `pair()`; the channel closes after the last one
        /// unless `hold_pairing` is set.
        pub pair_events: Vec<PairingEvent>,
        pub hold_pairing: bool,
        pub contacts: Vec<Contact>,
        pub fail_send: bool,
        pub connected: AtomicBool,
        pub pair_calls: AtomicUsize,
        pub resume_calls: AtomicUsize,
        pub sent: Mutex<Vec<(String, String)>>,
        pub held_sender: Mutex<Option<mpsc::Sender<PairingEvent>>>,
    }

    impl MockSession {
        pub fn pairing_with(events: Vec<PairingEvent>) -> Self {
            Self {
                pair_events: events,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl WhatsAppSession for MockSession {
        async fn pair(&self) -> Result<mpsc::Receiver<PairingEvent>> {
            self.pair_calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(16);
            for event in &self.pair_events {
                if matches!(event, PairingEvent::Success(_)) {
                    self.connected.store(true, Ordering::SeqCst);
                }
                let _ = tx.try_send(event.clone());
            }
            if self.hold_pairing {
                if let Ok(mut held) = self.held_sender.lock() {
                    *held = Some(tx);
                }
            }
            Ok(rx)
        }

        async fn resume(&self, _device: &DeviceIdentity) -> Result<()> {
            self.resume_calls.fetch_add(1, Ordering::SeqCst);
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch_contacts(&self) -> Result<Vec<Contact>> {
            Ok(self.contacts.clone())
        }

        async fn send_text(&self, to: &Jid, text: &str) -> Result<String> {
            if self.fail_send {
                return Err(MessengerError::Transport {
                    platform: "WhatsApp".to_string(),
                    detail: "server rejected message".to_string(),
                });
            }
            let mut sent = self
                .sent
                .lock()
                .map_err(|_| MessengerError::Storage("mock lock poisoned".to_string()))?;
            sent.push((to.to_string(), text.to_string()));
            Ok(format!("3EB0{:08X}", sent.len()))
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn disconnect(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }
}
