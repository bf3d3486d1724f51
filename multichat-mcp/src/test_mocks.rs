use super::*;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use multichat_messenger::{ErrorKind, MessengerError, Operation};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoParams {
    /// Text to echo back
    pub message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EmptyParams {}

/// Messenger double with a fixed tool set:
/// `echo`, `fail`, `history` (success with a note) and `hang` (never finishes).
#[derive(Default)]
pub struct MockMessenger {
    pub connected: AtomicBool,
    pub echo_calls: AtomicUsize,
    /// Register `echo` twice.
    pub duplicate: bool,
}

impl MockMessenger {
    pub fn connected() -> Arc<Self> {
        let mock = Self::default();
        mock.connected.store(true, Ordering::SeqCst);
        Arc::new(mock)
    }

    fn echo(self: &Arc<Self>) -> Operation {
        Operation::with_target(
            self,
            "echo",
            "Echo the message back",
            |mock, p: EchoParams| async move {
                mock.echo_calls.fetch_add(1, Ordering::SeqCst);
                ToolOutput::text(format!("echo: {}", p.message))
            },
        )
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn connect(&self, _ct: &CancellationToken) -> multichat_messenger::Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn register_operations(
        self: Arc<Self>,
        namespace: &mut Namespace,
    ) -> multichat_messenger::Result<()> {
        namespace.register(self.echo())?;
        if self.duplicate {
            namespace.register(self.echo())?;
        }
        namespace.register(Operation::new(
            "fail",
            "Always fails",
            |_: EmptyParams| async {
                ToolOutput::failed(
                    "mock failed",
                    &MessengerError::Transport {
                        platform: "Mock".into(),
                        detail: "backend unavailable".into(),
                    },
                )
            },
        ))?;
        namespace.register(Operation::new(
            "history",
            "Succeeds with an advisory note",
            |_: EmptyParams| async {
                ToolOutput::json(&Vec::<String>::new()).with_note("history is not available")
            },
        ))?;
        namespace.register(Operation::new(
            "hang",
            "Never completes",
            |_: EmptyParams| async {
                std::future::pending::<()>().await;
                ToolOutput::failure(ErrorKind::Transport, "unreachable")
            },
        ))?;
        Ok(())
    }
}

pub fn build_server(mock: &Arc<MockMessenger>) -> MultichatMcp {
    let messenger: Arc<dyn Messenger> = Arc::clone(mock) as Arc<dyn Messenger>;
    MultichatMcp::new(messenger).unwrap()
}
