use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::operation::Namespace;

/// 消息平台 Trait
///
/// One implementation per platform. The process owns exactly one backend for
/// its lifetime and drives it through `connect`, `register_operations`,
/// serving, and finally `disconnect`.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Human-facing platform label, used in server instructions and logs.
    fn name(&self) -> &'static str;

    /// Establish the platform session.
    ///
    /// May wait for out-of-band device pairing; the wait ends with
    /// [`MessengerError::Cancelled`](crate::MessengerError::Cancelled) when
    /// `ct` fires. On failure the backend stays disconnected.
    async fn connect(&self, ct: &CancellationToken) -> Result<()>;

    /// Release platform resources. Safe to call when never connected; secondary
    /// failures are logged, not returned.
    async fn disconnect(&self);

    /// 当前连接状态
    fn is_connected(&self) -> bool;

    /// Declare this backend's operations. Called once, after `connect`.
    fn register_operations(self: Arc<Self>, namespace: &mut Namespace) -> Result<()>;
}
