pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifyError;

pub use telegram::TelegramNotifier;

/// Delivers a rendered alert to one fixed destination.
///
/// Implementations must bound each call, and an unconfigured notifier must
/// behave as a successful no-op (logging the message locally) rather than fail.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;

    /// Human-readable channel name, e.g. "telegram".
    fn channel_name(&self) -> &str;
}
