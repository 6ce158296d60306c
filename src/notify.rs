//! Best-effort notifications
//!
//! Dispatched only after the triggering write has committed. Failures are
//! logged and dropped; a slow notifier never holds up the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verify_email(&self, username: &str, email: &str) -> anyhow::Result<()>;
}

/// Writes the notification to the log instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verify_email(&self, username: &str, email: &str) -> anyhow::Result<()> {
        tracing::info!(username, email, "Verification email queued");
        Ok(())
    }
}

/// Fire and forget. The handle is returned for tests; callers normally drop it.
pub fn dispatch_verify_email(
    notifier: Arc<dyn Notifier>,
    username: String,
    email: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.send_verify_email(&username, &email).await {
            tracing::warn!(username = %username, error = %e, "Failed to send verification email");
        }
    })
}
