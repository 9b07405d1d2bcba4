//! Message handlers invoked on the subscribe path.

use crate::idempotency::IdempotencyStore;
use crate::message::QueueMessage;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Error returned by a handler; the delivering provider treats it as a
/// processing failure for that one delivery.
pub type HandlerError = anyhow::Error;

/// Callback receiving messages from a subscription
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one delivered message
    async fn handle(&self, message: QueueMessage) -> Result<(), HandlerError>;
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(QueueMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: QueueMessage) -> Result<(), HandlerError> {
        (self.f)(message).await
    }
}

/// Build a shareable handler from an async closure
///
/// ```rust
/// use queue_fanout::handler_fn;
///
/// let handler = handler_fn(|message| async move {
///     println!("received {}", message.id);
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(QueueMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Wrapper that drops messages whose ID was already processed
///
/// The membership check and the insert are two separate store calls, so two
/// deliveries of the same ID racing each other can both reach the inner
/// handler.
pub struct IdempotentHandler {
    inner: Arc<dyn MessageHandler>,
    store: Arc<dyn IdempotencyStore>,
}

impl IdempotentHandler {
    pub fn new(inner: Arc<dyn MessageHandler>, store: Arc<dyn IdempotencyStore>) -> Self {
        Self { inner, store }
    }

    /// Handler invoked for first-seen messages
    pub fn inner(&self) -> &Arc<dyn MessageHandler> {
        &self.inner
    }
}

#[async_trait]
impl MessageHandler for IdempotentHandler {
    async fn handle(&self, message: QueueMessage) -> Result<(), HandlerError> {
        if self.store.has(&message.id).await? {
            debug!(
                message_id = %message.id,
                provider = message.provider.as_deref().unwrap_or("unknown"),
                "Duplicate message detected, ignoring"
            );
            return Ok(());
        }

        self.store.add(&message.id).await?;
        self.inner.handle(message).await
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
