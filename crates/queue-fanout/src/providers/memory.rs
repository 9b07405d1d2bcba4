//! In-memory queue provider implementation for testing and development.
//!
//! This module provides an in-process provider that:
//! - Buffers messages published before anyone subscribes
//! - Delivers to subscribers round-robin, like competing consumers
//! - Moves messages whose handler failed to a per-queue dead letter list
//! - Can be switched offline to simulate a broker outage
//!
//! Delivery happens inline: `publish` returns once the receiving handler has
//! finished.

use crate::client::QueueProvider;
use crate::error::QueueError;
use crate::handler::MessageHandler;
use crate::message::{QueueMessage, QueueName};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// In-memory provider configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Maximum number of buffered messages per queue
    pub max_queue_size: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000,
        }
    }
}

/// A message whose handler failed
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: QueueMessage,
    pub reason: String,
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

#[derive(Default)]
struct InMemoryQueue {
    subscribers: Vec<Arc<dyn MessageHandler>>,
    next_subscriber: usize,
    /// Messages waiting for a first subscriber (FIFO order)
    pending: VecDeque<QueueMessage>,
    dead_letter: Vec<DeadLetter>,
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
pub struct InMemoryProvider {
    queues: Arc<Mutex<HashMap<QueueName, InMemoryQueue>>>,
    config: InMemoryConfig,
    provider_type: ProviderType,
    available: AtomicBool,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            config,
            provider_type: ProviderType::InMemory,
            available: AtomicBool::new(true),
        }
    }

    /// Report as another provider type, so the in-memory provider can stand
    /// in for a broker when wiring clients locally
    pub fn with_provider_type(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = provider_type;
        self
    }

    /// Simulate the broker going offline (`false`) or recovering (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Messages buffered while the queue has no subscriber
    pub fn pending_count(&self, queue: &QueueName) -> usize {
        self.inspect(queue, |q| q.pending.len())
    }

    pub fn subscriber_count(&self, queue: &QueueName) -> usize {
        self.inspect(queue, |q| q.subscribers.len())
    }

    pub fn dead_letter_count(&self, queue: &QueueName) -> usize {
        self.inspect(queue, |q| q.dead_letter.len())
    }

    pub fn dead_letters(&self, queue: &QueueName) -> Vec<DeadLetter> {
        self.inspect(queue, |q| q.dead_letter.clone())
    }

    fn inspect<T: Default>(&self, queue: &QueueName, f: impl FnOnce(&InMemoryQueue) -> T) -> T {
        match self.queues.lock() {
            Ok(queues) => queues.get(queue).map(f).unwrap_or_default(),
            Err(_) => T::default(),
        }
    }

    fn lock_queues(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<QueueName, InMemoryQueue>>, QueueError> {
        self.queues.lock().map_err(|e| QueueError::ProviderError {
            provider: self.provider_type.to_string(),
            code: "LockPoisoned".to_string(),
            message: e.to_string(),
        })
    }

    fn ensure_available(&self) -> Result<(), QueueError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::ConnectionFailed {
                message: format!("{} provider is unavailable", self.provider_type),
            })
        }
    }

    /// Hand one message to a handler, dead-lettering it on failure
    async fn deliver(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
        message: QueueMessage,
    ) -> Result<(), QueueError> {
        let message = message.with_provider(self.provider_type.as_str());

        if let Err(e) = handler.handle(message.clone()).await {
            warn!(
                queue = %queue,
                provider = %self.provider_type,
                message_id = %message.id,
                error = %e,
                "Message handler failed, moving message to dead letter"
            );
            let mut queues = self.lock_queues()?;
            queues
                .entry(queue.clone())
                .or_default()
                .dead_letter
                .push(DeadLetter {
                    message,
                    reason: e.to_string(),
                });
        }

        Ok(())
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryProvider {
    async fn publish(&self, queue: &QueueName, message: &QueueMessage) -> Result<(), QueueError> {
        self.ensure_available()?;

        let target = {
            let mut queues = self.lock_queues()?;
            let state = queues.entry(queue.clone()).or_default();

            if state.subscribers.is_empty() {
                if state.pending.len() >= self.config.max_queue_size {
                    return Err(QueueError::QueueFull {
                        queue_name: queue.to_string(),
                        max_size: self.config.max_queue_size,
                    });
                }
                state.pending.push_back(message.clone());
                debug!(queue = %queue, message_id = %message.id, "Buffered message");
                return Ok(());
            }

            let index = state.next_subscriber % state.subscribers.len();
            state.next_subscriber = state.next_subscriber.wrapping_add(1);
            Arc::clone(&state.subscribers[index])
        };

        self.deliver(queue, target, message.clone()).await
    }

    async fn subscribe(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError> {
        self.ensure_available()?;

        let backlog: Vec<QueueMessage> = {
            let mut queues = self.lock_queues()?;
            let state = queues.entry(queue.clone()).or_default();
            state.subscribers.push(Arc::clone(&handler));
            state.pending.drain(..).collect()
        };

        if !backlog.is_empty() {
            debug!(
                queue = %queue,
                count = backlog.len(),
                "Delivering buffered messages to new subscriber"
            );
        }

        // Already drained, so keep going past a failed delivery and report
        // the first failure once the backlog is empty
        let mut first_error = None;
        for message in backlog {
            let message_id = message.id.clone();
            if let Err(e) = self.deliver(queue, Arc::clone(&handler), message).await {
                warn!(
                    queue = %queue,
                    message_id = %message_id,
                    error = %e,
                    "Failed to settle buffered message, continuing with backlog"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }
}
