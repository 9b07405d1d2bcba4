//! # Multi-Provider Fan-Out
//!
//! [`MultiQueueClient`] presents the [`QueueClient`] contract over several
//! independently configured clients, usually one per broker.
//!
//! Publishing is redundant: every member receives the message concurrently
//! and the call succeeds as long as at least one member accepted it.
//! Subscribing registers the caller's handler with every member as-is; each
//! member already filters duplicates through its own idempotency store, so
//! whether suppression is per-provider or global depends on whether the
//! members share a store.

use crate::client::QueueClient;
use crate::error::QueueError;
use crate::handler::MessageHandler;
use crate::idempotency::IdempotencyStore;
use crate::message::{QueueMessage, QueueName};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Queue client fanning out to an ordered list of member clients
pub struct MultiQueueClient {
    clients: Vec<Arc<dyn QueueClient>>,
    idempotency_store: Arc<dyn IdempotencyStore>,
}

impl MultiQueueClient {
    pub fn new(
        clients: Vec<Arc<dyn QueueClient>>,
        idempotency_store: Arc<dyn IdempotencyStore>,
    ) -> Self {
        Self {
            clients,
            idempotency_store,
        }
    }

    /// Number of member clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Store handed to the composite at construction
    ///
    /// The composite never consults it on the subscribe path; members do
    /// their own filtering.
    pub fn idempotency_store(&self) -> &Arc<dyn IdempotencyStore> {
        &self.idempotency_store
    }
}

#[async_trait]
impl QueueClient for MultiQueueClient {
    async fn publish(
        &self,
        queue: &QueueName,
        mut message: QueueMessage,
    ) -> Result<(), QueueError> {
        // Every member must carry the same ID for downstream deduplication
        if message.ensure_id() {
            debug!(message_id = %message.id, "Generated message ID for fan-out publish");
        }

        if self.clients.is_empty() {
            warn!(queue = %queue, "No queue providers configured, nothing to publish");
            return Ok(());
        }

        let results = join_all(
            self.clients
                .iter()
                .map(|client| client.publish(queue, message.clone())),
        )
        .await;

        let mut failed = 0;
        for (index, result) in results.iter().enumerate() {
            if let Err(e) = result {
                failed += 1;
                error!(
                    queue = %queue,
                    message_id = %message.id,
                    member = index,
                    error = %e,
                    "Failed to publish to one of the queue providers"
                );
            }
        }

        if failed == self.clients.len() {
            return Err(QueueError::AllProvidersFailed {
                queue: queue.to_string(),
                provider_count: self.clients.len(),
            });
        }

        debug!(
            queue = %queue,
            message_id = %message.id,
            succeeded = self.clients.len() - failed,
            failed,
            "Fan-out publish completed"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError> {
        try_join_all(
            self.clients
                .iter()
                .map(|client| client.subscribe(queue, Arc::clone(&handler))),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "multi_tests.rs"]
mod tests;
