//! Client traits and implementations for queue operations.

use crate::error::{ConfigurationError, QueueError};
use crate::handler::{IdempotentHandler, MessageHandler};
use crate::idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
use crate::message::{QueueMessage, QueueName};
use crate::multi::MultiQueueClient;
use crate::provider::{ProviderType, QueueSettings};
use crate::providers::InMemoryProvider;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Main interface for queue operations across all providers
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Publish a message to a queue
    ///
    /// An empty [`QueueMessage::id`] is replaced with a generated one before
    /// the first attempt; a caller-supplied ID is never changed.
    ///
    /// # Errors
    ///
    /// - `QueueError::PublishExhausted` when a single provider failed every attempt
    /// - `QueueError::AllProvidersFailed` when every provider of a fan-out failed
    async fn publish(&self, queue: &QueueName, message: QueueMessage) -> Result<(), QueueError>;

    /// Register a long-lived handler for a queue
    ///
    /// Returns once the registration is in place; messages are delivered
    /// asynchronously afterwards.
    async fn subscribe(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError>;
}

/// Interface implemented by specific queue providers (SQS, RabbitMQ, etc.)
///
/// Implementations only deal with the transport. Retries and duplicate
/// suppression are layered on top by [`StandardQueueClient`].
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Deliver one message; any error is retried by the client
    async fn publish(&self, queue: &QueueName, message: &QueueMessage) -> Result<(), QueueError>;

    /// Register continuous delivery to `handler`
    ///
    /// Implementations must call the handler once per inbound message, stamp
    /// [`QueueMessage::provider`] before doing so, and treat a handler error
    /// as a processing failure of that delivery.
    async fn subscribe(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;
}

/// Factory for creating queue clients with appropriate providers
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create queue client from settings and already-constructed providers
    ///
    /// Every provider selected in `settings.providers` is wrapped in a
    /// [`StandardQueueClient`]; all of them share one in-memory idempotency
    /// store. A single selection returns that client directly, several are
    /// combined in a [`MultiQueueClient`] in the configured order.
    pub fn create_client(
        settings: &QueueSettings,
        providers: Vec<Arc<dyn QueueProvider>>,
    ) -> Result<Arc<dyn QueueClient>, QueueError> {
        settings.validate()?;

        let store: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new(
            settings.idempotency_capacity,
        )?);
        let retry_policy = settings.retry.to_policy();

        let mut clients: Vec<Arc<dyn QueueClient>> = Vec::with_capacity(settings.providers.len());
        for provider_type in &settings.providers {
            let provider = providers
                .iter()
                .find(|p| p.provider_type() == *provider_type)
                .ok_or_else(|| ConfigurationError::Missing {
                    key: format!("provider adapter for '{}'", provider_type),
                })?;

            clients.push(Arc::new(
                StandardQueueClient::new(Arc::clone(provider), Arc::clone(&store))
                    .with_retry_policy(retry_policy.clone()),
            ));
        }

        for provider in &providers {
            if !settings.providers.contains(&provider.provider_type()) {
                debug!(
                    provider = %provider.provider_type(),
                    "Provider adapter supplied but not selected, ignoring"
                );
            }
        }

        info!(
            providers = ?settings.providers,
            idempotency_capacity = settings.idempotency_capacity,
            "Created queue client"
        );

        if clients.len() == 1 {
            return Ok(clients.remove(0));
        }
        Ok(Arc::new(MultiQueueClient::new(clients, store)))
    }

    /// Create test client with in-memory provider
    pub fn create_test_client() -> Arc<dyn QueueClient> {
        let provider = Arc::new(InMemoryProvider::default());
        let store = Arc::new(InMemoryIdempotencyStore::default());
        Arc::new(StandardQueueClient::new(provider, store))
    }
}

/// Standard queue client implementation
///
/// Retries the provider's publish with exponential backoff and filters
/// duplicate deliveries through an [`IdempotencyStore`] on subscribe.
pub struct StandardQueueClient {
    provider: Arc<dyn QueueProvider>,
    idempotency_store: Arc<dyn IdempotencyStore>,
    retry_policy: RetryPolicy,
}

impl StandardQueueClient {
    /// Create new standard queue client with provider and the default retry policy
    pub fn new(
        provider: Arc<dyn QueueProvider>,
        idempotency_store: Arc<dyn IdempotencyStore>,
    ) -> Self {
        Self {
            provider,
            idempotency_store,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider.provider_type()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn idempotency_store(&self) -> &Arc<dyn IdempotencyStore> {
        &self.idempotency_store
    }

    async fn publish_once(
        &self,
        queue: &QueueName,
        message: &QueueMessage,
    ) -> Result<(), QueueError> {
        match self.retry_policy.attempt_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.provider.publish(queue, message)).await {
                    Ok(result) => result,
                    Err(_) => Err(QueueError::Timeout { duration: limit }),
                }
            }
            None => self.provider.publish(queue, message).await,
        }
    }
}

#[async_trait]
impl QueueClient for StandardQueueClient {
    async fn publish(
        &self,
        queue: &QueueName,
        mut message: QueueMessage,
    ) -> Result<(), QueueError> {
        message.ensure_id();
        let max_attempts = self.retry_policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.publish_once(queue, &message).await {
                Ok(()) => {
                    debug!(
                        queue = %queue,
                        provider = %self.provider_type(),
                        message_id = %message.id,
                        attempt,
                        "Published message"
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            warn!(
                queue = %queue,
                provider = %self.provider_type(),
                message_id = %message.id,
                attempt,
                max_attempts,
                error = %error,
                "Failed to publish message"
            );

            if !self.retry_policy.should_retry(attempt) {
                return Err(QueueError::PublishExhausted {
                    queue: queue.to_string(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            tokio::time::sleep(self.retry_policy.calculate_delay(attempt)).await;
        }
    }

    async fn subscribe(
        &self,
        queue: &QueueName,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError> {
        let wrapped = Arc::new(IdempotentHandler::new(
            handler,
            Arc::clone(&self.idempotency_store),
        ));

        self.provider.subscribe(queue, wrapped).await?;

        info!(
            queue = %queue,
            provider = %self.provider_type(),
            "Subscribed to queue"
        );
        Ok(())
    }
}
