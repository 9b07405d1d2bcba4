//! # Queue Fan-Out
//!
//! Provider-agnostic queue client. Callers publish and subscribe through one
//! [`QueueClient`] interface while the transport behind it, a single broker
//! or several brokers at once, is chosen at wiring time.
//!
//! This library provides:
//! - Publish retries with exponential backoff around any provider
//! - Duplicate suppression on subscribe, backed by a bounded idempotency store
//! - Redundant fan-out publishing with at-least-one-success semantics
//! - Settings loading and client wiring from configured providers
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message envelope and identifiers
//! - [`idempotency`] - Idempotency store trait and in-memory implementation
//! - [`retry`] - Retry policy with exponential backoff
//! - [`handler`] - Subscription handlers and the duplicate filter
//! - [`client`] - Client and provider traits, the standard client and factory
//! - [`multi`] - Fan-out client over several member clients
//! - [`provider`] - Provider types and settings
//! - [`providers`] - In-memory provider

// Module declarations
pub mod client;
pub mod error;
pub mod handler;
pub mod idempotency;
pub mod message;
pub mod multi;
pub mod provider;
pub mod providers;
pub mod retry;

// Re-export commonly used types at crate root for convenience
pub use client::{QueueClient, QueueClientFactory, QueueProvider, StandardQueueClient};
pub use error::{ConfigurationError, QueueError, ValidationError};
pub use handler::{handler_fn, HandlerError, IdempotentHandler, MessageHandler};
pub use idempotency::{IdempotencyStore, InMemoryIdempotencyStore, DEFAULT_IDEMPOTENCY_CAPACITY};
pub use message::{MessageId, QueueMessage, QueueName, Timestamp};
pub use multi::MultiQueueClient;
pub use provider::{ProviderType, QueueSettings, RetrySettings};
pub use providers::{InMemoryConfig, InMemoryProvider};
pub use retry::RetryPolicy;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
