//! Queue provider implementations.
//!
//! Broker adapters (SQS, RabbitMQ) live outside this crate and implement
//! [`crate::QueueProvider`] themselves; the in-memory provider here serves
//! tests and local development.

pub mod memory;

pub use memory::{DeadLetter, InMemoryConfig, InMemoryProvider};
