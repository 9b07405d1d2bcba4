//! Bounded record of processed message identifiers.
//!
//! The store backs duplicate suppression on the subscribe path. The default
//! implementation keeps identifiers in memory and evicts in strict insertion
//! order once its capacity is reached; a persistent or shared variant can be
//! supplied through the [`IdempotencyStore`] trait.

use crate::error::QueueError;
use crate::message::MessageId;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Number of identifiers remembered by default
pub const DEFAULT_IDEMPOTENCY_CAPACITY: usize = 1000;

/// Membership set of message identifiers that have already been processed
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Check whether the identifier has been recorded
    async fn has(&self, id: &MessageId) -> Result<bool, QueueError>;

    /// Record the identifier as processed
    async fn add(&self, id: &MessageId) -> Result<(), QueueError>;
}

#[derive(Debug, Default)]
struct SeenIds {
    ids: HashSet<MessageId>,
    order: VecDeque<MessageId>,
}

/// In-memory FIFO-bounded idempotency store
///
/// Membership checks never refresh an entry: the identifier inserted first is
/// always the one evicted first.
///
/// # Example
///
/// ```rust
/// use queue_fanout::{IdempotencyStore, InMemoryIdempotencyStore, MessageId};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryIdempotencyStore::new(2).unwrap();
/// for id in ["a", "b", "c"] {
///     store.add(&MessageId::from(id)).await.unwrap();
/// }
///
/// assert!(!store.has(&MessageId::from("a")).await.unwrap());
/// assert!(store.has(&MessageId::from("c")).await.unwrap());
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryIdempotencyStore {
    seen: Mutex<SeenIds>,
    capacity: usize,
}

impl InMemoryIdempotencyStore {
    /// Create a store remembering at most `capacity` identifiers
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(crate::error::ConfigurationError::Invalid {
                message: "idempotency store capacity must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(Self {
            seen: Mutex::new(SeenIds::default()),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of identifiers currently remembered
    ///
    /// Still reports the recorded entries after a panic poisoned the lock;
    /// `has` and `add` surface the poisoning as an error instead.
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_seen(&self) -> Result<std::sync::MutexGuard<'_, SeenIds>, QueueError> {
        self.seen.lock().map_err(|e| QueueError::IdempotencyStore {
            message: format!("Failed to acquire lock: {}", e),
        })
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self {
            seen: Mutex::new(SeenIds::default()),
            capacity: DEFAULT_IDEMPOTENCY_CAPACITY,
        }
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn has(&self, id: &MessageId) -> Result<bool, QueueError> {
        Ok(self.lock_seen()?.ids.contains(id))
    }

    async fn add(&self, id: &MessageId) -> Result<(), QueueError> {
        let mut seen = self.lock_seen()?;

        // Re-adding keeps the original position in the eviction order
        if !seen.ids.insert(id.clone()) {
            return Ok(());
        }
        seen.order.push_back(id.clone());

        while seen.order.len() > self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.ids.remove(&oldest);
                tracing::trace!(message_id = %oldest, "Evicted message ID from idempotency store");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
