//! Common test utilities for queue-fanout integration tests
//!
//! This module provides:
//! - A recording message handler and a rejecting one
//! - Helpers for wiring in-memory providers under broker identities

use async_trait::async_trait;
use queue_fanout::{
    handler_fn, HandlerError, InMemoryProvider, MessageHandler, ProviderType, QueueMessage,
    QueueName, QueueProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "queue_fanout=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn queue(name: &str) -> QueueName {
    QueueName::new(name.to_string()).expect("valid queue name")
}

/// In-memory provider standing in for the given broker
#[allow(dead_code)]
pub fn broker(provider_type: ProviderType) -> Arc<InMemoryProvider> {
    Arc::new(InMemoryProvider::default().with_provider_type(provider_type))
}

/// Erase concrete providers for the client factory
#[allow(dead_code)]
pub fn adapters(providers: &[Arc<InMemoryProvider>]) -> Vec<Arc<dyn QueueProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn QueueProvider>)
        .collect()
}

/// Handler recording every message that reaches caller code
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Recorder {
    received: Arc<Mutex<Vec<QueueMessage>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> Arc<dyn MessageHandler> {
        let received = Arc::clone(&self.received);
        handler_fn(move |message| {
            let received = Arc::clone(&received);
            async move {
                tracing::info!(message_id = %message.id, "Test handler received message");
                received.lock().unwrap().push(message);
                Ok(())
            }
        })
    }

    pub fn messages(&self) -> Vec<QueueMessage> {
        self.received.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Providers that delivered, in delivery order
    pub fn providers(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| m.provider)
            .collect()
    }
}

/// Handler that rejects every message it is given, counting the calls
#[derive(Default)]
#[allow(dead_code)]
pub struct RejectingHandler {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl RejectingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageHandler for RejectingHandler {
    async fn handle(&self, message: QueueMessage) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("downstream unavailable for {}", message.id))
    }
}
