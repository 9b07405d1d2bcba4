//! Tests for the in-memory provider.

use super::*;
use crate::handler::handler_fn;
use serde_json::json;

fn queue(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

/// Handler collecting messages into a shared vector
fn collector() -> (Arc<dyn MessageHandler>, Arc<Mutex<Vec<QueueMessage>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let handler = handler_fn(move |message| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(message);
            Ok(())
        }
    });
    (handler, received)
}

#[tokio::test]
async fn test_publish_delivers_and_stamps_provider() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");
    let (handler, received) = collector();

    provider.subscribe(&q, handler).await.unwrap();
    provider
        .publish(&q, &QueueMessage::new(json!({"n": 1})).with_id("m-1"))
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id.as_str(), "m-1");
    assert_eq!(received[0].provider.as_deref(), Some("in-memory"));
}

#[tokio::test]
async fn test_stamp_follows_configured_provider_type() {
    let provider = InMemoryProvider::default().with_provider_type(ProviderType::RabbitMq);
    let q = queue("orders");
    let (handler, received) = collector();

    provider.subscribe(&q, handler).await.unwrap();
    provider
        .publish(&q, &QueueMessage::new(json!({})))
        .await
        .unwrap();

    assert_eq!(provider.provider_type(), ProviderType::RabbitMq);
    assert_eq!(
        received.lock().unwrap()[0].provider.as_deref(),
        Some("rabbitmq")
    );
}

#[tokio::test]
async fn test_messages_buffered_until_first_subscriber() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");

    for i in 0..3 {
        provider
            .publish(&q, &QueueMessage::new(json!(i)).with_id(format!("m-{}", i)))
            .await
            .unwrap();
    }
    assert_eq!(provider.pending_count(&q), 3);

    let (handler, received) = collector();
    provider.subscribe(&q, handler).await.unwrap();

    assert_eq!(provider.pending_count(&q), 0);
    let ids: Vec<String> = received
        .lock()
        .unwrap()
        .iter()
        .map(|m| m.id.to_string())
        .collect();
    assert_eq!(ids, vec!["m-0", "m-1", "m-2"]);
}

#[tokio::test]
async fn test_buffer_is_bounded() {
    let provider = InMemoryProvider::new(InMemoryConfig { max_queue_size: 1 });
    let q = queue("orders");

    provider
        .publish(&q, &QueueMessage::new(json!(1)))
        .await
        .unwrap();
    let result = provider.publish(&q, &QueueMessage::new(json!(2))).await;

    assert!(matches!(result, Err(QueueError::QueueFull { max_size: 1, .. })));
}

#[tokio::test]
async fn test_round_robin_between_subscribers() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");
    let (first, first_received) = collector();
    let (second, second_received) = collector();

    provider.subscribe(&q, first).await.unwrap();
    provider.subscribe(&q, second).await.unwrap();
    assert_eq!(provider.subscriber_count(&q), 2);

    for _ in 0..4 {
        provider
            .publish(&q, &QueueMessage::new(json!({})))
            .await
            .unwrap();
    }

    assert_eq!(first_received.lock().unwrap().len(), 2);
    assert_eq!(second_received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_queues_are_isolated() {
    let provider = InMemoryProvider::default();
    let (handler, received) = collector();

    provider.subscribe(&queue("a"), handler).await.unwrap();
    provider
        .publish(&queue("b"), &QueueMessage::new(json!({})))
        .await
        .unwrap();

    assert!(received.lock().unwrap().is_empty());
    assert_eq!(provider.pending_count(&queue("b")), 1);
}

#[tokio::test]
async fn test_handler_failure_dead_letters_message() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");

    provider
        .subscribe(
            &q,
            handler_fn(|_message| async { Err(anyhow::anyhow!("cannot process")) }),
        )
        .await
        .unwrap();
    let result = provider
        .publish(&q, &QueueMessage::new(json!({})).with_id("poison"))
        .await;

    assert!(result.is_ok(), "handler failures do not fail the publish");
    assert_eq!(provider.dead_letter_count(&q), 1);
    let dead = provider.dead_letters(&q);
    assert_eq!(dead[0].message.id.as_str(), "poison");
    assert!(dead[0].reason.contains("cannot process"));
}

#[tokio::test]
async fn test_backlog_delivery_continues_past_failed_settlement() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");
    for i in 0..3 {
        provider
            .publish(&q, &QueueMessage::new(json!(i)).with_id(format!("m-{}", i)))
            .await
            .unwrap();
    }

    // The first delivery poisons the queue lock and fails, so recording its
    // dead letter fails too
    let queues = Arc::clone(&provider.queues);
    let handled = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&handled);
    let handler = handler_fn(move |message| {
        let queues = Arc::clone(&queues);
        let sink = Arc::clone(&sink);
        async move {
            let first = {
                let mut handled = sink.lock().unwrap();
                handled.push(message.id.to_string());
                handled.len() == 1
            };
            if first {
                let _ = std::thread::spawn(move || {
                    let _guard = queues.lock().unwrap();
                    panic!("poison the queue lock");
                })
                .join();
                return Err(anyhow::anyhow!("cannot process"));
            }
            Ok(())
        }
    });

    let result = provider.subscribe(&q, handler).await;

    assert!(matches!(
        result,
        Err(QueueError::ProviderError { ref code, .. }) if code == "LockPoisoned"
    ));
    assert_eq!(*handled.lock().unwrap(), vec!["m-0", "m-1", "m-2"]);
}

#[tokio::test]
async fn test_unavailable_provider_rejects_operations() {
    let provider = InMemoryProvider::default();
    let q = queue("orders");

    provider.set_available(false);
    let publish = provider.publish(&q, &QueueMessage::new(json!({}))).await;
    let (handler, _received) = collector();
    let subscribe = provider.subscribe(&q, handler).await;

    assert!(matches!(publish, Err(QueueError::ConnectionFailed { .. })));
    assert!(matches!(subscribe, Err(QueueError::ConnectionFailed { .. })));

    provider.set_available(true);
    assert!(provider
        .publish(&q, &QueueMessage::new(json!({})))
        .await
        .is_ok());
}

#[test]
fn test_in_memory_config_defaults() {
    let config = InMemoryConfig::default();
    assert_eq!(config.max_queue_size, 10000);
}
