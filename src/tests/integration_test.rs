use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;

use uuid::Uuid;

use crate::broker::{Broker, BrokerDefaults};
use crate::client::Client;
use crate::transport::http::router;
use crate::transport::wire::{SubscriptionCreate, TopicCreate, TopicUpdate};
use crate::utils::error::ClientError;

/// Boot a fresh broker and API server on an ephemeral port, on its own
/// runtime thread, and hand back the bound address. The blocking client
/// then drives it from the test thread.
fn start_server() -> SocketAddr {
    let broker = Arc::new(Broker::new(BrokerDefaults::default()));
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            tx.send(listener.local_addr().expect("local addr"))
                .expect("send addr");
            axum::serve(listener, router(broker)).await.expect("serve");
        });
    });
    rx.recv().expect("server address")
}

#[test]
fn test_end_to_end_queue_flow() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();
    assert!(client.heartbeat());

    let topic = client
        .create_topic(
            "t",
            &TopicCreate {
                message_ttl: Some(60),
                ttl: Some(3600),
            },
        )
        .unwrap();
    assert_eq!(topic.name, "t");
    assert_eq!(topic.message_ttl, 60);
    assert_eq!(topic.ttl, 3600);

    let subscription = client
        .create_subscription(
            "s",
            &SubscriptionCreate {
                topic: "t".to_string(),
                ack_deadline: Some(60),
                ttl: Some(3600),
                historical: None,
            },
        )
        .unwrap();
    assert_eq!(subscription.topic, "t");
    assert_eq!(subscription.ack_deadline, 60);
    assert_eq!(subscription.ttl, 3600);

    let published = client
        .publish("t", vec!["a".to_string(), "b".to_string()])
        .unwrap();
    assert_eq!(published.len(), 2);

    let messages = client.pull("s", 2).unwrap();
    assert_eq!(messages.len(), 2);
    for message in &messages {
        assert!(message.data == "a" || message.data == "b");
        assert_eq!(message.tries, 0);
    }

    let acked = client
        .ack("s", messages.iter().map(|m| m.id).collect())
        .unwrap();
    let acked: HashSet<Uuid> = acked.into_iter().collect();
    assert_eq!(acked, published.iter().copied().collect());

    assert!(client.pull("s", 2).unwrap().is_empty());

    // partial update through the full stack
    let topic = client
        .update_topic(
            "t",
            &TopicUpdate {
                message_ttl: Some(12),
                ttl: None,
            },
        )
        .unwrap();
    assert_eq!(topic.message_ttl, 12);
    assert_eq!(topic.ttl, 3600);

    // anonymous creation round trip
    let anonymous = client.create_topic_anonymous(&TopicCreate::default()).unwrap();
    assert!(!anonymous.name.is_empty());
    let names: Vec<String> = client
        .list_topics()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert!(names.contains(&anonymous.name));
    assert!(names.contains(&"t".to_string()));

    assert_eq!(client.topic_subscriptions("t").unwrap(), vec!["s".to_string()]);

    let stats = client.stats().unwrap();
    assert_eq!(stats.topics, 2);
    assert_eq!(stats.subscriptions, 1);
    assert_eq!(stats.pending_messages, 0);

    client.delete_subscription("s").unwrap();
    assert!(client.list_subscriptions().unwrap().is_empty());
    client.delete_topic("t").unwrap();
}

#[test]
fn test_fault_classification_over_the_wire() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();

    match client.get_topic("ghost").unwrap_err() {
        ClientError::Client { status, .. } => assert_eq!(status, 404),
        other => panic!("expected a client fault, got {other:?}"),
    }

    client.create_topic("dup", &TopicCreate::default()).unwrap();
    match client.create_topic("dup", &TopicCreate::default()).unwrap_err() {
        ClientError::Client { status, .. } => assert_eq!(status, 409),
        other => panic!("expected a client fault, got {other:?}"),
    }

    match client
        .create_subscription("s", &SubscriptionCreate::new("missing"))
        .unwrap_err()
    {
        ClientError::Client { status, .. } => assert_eq!(status, 400),
        other => panic!("expected a client fault, got {other:?}"),
    }

    // nothing is listening here, so no status is ever received
    let unreachable = Client::new("http://127.0.0.1:9").unwrap();
    assert!(matches!(
        unreachable.list_topics().unwrap_err(),
        ClientError::Transport(_)
    ));
}

#[test]
fn test_redelivery_over_the_wire() {
    let addr = start_server();
    let client = Client::new(&format!("http://{addr}")).unwrap();

    client.create_topic("t", &TopicCreate::default()).unwrap();
    client
        .create_subscription(
            "s",
            &SubscriptionCreate {
                topic: "t".to_string(),
                ack_deadline: Some(0),
                ttl: None,
                historical: None,
            },
        )
        .unwrap();
    client.publish_one("t", "task".to_string()).unwrap();

    let first = client.pull_one("s").unwrap();
    assert_eq!(first[0].tries, 0);

    // a zero ack deadline makes the reservation lapse immediately
    let second = client.pull_one("s").unwrap();
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].tries, 1);

    // with a zero deadline the reservation has always lapsed by the time
    // an ack arrives, so the ack is stale and confirms nothing
    let acked = client.ack_one("s", second[0].id).unwrap();
    assert!(acked.is_empty());
}
