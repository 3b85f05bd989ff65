//! End-to-end tests for the processing pipeline.
//!
//! Flow under test: queue message → parse → fetch raw ticket → enrich →
//! blob write → projection write → acknowledge. Queue, stores and gateway
//! are in-memory mocks implementing the production traits.

use std::time::Duration;

use integration_tests::fixtures::{self, CREATED_AT, ENRICHED_BUCKET, RAW_BUCKET};
use integration_tests::mocks::GatewayBehavior;
use integration_tests::setup::TestContext;
use ticket_core::limits::EMBEDDING_DIM;
use ticket_core::Urgency;
use tokio::sync::watch;
use worker::MessageOutcome;

fn assert_confidence(value: &serde_json::Value) {
    let c = value.as_f64().expect("confidence is a number");
    assert!((0.0..=1.0).contains(&c), "confidence {} out of range", c);
}

/// Raw ticket T-1 → blob `T-1.json` with enrichment, projection `(T-1, 1700000000)`.
#[tokio::test]
async fn test_example_ticket_end_to_end() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));

    let outcomes = ctx
        .run_batch(vec![fixtures::message("m1", fixtures::s3_event(RAW_BUCKET, &[&key]))])
        .await;
    assert_eq!(outcomes, vec![MessageOutcome::Acknowledged]);
    assert!(ctx.queue.is_deleted("m1"));

    let blob = ctx
        .blobs
        .object_json(ENRICHED_BUCKET, "T-1.json")
        .expect("enriched blob written");
    assert_eq!(blob["ticket_id"], "T-1");
    assert_eq!(blob["customer_id"], "C-1");
    assert_eq!(blob["metadata"]["source"], "email");
    assert_eq!(blob["metadata"]["language"], "en");

    let enrichment = &blob["enrichment"];
    assert!(enrichment["summary"].is_string());
    assert_confidence(&enrichment["intent_confidence"]);
    assert_confidence(&enrichment["urgency_confidence"]);
    assert_confidence(&enrichment["sentiment_confidence"]);
    assert_eq!(
        enrichment["embedding"].as_array().map(|v| v.len()),
        Some(EMBEDDING_DIM)
    );
    assert_eq!(enrichment["intent"], "login_issue");

    let row = ctx
        .projections
        .row("T-1", CREATED_AT)
        .expect("projection written");
    assert_eq!(row.s3_key, "T-1.json");
    assert_eq!(row.customer_id, "C-1");
    assert_eq!(row.subject, "Cannot login");

    assert_eq!(ctx.processor.stats().processed(), 1);
    assert_eq!(ctx.processor.stats().failed(), 0);
}

/// Redelivering the same unit overwrites both stores instead of adding rows.
#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    let body = fixtures::s3_event(RAW_BUCKET, &[&key]);

    ctx.handle(&fixtures::message("m1", body.clone())).await;
    let first_blob = ctx.blobs.object_json(ENRICHED_BUCKET, "T-1.json").unwrap();
    let first_row = ctx.projections.row("T-1", CREATED_AT).unwrap();

    ctx.handle(&fixtures::message("m1", body)).await;
    let second_blob = ctx.blobs.object_json(ENRICHED_BUCKET, "T-1.json").unwrap();
    let second_row = ctx.projections.row("T-1", CREATED_AT).unwrap();

    assert_eq!(ctx.projections.count(), 1);
    assert_eq!(ctx.blobs.count(ENRICHED_BUCKET), 1);
    assert_eq!(ctx.blobs.put_count(), 2);

    assert_eq!(first_row.intent, second_row.intent);
    assert_eq!(first_row.urgency, second_row.urgency);
    assert_eq!(first_row.sentiment, second_row.sentiment);
    assert_eq!(first_row.summary, second_row.summary);
    assert_eq!(
        first_blob["enrichment"]["embedding"],
        second_blob["enrichment"]["embedding"]
    );
    assert_eq!(ctx.processor.stats().processed(), 2);
}

/// One malformed message does not affect the rest of the batch.
#[tokio::test]
async fn test_batch_isolation() {
    let mut ctx = TestContext::new();
    let k1 = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    let k3 = ctx.seed_ticket(&fixtures::raw_ticket("T-3"));

    let outcomes = ctx
        .run_batch(vec![
            fixtures::message("m1", fixtures::s3_event(RAW_BUCKET, &[&k1])),
            fixtures::message("m2", "this is not json"),
            fixtures::message("m3", fixtures::s3_event(RAW_BUCKET, &[&k3])),
        ])
        .await;

    assert_eq!(
        outcomes,
        vec![
            MessageOutcome::Acknowledged,
            MessageOutcome::Retained,
            MessageOutcome::Acknowledged,
        ]
    );
    assert_eq!(ctx.queue.deleted(), vec!["m1".to_string(), "m3".to_string()]);
    assert!(ctx.projections.row("T-1", CREATED_AT).is_some());
    assert!(ctx.projections.row("T-3", CREATED_AT).is_some());
    assert_eq!(ctx.processor.stats().processed(), 2);
    assert_eq!(ctx.processor.stats().failed(), 1);
}

/// Direct `{"key": ..}` messages read from the configured raw bucket.
#[tokio::test]
async fn test_direct_key_uses_default_bucket() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-7"));

    let outcome = ctx.handle(&fixtures::message("m1", fixtures::direct_key(&key))).await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert!(ctx.projections.row("T-7", CREATED_AT).is_some());
}

/// Keys in S3 events arrive URL-encoded.
#[tokio::test]
async fn test_encoded_event_key() {
    let mut ctx = TestContext::new();
    let ticket = fixtures::raw_ticket("T-8");
    ctx.blobs
        .insert(RAW_BUCKET, "incoming/T 8.json", fixtures::to_bytes(&ticket));

    let outcome = ctx
        .handle(&fixtures::message(
            "m1",
            fixtures::s3_event(RAW_BUCKET, &["incoming/T+8.json"]),
        ))
        .await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert!(ctx.blobs.object(ENRICHED_BUCKET, "T-8.json").is_some());
}

/// Partition-style keys keep their `=` after decoding.
#[tokio::test]
async fn test_event_key_with_equals_sign() {
    let mut ctx = TestContext::new();
    let ticket = fixtures::raw_ticket("T-9");
    ctx.blobs
        .insert(RAW_BUCKET, "tenant=acme/T-9.json", fixtures::to_bytes(&ticket));

    let outcome = ctx
        .handle(&fixtures::message(
            "m1",
            fixtures::s3_event(RAW_BUCKET, &["tenant%3Dacme/T-9.json"]),
        ))
        .await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert!(ctx.blobs.object(ENRICHED_BUCKET, "T-9.json").is_some());
    assert!(ctx.projections.row("T-9", CREATED_AT).is_some());
}

/// A message with several records is processed unit by unit.
#[tokio::test]
async fn test_multi_unit_message() {
    let mut ctx = TestContext::new();
    let k1 = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    let k2 = ctx.seed_ticket(&fixtures::raw_ticket("T-2"));

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::s3_event(RAW_BUCKET, &[&k1, &k2])))
        .await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert_eq!(ctx.projections.count(), 2);
    assert_eq!(ctx.processor.stats().processed(), 2);
}

/// The S3 setup event carries no units and is simply acknowledged.
#[tokio::test]
async fn test_s3_test_event_is_acknowledged() {
    let mut ctx = TestContext::new();

    let outcome = ctx.handle(&fixtures::message("m1", fixtures::s3_test_event())).await;

    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert_eq!(ctx.blobs.put_count(), 0);
    assert_eq!(ctx.gateway.calls(), 0);
    assert_eq!(ctx.processor.stats().processed(), 0);
}

/// Every stored result has bounded confidences and a known urgency.
#[tokio::test]
async fn test_confidence_bounds() {
    let mut ctx = TestContext::new();
    let tickets = [
        fixtures::raw_ticket_with("T-1", "URGENT: site down", "Production outage, losing money!", None),
        fixtures::raw_ticket_with("T-2", "Feature idea", "Would love dark mode, nice to have.", None),
        fixtures::raw_ticket_with("T-3", "Thanks", "Great support, thank you!", Some("low")),
        fixtures::raw_ticket_with("T-4", "", "", None),
        fixtures::raw_ticket_with("T-5", "Refund", "I was charged twice for my invoice.", Some("high")),
    ];

    for (i, ticket) in tickets.iter().enumerate() {
        let key = ctx.seed_ticket(ticket);
        let outcome = ctx
            .handle(&fixtures::message(&format!("m{}", i), fixtures::direct_key(&key)))
            .await;
        assert_eq!(outcome, MessageOutcome::Acknowledged);
    }

    for ticket in &tickets {
        let id = ticket["ticket_id"].as_str().unwrap();
        let blob = ctx
            .blobs
            .object_json(ENRICHED_BUCKET, &format!("{}.json", id))
            .unwrap();
        let enrichment = &blob["enrichment"];
        assert_confidence(&enrichment["intent_confidence"]);
        assert_confidence(&enrichment["urgency_confidence"]);
        assert_confidence(&enrichment["sentiment_confidence"]);

        let urgency: Urgency = serde_json::from_value(enrichment["urgency"].clone()).unwrap();
        assert!(Urgency::ALL.contains(&urgency));
    }

    let t1 = ctx.projections.row("T-1", CREATED_AT).unwrap();
    assert_eq!(t1.urgency, Urgency::Critical);
    let t3 = ctx.projections.row("T-3", CREATED_AT).unwrap();
    assert_eq!(t3.urgency, Urgency::Low);
}

/// Projections are queryable by urgency.
#[tokio::test]
async fn test_projection_query_by_urgency() {
    use storage::ProjectionStore;

    let mut ctx = TestContext::new();
    let k1 = ctx.seed_ticket(&fixtures::raw_ticket_with("T-1", "Question", "How to export?", Some("critical")));
    let k2 = ctx.seed_ticket(&fixtures::raw_ticket_with("T-2", "Question", "How to import?", Some("low")));

    ctx.run_batch(vec![
        fixtures::message("m1", fixtures::direct_key(&k1)),
        fixtures::message("m2", fixtures::direct_key(&k2)),
    ])
    .await;

    let critical = ctx
        .projections
        .query_by_urgency(Urgency::Critical, 10)
        .await
        .unwrap();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].ticket_id, "T-1");
}

/// `run` drains the queue and stops on shutdown.
#[tokio::test]
async fn test_run_until_shutdown() {
    let ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.queue
        .push_batch(vec![fixtures::message("m1", fixtures::direct_key(&key))]);

    let queue = ctx.queue.clone();
    let mut processor = ctx.processor;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        processor.run(shutdown_rx).await.unwrap();
        processor
    });

    for _ in 0..100 {
        if queue.is_deleted("m1") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown_tx.send(true).unwrap();

    let processor = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("processor stops after shutdown")
        .unwrap();

    assert!(queue.is_deleted("m1"));
    assert_eq!(processor.stats().processed(), 1);
    assert_eq!(queue.pending_batches(), 0);
}

/// Shutdown during a message lets it finish and leaves the rest of the batch.
#[tokio::test]
async fn test_shutdown_mid_batch() {
    let ctx = TestContext::new();
    let k1 = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    let k2 = ctx.seed_ticket(&fixtures::raw_ticket("T-2"));
    ctx.gateway.set_behavior(GatewayBehavior::Hang);
    ctx.queue.push_batch(vec![
        fixtures::message("m1", fixtures::direct_key(&k1)),
        fixtures::message("m2", fixtures::direct_key(&k2)),
    ]);

    let queue = ctx.queue.clone();
    let gateway = ctx.gateway.clone();
    let mut processor = ctx.processor;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        processor.run(shutdown_rx).await.unwrap();
        processor
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();

    let processor = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("processor stops after shutdown")
        .unwrap();

    // m1 ran to its enrichment timeout; m2 was never started.
    assert_eq!(gateway.calls(), 1);
    assert!(queue.deleted().is_empty());
    assert_eq!(processor.stats().failed(), 1);
    assert_eq!(processor.stats().processed(), 0);
}

/// A queue that keeps failing does not stop the loop.
#[tokio::test]
async fn test_run_survives_poll_errors() {
    let ctx = TestContext::new();
    ctx.queue.set_fail_receive(true);

    let mut processor = ctx.processor;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { processor.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("processor stops after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
