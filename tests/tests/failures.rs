//! Failure handling in the processing pipeline.
//!
//! Every unit-level failure must leave the message on the queue and must
//! never leave a projection without its blob.

use integration_tests::fixtures::{self, CREATED_AT, ENRICHED_BUCKET, RAW_BUCKET};
use integration_tests::mocks::GatewayBehavior;
use integration_tests::setup::TestContext;
use telemetry::metrics;
use ticket_core::{Error, ProcessingUnit};
use worker::MessageOutcome;

/// A message with one good and one missing unit is never acknowledged.
#[tokio::test]
async fn test_partial_success_is_not_acknowledged() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));

    let outcome = ctx
        .handle(&fixtures::message(
            "m1",
            fixtures::s3_event(RAW_BUCKET, &[&key, "T-missing.json"]),
        ))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert!(ctx.queue.deleted().is_empty());
    // The successful unit is persisted and will be overwritten on redelivery.
    assert!(ctx.projections.row("T-1", CREATED_AT).is_some());
    assert_eq!(ctx.processor.stats().processed(), 1);
    assert_eq!(ctx.processor.stats().failed(), 1);
}

/// A raw ticket without `customer_id` is a validation error with no writes.
#[tokio::test]
async fn test_schema_violation_writes_nothing() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket_without_customer("T-9"));

    let err = ctx
        .processor
        .process_unit(&ProcessingUnit::new(RAW_BUCKET, key.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.code(), "VALID_001");

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;
    assert_eq!(outcome, MessageOutcome::Retained);
    assert_eq!(ctx.blobs.put_count(), 0);
    assert_eq!(ctx.projections.count(), 0);
    assert_eq!(ctx.gateway.calls(), 0);
}

/// An explicit priority outside the four levels is rejected.
#[tokio::test]
async fn test_unknown_priority_is_rejected() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket_with("T-1", "s", "b", Some("urgent")));

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert_eq!(ctx.projections.count(), 0);
}

/// Missing raw object is a fetch error.
#[tokio::test]
async fn test_missing_object_is_fetch_error() {
    let ctx = TestContext::new();

    let err = ctx
        .processor
        .process_unit(&ProcessingUnit::new(RAW_BUCKET, "nope.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fetch(_)));
    assert!(err.is_unit_local());
}

/// Empty and malformed bodies are retained like any other failure.
#[tokio::test]
async fn test_unparseable_messages_are_retained() {
    let mut ctx = TestContext::new();

    for (i, body) in ["", "{not json", "{\"Records\": [{\"s3\": {}}]}", "{}"]
        .iter()
        .enumerate()
    {
        let outcome = ctx
            .handle(&fixtures::message(&format!("m{}", i), *body))
            .await;
        assert_eq!(outcome, MessageOutcome::Retained, "body {:?}", body);
    }

    assert!(ctx.queue.deleted().is_empty());
    assert_eq!(ctx.processor.stats().failed(), 4);
}

/// A projection failure after the blob write leaves only the blob.
#[tokio::test]
async fn test_projection_failure_leaves_blob_only() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.projections.set_fail_puts(true);

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert!(ctx.blobs.object(ENRICHED_BUCKET, "T-1.json").is_some());
    assert!(ctx.projections.row("T-1", CREATED_AT).is_none());

    // Redelivery after the table recovers completes the pair.
    ctx.projections.set_fail_puts(false);
    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;
    assert_eq!(outcome, MessageOutcome::Acknowledged);
    assert!(ctx.projections.row("T-1", CREATED_AT).is_some());
    assert_eq!(ctx.blobs.count(ENRICHED_BUCKET), 1);
}

/// A blob failure means the projection is never attempted.
#[tokio::test]
async fn test_blob_failure_writes_no_projection() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.blobs.set_fail_puts(true);

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert!(ctx.blobs.object(ENRICHED_BUCKET, "T-1.json").is_none());
    assert_eq!(ctx.projections.count(), 0);
}

/// Gateway errors fail the unit and write nothing.
#[tokio::test]
async fn test_gateway_failure_is_unit_local() {
    let mut ctx = TestContext::new();
    let k1 = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.gateway.set_behavior(GatewayBehavior::Fail);

    let err = ctx
        .processor
        .process_unit(&ProcessingUnit::new(RAW_BUCKET, k1.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Enrichment(_)));

    let outcomes = ctx
        .run_batch(vec![fixtures::message("m1", fixtures::direct_key(&k1))])
        .await;
    assert_eq!(outcomes, vec![MessageOutcome::Retained]);
    assert_eq!(ctx.blobs.put_count(), 0);

    ctx.gateway.set_behavior(GatewayBehavior::Normal);
    let outcomes = ctx
        .run_batch(vec![fixtures::message("m1", fixtures::direct_key(&k1))])
        .await;
    assert_eq!(outcomes, vec![MessageOutcome::Acknowledged]);
}

/// Results outside the contract are rejected before any write.
#[tokio::test]
async fn test_invalid_enrichment_is_rejected() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.gateway.set_behavior(GatewayBehavior::Invalid);

    let err = ctx
        .processor
        .process_unit(&ProcessingUnit::new(RAW_BUCKET, key))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Enrichment(_)));
    assert_eq!(ctx.blobs.put_count(), 0);
    assert_eq!(ctx.projections.count(), 0);
}

/// A gateway that never answers times out as an enrichment error.
#[tokio::test]
async fn test_gateway_timeout() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.gateway.set_behavior(GatewayBehavior::Hang);

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert_eq!(ctx.blobs.put_count(), 0);
    assert_eq!(ctx.processor.stats().failed(), 1);
}

/// A failed delete after full success keeps the message; stores hold the result.
#[tokio::test]
async fn test_delete_failure_retains_message() {
    let mut ctx = TestContext::new();
    let key = ctx.seed_ticket(&fixtures::raw_ticket("T-1"));
    ctx.queue.set_fail_delete(true);

    let outcome = ctx
        .handle(&fixtures::message("m1", fixtures::direct_key(&key)))
        .await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert!(ctx.projections.row("T-1", CREATED_AT).is_some());
    assert_eq!(ctx.processor.stats().processed(), 1);
}

/// Repeatedly delivered messages are counted as poison but still processed.
#[tokio::test]
async fn test_poison_message_is_reported() {
    let mut ctx = TestContext::new();
    let before = metrics().poison_messages.get();

    let mut message = fixtures::message("m1", "garbage");
    message.receive_count = Some(12);
    let outcome = ctx.handle(&message).await;

    assert_eq!(outcome, MessageOutcome::Retained);
    assert!(metrics().poison_messages.get() > before);
}

/// A failed receive surfaces as a queue error from `poll_once`.
#[tokio::test]
async fn test_poll_error() {
    let mut ctx = TestContext::new();
    ctx.queue.set_fail_receive(true);

    let err = ctx.processor.poll_once().await.unwrap_err();
    assert!(matches!(err, Error::Queue(_)));
}
