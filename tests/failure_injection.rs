//! Failure injection tests for the verifier service.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde_json::{json, Value};

use verifier_sdk::{VerificationStatus, VerifierClient, VerifyItemRequest};

mod common;

#[tokio::test]
async fn test_store_errors_are_retried_until_match() {
    let verifier = common::start_verifier(20, 10).await;
    verifier.mark_sold("art-1", "pi_1");
    verifier.store.fail_next(3);

    let client = VerifierClient::new(&verifier.base_url());
    let res = client
        .verify_item(&VerifyItemRequest {
            item_id: "art-1".into(),
            payment_intent_id: "pi_1".into(),
            max_attempts: None,
        })
        .await
        .expect("Verifier unreachable");

    assert_eq!(res.status, VerificationStatus::Confirmed);
    assert_eq!(res.attempts, 4, "Three injected failures then a match");

    verifier.shutdown.trigger();
}

#[tokio::test]
async fn test_store_down_for_every_attempt_is_pending_not_error() {
    let verifier = common::start_verifier(20, 5).await;
    verifier.mark_sold("art-1", "pi_1");
    verifier.store.fail_next(100);

    let res = common::client()
        .post(verifier.url("/api/v1/verify/item"))
        .json(&json!({ "item_id": "art-1", "payment_intent_id": "pi_1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["attempts"], 5);
    assert_eq!(verifier.store.reads(), 5);

    verifier.shutdown.trigger();
}

#[tokio::test]
async fn test_status_check_surfaces_store_failure() {
    let verifier = common::start_verifier(20, 10).await;
    verifier.store.fail_next(1);

    let res = common::client()
        .get(verifier.url("/api/v1/status/item/art-1?payment_intent_id=pi_1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("unavailable"));

    verifier.shutdown.trigger();
}

#[tokio::test]
async fn test_malformed_input_is_rejected_without_polling() {
    let verifier = common::start_verifier(20, 10).await;
    let client = common::client();

    let cases = [
        json!({ "item_id": "", "payment_intent_id": "pi_1" }),
        json!({ "item_id": "art-1", "payment_intent_id": "   " }),
        json!({ "item_id": "art/1", "payment_intent_id": "pi_1" }),
        json!({ "item_id": "art-1", "payment_intent_id": "pi_1", "max_attempts": 0 }),
        json!({ "item_id": "art-1", "payment_intent_id": "pi_1", "max_attempts": 50 }),
        json!({ "item_id": "art-1", "payment_intent_id": "pi_1", "max_attempts": u32::MAX }),
    ];
    for case in cases {
        let res = client
            .post(verifier.url("/api/v1/verify/item"))
            .json(&case)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "case: {}", case);
    }

    let res = client
        .post(verifier.url("/api/v1/verify/purchase"))
        .json(&json!({ "product_id": "art-1", "payment_intent_id": "pi_1", "buyer_id": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(verifier.store.reads(), 0, "Malformed input must not reach the store");

    verifier.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_verification() {
    let verifier = common::start_verifier(200, 50).await;
    let client = common::client();
    let url = verifier.url("/api/v1/verify/item");

    let started = Instant::now();
    let request = tokio::spawn(async move {
        client
            .post(url)
            .json(&json!({ "item_id": "art-1", "payment_intent_id": "pi_1" }))
            .send()
            .await
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    verifier.shutdown.trigger();

    let res = request.await.unwrap().expect("In-flight request should still be answered");
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cancelled");
    assert!(body["attempts"].as_u64().unwrap() >= 1);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "Cancellation should end the wait well before the attempt ceiling"
    );
}
