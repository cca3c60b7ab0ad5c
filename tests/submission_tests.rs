mod common;

use coursepay::domain::ports::TransactionStore;
use coursepay::domain::transaction::{TransactionStatus, VerificationStatus};
use coursepay::error::PaymentError;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_submission_creates_pending_record() {
    let h = common::harness();
    common::seed_catalog(&h).await;

    h.engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await
        .unwrap();

    let tx = h.transactions.get(1).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.verification_status, VerificationStatus::Pending);
    assert_eq!(tx.original_amount, dec!(100.00));
    assert_eq!(tx.discount_amount, dec!(0));
    assert_eq!(tx.amount, dec!(100.00));
}

#[tokio::test]
async fn test_promo_discount_applied_on_submission() {
    let h = common::harness();
    common::seed_catalog(&h).await;
    h.engine
        .apply(common::event(json!({
            "op":"promo","code":"SUMMER10","discount_type":"percentage",
            "discount_value":"10","applicable_type":"all","max_uses":1
        })))
        .await
        .unwrap();

    h.engine
        .apply(common::submit_event(
            "learner-1",
            "rust-101",
            "REF-1",
            Some("SUMMER10"),
        ))
        .await
        .unwrap();

    let tx = h.transactions.get(1).await.unwrap().unwrap();
    assert_eq!(tx.original_amount, dec!(100.00));
    assert_eq!(tx.discount_amount, dec!(10.00));
    assert_eq!(tx.amount, dec!(90.00));
    assert_eq!(tx.promo_code.as_deref(), Some("SUMMER10"));
}

#[tokio::test]
async fn test_bundle_priced_from_override() {
    let h = common::harness();
    common::seed_catalog(&h).await;

    h.engine
        .apply(common::event(json!({
            "op":"submit","user":"learner-1","target_type":"bundle","target_id":"starter",
            "method":"bank_transfer","reference":"REF-1","proof_url":"proofs/1.png"
        })))
        .await
        .unwrap();

    // 150.00 override minus 20%, not the 180.00 component sum.
    let tx = h.transactions.get(1).await.unwrap().unwrap();
    assert_eq!(tx.amount, dec!(120.00));
}

#[tokio::test]
async fn test_amount_below_method_minimum_creates_no_record() {
    let h = common::harness();
    common::seed_catalog(&h).await;
    h.engine
        .apply(common::event(json!({
            "op":"course","id":"cheap","title":"Cheap","price":"5.00","duration_minutes":30
        })))
        .await
        .unwrap();

    let err = h
        .engine
        .apply(common::submit_event("learner-1", "cheap", "REF-1", None))
        .await;
    assert!(matches!(err, Err(PaymentError::AmountOutOfRange { .. })));
    assert!(h.transactions.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_processing_fee_counts_toward_window() {
    let h = common::harness();
    common::seed_catalog(&h).await;
    // 3% fee and a 100.00 ceiling: a 99.00 course fits the window alone but
    // not once the fee lands on top.
    h.engine
        .apply(common::event(json!({
            "op":"method","method":"card","display_name":"Card",
            "max_amount":"100.00","processing_fee_percent":"3"
        })))
        .await
        .unwrap();
    h.engine
        .apply(common::event(json!({
            "op":"course","id":"edge","title":"Edge","price":"99.00","duration_minutes":60
        })))
        .await
        .unwrap();

    let err = h
        .engine
        .apply(common::event(json!({
            "op":"submit","user":"learner-1","target_type":"course","target_id":"edge",
            "method":"card","reference":"REF-1","proof_url":"proofs/1.png"
        })))
        .await;
    assert!(matches!(err, Err(PaymentError::AmountOutOfRange { .. })));
}

#[tokio::test]
async fn test_disabled_method_rejected() {
    let h = common::harness();
    common::seed_catalog(&h).await;
    h.engine
        .apply(common::event(json!({
            "op":"method","method":"paypal","display_name":"PayPal","is_enabled":false
        })))
        .await
        .unwrap();

    let err = h
        .engine
        .apply(common::event(json!({
            "op":"submit","user":"learner-1","target_type":"course","target_id":"rust-101",
            "method":"paypal","reference":"REF-1","proof_url":"proofs/1.png"
        })))
        .await;
    assert!(matches!(err, Err(PaymentError::Validation(_))));
    assert!(h.transactions.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_method_and_unpublished_course() {
    let h = common::harness();
    common::seed_catalog(&h).await;
    h.engine
        .apply(common::event(json!({
            "op":"course","id":"draft","title":"Draft","price":"50.00",
            "duration_minutes":60,"is_published":false
        })))
        .await
        .unwrap();

    let err = h
        .engine
        .apply(common::event(json!({
            "op":"submit","user":"learner-1","target_type":"course","target_id":"rust-101",
            "method":"crypto","reference":"REF-1","proof_url":"proofs/1.png"
        })))
        .await;
    assert!(matches!(err, Err(PaymentError::NotFound(_))));

    let err = h
        .engine
        .apply(common::submit_event("learner-1", "draft", "REF-2", None))
        .await;
    assert!(matches!(err, Err(PaymentError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_pending_submission_conflicts() {
    let h = common::harness();
    common::seed_catalog(&h).await;

    h.engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await
        .unwrap();
    let err = h
        .engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await;
    assert!(matches!(err, Err(PaymentError::Conflict(_))));
    assert_eq!(h.transactions.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_then_resubmit() {
    let h = common::harness();
    common::seed_catalog(&h).await;

    h.engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await
        .unwrap();
    h.engine
        .apply(common::event(json!({"op":"cancel","tx":1,"user":"learner-1"})))
        .await
        .unwrap();

    let tx = h.transactions.get(1).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Cancelled);
    assert_eq!(tx.verification_status, VerificationStatus::Pending);

    // The cancelled row is terminal, so the same reference may be reused.
    h.engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await
        .unwrap();

    // And the cancelled row cannot be decided afterwards.
    let err = h
        .engine
        .apply(common::event(json!({"op":"approve","tx":1,"admin":"admin-1"})))
        .await;
    assert!(matches!(err, Err(PaymentError::InvalidStateTransition(_))));
}

#[tokio::test]
async fn test_cancel_requires_owner() {
    let h = common::harness();
    common::seed_catalog(&h).await;

    h.engine
        .apply(common::submit_event("learner-1", "rust-101", "REF-1", None))
        .await
        .unwrap();
    let err = h
        .engine
        .apply(common::event(json!({"op":"cancel","tx":1,"user":"learner-2"})))
        .await;
    assert!(matches!(err, Err(PaymentError::Validation(_))));
}
