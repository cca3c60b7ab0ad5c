#![allow(dead_code)]

use coursepay::application::engine::{EngineDeps, PaymentEngine};
use coursepay::application::events::Event;
use coursepay::infrastructure::collaborators::{LogNotifier, RecordingEnrollment};
use coursepay::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryHistoryStore, InMemoryMethodStore, InMemoryPromoStore,
    InMemoryRefundStore, InMemoryTransactionStore,
};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// An engine over in-memory stores, with concrete store handles kept around
/// so tests can assert on persisted state directly.
pub struct Harness {
    pub engine: PaymentEngine,
    pub promos: InMemoryPromoStore,
    pub transactions: InMemoryTransactionStore,
    pub history: InMemoryHistoryStore,
    pub refunds: InMemoryRefundStore,
    pub enrollment: RecordingEnrollment,
}

pub fn harness() -> Harness {
    let promos = InMemoryPromoStore::new();
    let catalog = InMemoryCatalogStore::new();
    let transactions = InMemoryTransactionStore::new();
    let history = InMemoryHistoryStore::new();
    let refunds = InMemoryRefundStore::new();
    let methods = InMemoryMethodStore::new();
    let enrollment = RecordingEnrollment::new();

    let engine = PaymentEngine::new(EngineDeps {
        promos: Arc::new(promos.clone()),
        catalog: Arc::new(catalog.clone()),
        transactions: Arc::new(transactions.clone()),
        history: Arc::new(history.clone()),
        refunds: Arc::new(refunds.clone()),
        methods: Arc::new(methods.clone()),
        enrollment: Arc::new(enrollment.clone()),
        notifier: Arc::new(LogNotifier::new()),
    });

    Harness {
        engine,
        promos,
        transactions,
        history,
        refunds,
        enrollment,
    }
}

pub fn event(value: Value) -> Event {
    serde_json::from_value(value).expect("fixture event must deserialize")
}

/// Seeds the catalog and method config every suite starts from: two courses,
/// one bundle, one enabled bank_transfer method with a 10.00 minimum.
pub async fn seed_catalog(h: &Harness) {
    for value in [
        serde_json::json!({"op":"method","method":"bank_transfer","display_name":"Bank transfer","min_amount":"10.00"}),
        serde_json::json!({"op":"course","id":"rust-101","title":"Rust from zero","price":"100.00","duration_minutes":600}),
        serde_json::json!({"op":"course","id":"go-201","title":"Go services","price":"80.00","duration_minutes":480}),
        serde_json::json!({"op":"bundle","id":"starter","title":"Starter pack","price_override":"150.00","discount_percentage":"20","course_ids":["rust-101","go-201"]}),
    ] {
        h.engine.apply(event(value)).await.expect("seed event");
    }
}

pub fn submit_event(user: &str, target_id: &str, reference: &str, promo: Option<&str>) -> Event {
    let mut value = serde_json::json!({
        "op": "submit",
        "user": user,
        "target_type": "course",
        "target_id": target_id,
        "method": "bank_transfer",
        "reference": reference,
        "proof_url": format!("proofs/{reference}.png"),
    });
    if let Some(code) = promo {
        value["promo"] = Value::String(code.into());
    }
    event(value)
}

/// Writes a JSON-lines events fixture for CLI runs.
pub fn write_events(path: &Path, lines: &[Value]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
