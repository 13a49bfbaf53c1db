//! End-to-end tests exercising the gateway through its public entry points.
//!
//! The seeded catalog is reused with delays and fault injection stripped, so
//! every behavior under test is deterministic.

use std::sync::Arc;

use serde_json::{json, Value};

use biller_gateway::notify::{InMemoryHistory, LoggingNotifier};
use biller_gateway::types::transaction::{Transaction, TransactionStatus};
use biller_gateway::{
    BillerCatalog, Gateway, GatewayConfig, InMemoryBillerCatalog, InMemoryTransactionStore,
    ServiceRequest, ServiceResponse, TransactionStore,
};

async fn gateway() -> (Arc<Gateway>, Arc<InMemoryTransactionStore>) {
    let catalog = Arc::new(InMemoryBillerCatalog::seeded());
    for biller in catalog.all().await {
        catalog.upsert(biller.with_delay_ms(0).with_error_rate(0)).await;
    }
    let store = Arc::new(InMemoryTransactionStore::new());
    let gateway = Gateway::with_parts(
        GatewayConfig::default(),
        catalog,
        store.clone(),
        Arc::new(InMemoryHistory::new()),
        Arc::new(LoggingNotifier),
    );
    (Arc::new(gateway), store)
}

fn request(session_id: &str, params: Value) -> ServiceRequest {
    let mut req = ServiceRequest::new(session_id, "BILLPAY");
    if let Value::Object(map) = params {
        req.param_in = map.into_iter().collect();
    }
    req
}

fn pay_body(session_id: &str) -> String {
    json!({
        "SessionId": session_id,
        "ServiceId": "BILLPAY",
        "ParamIn": {
            "Operation": "PAY",
            "BillerCode": "EGY-GAS",
            "CustomerReference": "GZ1234567",
            "Amount": "120.50"
        }
    })
    .to_string()
}

#[tokio::test]
async fn inquire_returns_a_synthesized_electricity_bill() {
    let (gateway, _) = gateway().await;
    let responses = gateway
        .process(&request(
            "sess-1",
            json!({
                "Operation": "INQUIRE",
                "BillerCode": "EGY-ELECTRICITY",
                "CustomerReference": "12345678"
            }),
        ))
        .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status_code, "000");
    let out = responses[0].param_out.as_ref().unwrap();
    assert_eq!(out["BillerCode"], "EGY-ELECTRICITY");
    assert!(out["BillNumber"].as_str().unwrap().starts_with("INV"));
    assert!(out.get("DueAmount").is_some());
    assert!(out.get("DueDate").is_some());
}

#[tokio::test]
async fn recharge_inquiry_lists_operator_amounts() {
    let (gateway, _) = gateway().await;
    let responses = gateway
        .process(&request(
            "sess-1",
            json!({
                "Operation": "INQUIRE",
                "BillerCode": "EGY-VODAFONE",
                "PhoneNumber": "0111234567"
            }),
        ))
        .await;

    let out = responses[0].param_out.as_ref().unwrap();
    assert_eq!(out["AvailableAmounts"].as_array().unwrap().len(), 6);
    assert_eq!(out["MinAmount"], json!("10"));
    assert_eq!(out["MaxAmount"], json!("500"));
}

#[tokio::test]
async fn recharge_amount_outside_the_operator_set_is_rejected() {
    let (gateway, store) = gateway().await;
    let responses = gateway
        .process(&request(
            "sess-1",
            json!({
                "Operation": "PAY",
                "BillerCode": "EGY-ORANGE",
                "PhoneNumber": "0101234567",
                "Amount": "75"
            }),
        ))
        .await;

    assert_eq!(responses[0].status_code, "103");
    assert!(store.is_empty());
}

#[tokio::test]
async fn repeated_payment_session_is_settled_once() {
    let (gateway, store) = gateway().await;
    let body = pay_body("sess-replay");

    let first = gateway.handle_raw(&body).await;
    let second = gateway.handle_raw(&body).await;

    assert_eq!(first, second);
    assert_eq!(store.len(), 1);

    let responses: Vec<ServiceResponse> = serde_json::from_str(&first).unwrap();
    assert_eq!(responses[0].status_code, "000");
    let out = responses[0].param_out.as_ref().unwrap();
    assert!(out["ReceiptNumber"].as_str().unwrap().starts_with("REC"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_payments_settle_exactly_once() {
    let (gateway, store) = gateway().await;
    let body = pay_body("sess-race");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let body = body.clone();
            tokio::spawn(async move { gateway.handle_raw(&body).await })
        })
        .collect();

    let mut param_outs = Vec::new();
    for task in tasks {
        let raw = task.await.unwrap();
        let responses: Vec<ServiceResponse> = serde_json::from_str(&raw).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status_code, "000");
        param_outs.push(serde_json::to_string(&responses[0].param_out).unwrap());
    }

    assert_eq!(store.len(), 1);
    for out in &param_outs[1..] {
        assert_eq!(out, &param_outs[0]);
    }
}

#[tokio::test]
async fn cancel_flow_covers_success_repeat_and_unknown() {
    let (gateway, _) = gateway().await;
    let paid = gateway.process(&request(
        "sess-pay",
        json!({
            "Operation": "PAY",
            "BillerCode": "EGY-GAS",
            "CustomerReference": "GZ1234567",
            "Amount": "50"
        }),
    ))
    .await;
    let tx_id = paid[0].param_out.as_ref().unwrap()["TransactionId"]
        .as_str()
        .unwrap()
        .to_string();

    let cancel = request(
        "sess-cancel",
        json!({"Operation": "CANCEL", "TransactionId": tx_id}),
    );
    let responses = gateway.process(&cancel).await;
    assert_eq!(responses[0].status_code, "000");
    let out = responses[0].param_out.as_ref().unwrap();
    assert_eq!(out["Status"], "CANCELLED");
    assert!(out["CancelledAt"].is_string());

    // already cancelled
    let responses = gateway.process(&cancel).await;
    assert_eq!(responses[0].status_code, "206");

    // unknown transaction
    let responses = gateway
        .process(&request(
            "sess-x",
            json!({"Operation": "CANCEL", "TransactionId": "does-not-exist"}),
        ))
        .await;
    assert_eq!(responses[0].status_code, "205");
}

#[tokio::test]
async fn cancel_is_refused_after_24_hours() {
    let (gateway, store) = gateway().await;
    let mut stale = Transaction {
        transaction_id: "tx-old".to_string(),
        biller_code: "EGY-GAS".to_string(),
        biller_name: "Gaz d'Égypte".to_string(),
        customer_reference: Some("GZ1234567".to_string()),
        phone_number: None,
        amount: rust_decimal::Decimal::from(50),
        status: TransactionStatus::Completed,
        session_id: "sess-old".to_string(),
        service_id: "BILLPAY".to_string(),
        channel_id: "API".to_string(),
        group_transaction_id: None,
        receipt_number: None,
        failure_reason: None,
        created_at: chrono::Utc::now(),
        completed_at: None,
        cancelled_at: None,
        raw_request: None,
        raw_response: None,
    };
    stale.created_at = chrono::Utc::now() - chrono::Duration::hours(25);
    store.create(stale).await.unwrap();

    let responses = gateway
        .process(&request(
            "sess-1",
            json!({"Operation": "CANCEL", "TransactionId": "tx-old"}),
        ))
        .await;
    assert_eq!(responses[0].status_code, "206");
    assert!(responses[0].status_label.contains("older than 24 hours"));
}

#[tokio::test]
async fn batch_payment_reports_per_item_outcomes() {
    let (gateway, store) = gateway().await;
    let responses = gateway
        .process(&request(
            "sess-batch",
            json!({
                "Operation": "PAY_MULTIPLE",
                "Payments": [
                    {"BillerCode": "EGY-GAS", "CustomerReference": "GZ1234567", "Amount": "50"},
                    {"BillerCode": "EGY-GAS", "CustomerReference": "GZ7654321"},
                    {"BillerCode": "EGY-WATER", "CustomerReference": "AB123456", "Amount": "80"}
                ]
            }),
        ))
        .await;

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0].status_code, "002");
    let summary = responses[0].param_out.as_ref().unwrap();
    assert_eq!(summary["TotalPayments"], 3);
    assert_eq!(summary["SuccessCount"], 2);
    assert_eq!(summary["FailedCount"], 1);
    assert_eq!(responses[2].status_code, "101");
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn malformed_batch_payload_fails_fast() {
    let (gateway, store) = gateway().await;

    let responses = gateway
        .process(&request(
            "sess-1",
            json!({"Operation": "PAY_MULTIPLE", "Payments": "{broken"}),
        ))
        .await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status_code, "102");

    let responses = gateway
        .process(&request("sess-2", json!({"Operation": "PAY_MULTIPLE"})))
        .await;
    assert_eq!(responses[0].status_code, "101");
    assert!(store.is_empty());
}

#[tokio::test]
async fn multi_bill_inquiry_returns_a_short_history() {
    let (gateway, _) = gateway().await;
    let responses = gateway
        .process(&request(
            "sess-1",
            json!({
                "Operation": "INQUIRE_MULTIPLE",
                "BillerCode": "EGY-ELECTRICITY",
                "CustomerReference": "12345678"
            }),
        ))
        .await;

    assert_eq!(responses[0].status_code, "000");
    let out = responses[0].param_out.as_ref().unwrap();
    let count = out["BillCount"].as_u64().unwrap();
    assert!((2..=4).contains(&count));
    assert_eq!(out["Bills"].as_array().unwrap().len() as u64, count);
}

#[tokio::test]
async fn operation_errors_use_the_requested_language() {
    let (gateway, _) = gateway().await;

    let responses = gateway.process(&request("sess-1", json!({}))).await;
    assert_eq!(responses[0].status_code, "101");
    assert!(responses[0].status_label.starts_with("Paramètre manquant"));

    let mut english = request("sess-2", json!({}));
    english.language = Some("en".to_string());
    let responses = gateway.process(&english).await;
    assert!(responses[0].status_label.starts_with("Missing parameter"));

    let responses = gateway
        .process(&request("sess-3", json!({"Operation": "TRANSFER"})))
        .await;
    assert_eq!(responses[0].status_code, "102");
}
