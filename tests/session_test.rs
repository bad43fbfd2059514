//! Tests for order-management session control and aggregation

mod common;

use common::{bearer, create_test_app, place_cod_order, staff_token};
use serde_json::{json, Value};

#[tokio::test]
async fn test_session_requires_staff() {
    let app = create_test_app();

    let response = app.server.post("/admin/session/start").await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_start_stop_lifecycle() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    // Start
    let response = app
        .server
        .post("/admin/session/start")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["session"]["status"], "active");

    // Second start conflicts
    let response = app
        .server
        .post("/admin/session/start")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["code"], "conflict");

    // Status reflects the active session
    let response = app
        .server
        .get("/admin/session/status")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    let body: Value = response.json();
    assert_eq!(body["active"], true);
    assert!(body["startedAt"].is_string());

    // Stop
    let response = app
        .server
        .post("/admin/session/stop")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["session"]["status"], "stopped");
    assert!(body["session"]["endTime"].is_string());

    // Stop again conflicts
    let response = app
        .server
        .post("/admin/session/stop")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    assert_eq!(response.status_code(), 409);

    // Status now reports the stopped session
    let response = app
        .server
        .get("/admin/session/status")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    let body: Value = response.json();
    assert_eq!(body["active"], false);
    assert_eq!(body["lastSession"]["status"], "stopped");

    // A new session can start after the stop
    let response = app
        .server
        .post("/admin/session/start")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Orders are tagged at creation only: an order placed before the session
/// starts is never retroactively pulled in
#[tokio::test]
async fn test_tag_at_creation() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    let before = place_cod_order(&app, "Early").await;
    assert_eq!(before["isCurrent"], false);

    app.server
        .post("/admin/session/start")
        .add_header(header.0.clone(), header.1.clone())
        .await;

    let during = place_cod_order(&app, "OnTime").await;
    assert_eq!(during["isCurrent"], true);

    let response = app
        .server
        .get("/admin/session/current")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    let body: Value = response.json();
    assert_eq!(body["active"], true);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customerName"], "OnTime");

    // After the stop the sweep clears the flag but keeps the tag
    app.server
        .post("/admin/session/stop")
        .add_header(header.0.clone(), header.1.clone())
        .await;

    use kitchen_api::store::{OrderId, OrderStore};
    let swept = app
        .state
        .store
        .get_order(OrderId(during["orderId"].as_i64().unwrap()))
        .unwrap()
        .unwrap();
    assert!(!swept.is_current);
    assert!(swept.session_id.is_some());

    let early = app
        .state
        .store
        .get_order(OrderId(before["orderId"].as_i64().unwrap()))
        .unwrap()
        .unwrap();
    assert!(!early.is_current);
    assert!(early.session_id.is_none());
}

#[tokio::test]
async fn test_current_orders_empty_without_session() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    place_cod_order(&app, "A").await;

    let response = app
        .server
        .get("/admin/session/current")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["active"], false);
    assert_eq!(body["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_session_summary_aggregates() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    // No active session: explicit indicator, empty summary
    let response = app
        .server
        .get("/admin/session/summary")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    let body: Value = response.json();
    assert_eq!(body["active"], false);
    assert_eq!(body["orderCount"], 0);

    app.server
        .post("/admin/session/start")
        .add_header(header.0.clone(), header.1.clone())
        .await;

    app.server
        .post("/orders")
        .json(&json!({
            "name": "A",
            "phone": "555",
            "address": "X",
            "method": "cashOnDelivery",
            "items": [
                { "productId": 1, "qty": 1, "price": 50.0 },
                { "productId": 2, "qty": 4, "price": 20.0 },
            ],
            "total": 130.0,
        }))
        .await;
    app.server
        .post("/orders")
        .json(&json!({
            "name": "B",
            "phone": "556",
            "address": "Y",
            "method": "cashOnDelivery",
            "items": [{ "productId": 1, "qty": 2, "price": 50.0 }],
            "total": 100.0,
        }))
        .await;

    let response = app
        .server
        .get("/admin/session/summary")
        .add_header(header.0, header.1)
        .await;
    let body: Value = response.json();
    assert_eq!(body["active"], true);
    assert_eq!(body["orderCount"], 2);
    assert_eq!(body["customerCount"], 2);
    let products = body["products"].as_array().unwrap();
    assert_eq!(products[0]["productId"], 2);
    assert_eq!(products[0]["quantity"], 4);
    assert_eq!(products[1]["productId"], 1);
    assert_eq!(products[1]["quantity"], 3);
}

/// Simultaneous start attempts: exactly one wins
#[test]
fn test_concurrent_starts_single_winner() {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use kitchen_api::store::{MemoryStore, SessionStore, StaffId};

    let store = Arc::new(MemoryStore::new());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8i64)
        .map(|i| {
            let store = store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                store.start_session(StaffId(i)).is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .filter(|h| h.join().unwrap())
        .count();
    assert_eq!(successes, 1);
}
