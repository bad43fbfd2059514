//! Tests for the admin reporting reads

mod common;

use common::{bearer, create_test_app, staff_token};
use serde_json::{json, Value};

#[tokio::test]
async fn test_today_totals_per_product() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    app.server
        .post("/orders")
        .json(&json!({
            "name": "A",
            "phone": "555",
            "address": "X",
            "method": "cashOnDelivery",
            "items": [
                { "productId": 1, "qty": 2, "price": 50.0 },
                { "productId": 3, "qty": 6, "price": 10.0 },
            ],
            "total": 160.0,
        }))
        .await;
    app.server
        .post("/orders")
        .json(&json!({
            "name": "B",
            "phone": "556",
            "address": "Y",
            "method": "cashOnDelivery",
            "items": [{ "productId": 1, "qty": 1, "price": 50.0 }],
            "total": 50.0,
        }))
        .await;

    let response = app
        .server
        .get("/admin/orders/today")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 200);
    let totals: Value = response.json();
    let totals = totals.as_array().unwrap();
    assert_eq!(totals[0]["productId"], 3);
    assert_eq!(totals[0]["quantity"], 6);
    assert_eq!(totals[1]["productId"], 1);
    assert_eq!(totals[1]["quantity"], 3);
}

#[tokio::test]
async fn test_range_covers_today_and_validates_dates() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    app.server
        .post("/orders")
        .json(&json!({
            "name": "A",
            "phone": "555",
            "address": "X",
            "method": "cashOnDelivery",
            "items": [{ "productId": 9, "qty": 4, "price": 25.0 }],
            "total": 100.0,
        }))
        .await;

    let today = chrono::Utc::now().date_naive();
    let response = app
        .server
        .get(&format!("/admin/orders/range?from={}&to={}", today, today))
        .add_header(header.0.clone(), header.1.clone())
        .await;
    assert_eq!(response.status_code(), 200);
    let totals: Value = response.json();
    assert_eq!(totals[0]["productId"], 9);
    assert_eq!(totals[0]["quantity"], 4);

    // A range in the past is empty
    let response = app
        .server
        .get("/admin/orders/range?from=2000-01-01&to=2000-01-02")
        .add_header(header.0.clone(), header.1.clone())
        .await;
    let totals: Value = response.json();
    assert_eq!(totals.as_array().unwrap().len(), 0);

    // Unparseable dates are invalid requests
    let response = app
        .server
        .get("/admin/orders/range?from=yesterday&to=today")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_reporting_requires_staff() {
    let app = create_test_app();

    let response = app.server.get("/admin/orders/today").await;
    assert_eq!(response.status_code(), 401);

    let response = app.server.get("/admin/orders/unreconciled").await;
    assert_eq!(response.status_code(), 401);
}
