//! Tests for login and the authentication gate

mod common;

use common::{bearer, create_test_app, customer_token, staff_token};
use serde_json::{json, Value};

use kitchen_api::crypto;
use kitchen_api::store::{AccountStore, NewCustomer};

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = create_test_app();
    customer_token(&app, "known@example.com").await;

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "known@example.com", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "unknown@example.com", "password": "whatever" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "known@example.com" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_login_reports_audience() {
    let app = create_test_app();

    customer_token(&app, "c@example.com").await;
    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "c@example.com", "password": "customerpass1" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["userType"], "customer");

    staff_token(&app).await;
    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "admin@example.com", "password": "adminpass1" }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["userType"], "staff");
    assert_eq!(body["account"]["username"], "admin");
}

#[tokio::test]
async fn test_customer_token_rejected_on_staff_routes() {
    let app = create_test_app();
    let token = customer_token(&app, "c@example.com").await;
    let header = bearer(&token);

    let response = app
        .server
        .get("/admin/session/status")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_garbage_token_unauthenticated() {
    let app = create_test_app();
    let header = bearer("garbage");

    let response = app
        .server
        .get("/orders/mine")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_staff_token_rejected_on_customer_route() {
    let app = create_test_app();
    let token = staff_token(&app).await;
    let header = bearer(&token);

    let response = app
        .server
        .get("/orders/mine")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 403);
}

/// A customer account whose role grants staff access gets an elevated
/// staff token at login
#[tokio::test]
async fn test_role_elevated_customer_reaches_staff_routes() {
    let app = create_test_app();

    app.state
        .store
        .create_customer(NewCustomer {
            name: "Manager".to_string(),
            email: "manager@example.com".to_string(),
            password_hash: crypto::hash_password("managerpass1").unwrap(),
            phone_number: None,
            location: None,
            home_address: None,
            role: "staff".to_string(),
        })
        .unwrap();

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "manager@example.com", "password": "managerpass1" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["userType"], "staff");

    let header = bearer(body["token"].as_str().unwrap());
    let response = app
        .server
        .get("/admin/session/status")
        .add_header(header.0, header.1)
        .await;
    assert_eq!(response.status_code(), 200);
}
