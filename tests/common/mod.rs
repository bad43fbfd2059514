//! Common test utilities for integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};

use kitchen_api::payment::Charge;
use kitchen_api::store::{AccountStore, NewCustomer, NewStaff};
use kitchen_api::{
    crypto, routes, AppState, InMemoryOtpStore, Mailer, MemoryStore, PaymentGateway, TokenKeys,
};

/// Mock mailer that captures issued codes
#[derive(Default, Clone)]
pub struct MockMailer {
    /// Captured (email, code) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the last code sent to an email
    pub fn get_code(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, c)| c.clone())
    }
}

impl Mailer for MockMailer {
    fn send_otp(&self, email: &str, _name: &str, code: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Mock gateway with scriptable failure
#[derive(Default, Clone)]
pub struct MockGateway {
    fail: Arc<AtomicBool>,
    /// Captured (amount_minor, receipt) pairs
    pub charges: Arc<RwLock<Vec<(i64, String)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

impl PaymentGateway for MockGateway {
    fn create_charge(&self, amount_minor: i64, receipt: &str) -> Result<Charge, String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("gateway unavailable".to_string());
        }
        self.charges
            .write()
            .unwrap()
            .push((amount_minor, receipt.to_string()));
        Ok(Charge {
            reference: format!("pay_{}", receipt),
            amount_minor,
            currency: "INR".to_string(),
        })
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState<MemoryStore, MockMailer, MockGateway>>,
    pub mailer: MockMailer,
    pub gateway: MockGateway,
}

/// Create a test server over the in-memory store with mock collaborators
pub fn create_test_app() -> TestApp {
    let mailer = MockMailer::new();
    let gateway = MockGateway::new();

    let state = Arc::new(AppState::new(
        TokenKeys::from_secrets("test-customer-secret", "test-staff-secret"),
        MemoryStore::new(),
        Box::new(InMemoryOtpStore::new()),
        mailer.clone(),
        gateway.clone(),
    ));

    let server = TestServer::new(routes::create_router(state.clone()))
        .expect("Failed to create test server");

    TestApp {
        server,
        state,
        mailer,
        gateway,
    }
}

/// Authorization header for a bearer token
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

/// Seed a staff account directly and log it in, returning the token
pub async fn staff_token(app: &TestApp) -> String {
    let email = "admin@example.com";
    if app.state.store.get_staff_by_email(email).unwrap().is_none() {
        app.state
            .store
            .create_staff(NewStaff {
                username: "admin".to_string(),
                email: email.to_string(),
                password_hash: crypto::hash_password("adminpass1").unwrap(),
                name: None,
                phone_number: None,
            })
            .unwrap();
    }

    login(app, email, "adminpass1").await
}

/// Seed a customer account directly and log it in, returning the token
pub async fn customer_token(app: &TestApp, email: &str) -> String {
    if app
        .state
        .store
        .get_customer_by_email(email)
        .unwrap()
        .is_none()
    {
        app.state
            .store
            .create_customer(NewCustomer {
                name: "Test Customer".to_string(),
                email: email.to_string(),
                password_hash: crypto::hash_password("customerpass1").unwrap(),
                phone_number: None,
                location: None,
                home_address: None,
                role: "customer".to_string(),
            })
            .unwrap();
    }

    login(app, email, "customerpass1").await
}

/// Log in and return the issued token
pub async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    body["token"].as_str().expect("No token in response").to_string()
}

/// Place a cash-on-delivery order and return the response body
pub async fn place_cod_order(app: &TestApp, name: &str) -> Value {
    let response = app
        .server
        .post("/orders")
        .json(&json!({
            "name": name,
            "phone": "555",
            "address": "X",
            "method": "cashOnDelivery",
            "items": [{ "productId": 1, "qty": 2, "price": 50.0 }],
            "total": 100.0,
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}
