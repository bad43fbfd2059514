//! OTP-gated registration endpoints
//!
//! Two-phase account creation: a durable account row is only ever written
//! after the caller proves possession of the email address.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::crypto::{generate_otp_code, hash_password};
use crate::email::Mailer;
use crate::error::ApiError;
use crate::otp::{OtpClaim, OtpKey, OtpKind, OtpPayload, OtpRecord};
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{Datastore, NewCustomer, NewStaff};

/// Minimum password length
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
const MAX_PASSWORD_LENGTH: usize = 80;

fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{} is required", name)))
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::InvalidRequest(format!(
            "Password too short (minimum {} characters)",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::InvalidRequest(format!(
            "Password too long (maximum {} characters)",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct OtpIssuedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct OtpVerifiedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub home_address: Option<String>,
}

/// POST /register
/// Issue a registration code for a new customer account
pub async fn register_customer<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Json(req): Json<RegisterCustomerRequest>,
) -> Result<Json<OtpIssuedResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let name = required(req.name, "name")?;
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;
    validate_password(&password)?;

    if state.store.get_customer_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    issue_code(
        &state,
        OtpKey::new(&email, OtpKind::CustomerSignup),
        &email,
        &name,
        OtpPayload::Customer {
            name: name.clone(),
            email: email.clone(),
            password,
            phone_number: req.phone_number,
            location: req.location,
            home_address: req.home_address,
        },
    )?;

    Ok(Json(OtpIssuedResponse {
        success: true,
        message: "OTP sent to your email. Enter it to complete registration.".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

/// POST /verify-otp
/// Verify the code and materialize the customer account
pub async fn verify_customer_otp<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerifiedResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let email = required(req.email, "email")?;
    let otp = required(req.otp, "otp")?;

    let payload = claim_code(&state, OtpKey::new(&email, OtpKind::CustomerSignup), &otp)?;

    let (name, email, password, phone_number, location, home_address) = match payload {
        OtpPayload::Customer {
            name,
            email,
            password,
            phone_number,
            location,
            home_address,
        } => (name, email, password, phone_number, location, home_address),
        OtpPayload::Staff { .. } => {
            return Err(ApiError::Internal("Mismatched OTP payload".to_string()))
        }
    };

    let password_hash = hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let id = state.store.create_customer(NewCustomer {
        name,
        email: email.clone(),
        password_hash,
        phone_number,
        location,
        home_address,
        role: "customer".to_string(),
    })?;

    tracing::info!(customer_id = id.0, email = %email, "Customer account created");

    Ok(Json(OtpVerifiedResponse {
        success: true,
        message: "Registration successful. You can now log in.".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStaffRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// POST /admin/send-otp
/// Issue a registration code for a new staff account (staff only)
pub async fn send_staff_otp<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
    Json(req): Json<RegisterStaffRequest>,
) -> Result<Json<OtpIssuedResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let username = required(req.username, "username")?;
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;
    validate_password(&password)?;

    if state.store.get_staff_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let display_name = req.name.clone().unwrap_or_else(|| username.clone());
    issue_code(
        &state,
        OtpKey::new(&email, OtpKind::StaffSignup),
        &email,
        &display_name,
        OtpPayload::Staff {
            username,
            email: email.clone(),
            password,
            name: req.name,
            phone_number: req.phone_number,
        },
    )?;

    Ok(Json(OtpIssuedResponse {
        success: true,
        message: "OTP sent. Enter it to complete staff registration.".to_string(),
    }))
}

/// POST /admin/verify-otp
/// Verify the code and materialize the staff account (staff only)
pub async fn verify_staff_otp<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerifiedResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let email = required(req.email, "email")?;
    let otp = required(req.otp, "otp")?;

    let payload = claim_code(&state, OtpKey::new(&email, OtpKind::StaffSignup), &otp)?;

    let (username, email, password, name, phone_number) = match payload {
        OtpPayload::Staff {
            username,
            email,
            password,
            name,
            phone_number,
        } => (username, email, password, name, phone_number),
        OtpPayload::Customer { .. } => {
            return Err(ApiError::Internal("Mismatched OTP payload".to_string()))
        }
    };

    let password_hash = hash_password(&password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let id = state.store.create_staff(NewStaff {
        username,
        email: email.clone(),
        password_hash,
        name,
        phone_number,
    })?;

    tracing::info!(staff_id = id.0, email = %email, "Staff account created");

    Ok(Json(OtpVerifiedResponse {
        success: true,
        message: "Staff registration successful.".to_string(),
    }))
}

fn issue_code<D, M, G>(
    state: &AppState<D, M, G>,
    key: OtpKey,
    email: &str,
    name: &str,
    payload: OtpPayload,
) -> Result<(), ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let code = generate_otp_code();
    // Last-issued-wins: a reissue replaces any unconsumed record.
    state.otp.put(
        key,
        OtpRecord {
            code: code.clone(),
            issued_at: Utc::now(),
            payload,
        },
    );

    tracing::info!(email = %email, "Registration code issued");

    state
        .mailer
        .send_otp(email, name, &code)
        .map_err(ApiError::UpstreamFailure)
}

fn claim_code<D, M, G>(
    state: &AppState<D, M, G>,
    key: OtpKey,
    code: &str,
) -> Result<OtpPayload, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    match state.otp.consume(&key, code, Utc::now()) {
        OtpClaim::Matched(payload) => Ok(payload),
        OtpClaim::Missing => Err(ApiError::NotFound("Verification code")),
        OtpClaim::Expired => Err(ApiError::Expired(
            "OTP has expired. Request a new one.".to_string(),
        )),
        OtpClaim::Mismatch => Err(ApiError::InvalidRequest(
            "Invalid OTP. Check and try again.".to_string(),
        )),
    }
}
