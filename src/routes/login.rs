//! Unified login for customers and staff

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::crypto::verify_password;
use crate::email::Mailer;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::Datastore;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_type: &'static str,
    pub account: AccountView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// POST /login
/// Issues a token of the audience matching whichever directory holds the
/// email: staff directory first, then customers. A customer account whose
/// role grants staff access receives an elevated staff token.
pub async fn login<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let email = req
        .email
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("email is required".to_string()))?;
    let password = req
        .password
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("password is required".to_string()))?;

    if let Some(staff) = state.store.get_staff_by_email(&email)? {
        if !verify_password(&password, &staff.password_hash)
            .map_err(|e| ApiError::Internal(e.to_string()))?
        {
            return Err(ApiError::Unauthenticated);
        }

        let token = state
            .keys
            .issue_staff(staff.id.0, &staff.email, &staff.username)?;
        tracing::info!(staff_id = staff.id.0, "Staff login");

        return Ok(Json(LoginResponse {
            token,
            user_type: "staff",
            account: AccountView {
                id: staff.id.0,
                email: staff.email,
                name: staff.name,
                username: Some(staff.username),
                role: None,
            },
        }));
    }

    let customer = state
        .store
        .get_customer_by_email(&email)?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&password, &customer.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?
    {
        return Err(ApiError::Unauthenticated);
    }

    let (token, user_type) = if customer.role == "staff" {
        let token = state.keys.issue_elevated_staff(
            customer.id.0,
            &customer.email,
            &customer.name,
            &customer.role,
        )?;
        (token, "staff")
    } else {
        let token = state
            .keys
            .issue_customer(customer.id.0, &customer.email, &customer.role)?;
        (token, "customer")
    };

    tracing::info!(customer_id = customer.id.0, user_type, "Customer login");

    Ok(Json(LoginResponse {
        token,
        user_type,
        account: AccountView {
            id: customer.id.0,
            email: customer.email,
            name: Some(customer.name),
            username: None,
            role: Some(customer.role),
        },
    }))
}
