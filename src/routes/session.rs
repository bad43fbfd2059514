//! Order-management session endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{self, Principal};
use crate::email::Mailer;
use crate::error::ApiError;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::{Datastore, OrderSession, ProductQuantity, SessionStatus, StaffId};

use super::orders::{order_view, OrderView};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

impl From<OrderSession> for SessionView {
    fn from(session: OrderSession) -> Self {
        Self {
            id: session.id.0,
            start_time: session.start_time,
            end_time: session.end_time,
            status: session.status,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActionResponse {
    pub success: bool,
    pub session: SessionView,
}

/// POST /admin/session/start
pub async fn start_session<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<SessionActionResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let principal = auth::require_staff(&state.keys, &state.store, &headers)?;
    let admin_id = match principal {
        Principal::Staff { id, .. } => StaffId(id),
        Principal::Customer { .. } => return Err(ApiError::Forbidden),
    };

    let session = state.store.start_session(admin_id)?;
    tracing::info!(session_id = session.id.0, admin_id = admin_id.0, "Order session started");

    Ok(Json(SessionActionResponse {
        success: true,
        session: session.into(),
    }))
}

/// POST /admin/session/stop
pub async fn stop_session<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<SessionActionResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let session = state.store.stop_session()?;
    tracing::info!(session_id = session.id.0, "Order session stopped");

    Ok(Json(SessionActionResponse {
        success: true,
        session: session.into(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session: Option<SessionView>,
}

/// GET /admin/session/status
pub async fn session_status<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<SessionStatusResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let active = state.store.active_session()?;
    let last = state.store.last_stopped_session()?;

    Ok(Json(SessionStatusResponse {
        active: active.is_some(),
        started_at: active.map(|s| s.start_time),
        last_session: last.map(SessionView::from),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentOrdersResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    pub orders: Vec<OrderView>,
}

/// GET /admin/session/current
/// Snapshot of the active session's orders, newest first; empty when no
/// session is active
pub async fn current_orders<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<CurrentOrdersResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let active = match state.store.active_session()? {
        Some(session) => session,
        None => {
            return Ok(Json(CurrentOrdersResponse {
                active: false,
                session_id: None,
                orders: Vec::new(),
            }))
        }
    };

    let orders = state.store.session_orders(active.id)?;
    Ok(Json(CurrentOrdersResponse {
        active: true,
        session_id: Some(active.id.0),
        orders: orders
            .into_iter()
            .map(|o| order_view(state.numbering.as_ref(), o))
            .collect(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryResponse {
    pub active: bool,
    pub products: Vec<ProductQuantity>,
    pub order_count: i64,
    pub customer_count: i64,
}

/// GET /admin/session/summary
pub async fn session_summary<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<SessionSummaryResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let active = match state.store.active_session()? {
        Some(session) => session,
        None => {
            return Ok(Json(SessionSummaryResponse {
                active: false,
                products: Vec::new(),
                order_count: 0,
                customer_count: 0,
            }))
        }
    };

    let summary = state.store.session_summary(active.id)?;
    Ok(Json(SessionSummaryResponse {
        active: true,
        products: summary.products,
        order_count: summary.order_count,
        customer_count: summary.customer_count,
    }))
}
