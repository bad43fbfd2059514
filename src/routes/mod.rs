//! HTTP routes for the order backend

mod login;
mod orders;
mod register;
mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::email::Mailer;
use crate::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::Datastore;

/// Create the router with all routes
pub fn create_router<D, M, G>(state: Arc<AppState<D, M, G>>) -> Router
where
    D: Datastore + 'static,
    M: Mailer + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/mine", get(orders::my_orders))
        .route("/login", post(login::login))
        .route("/register", post(register::register_customer))
        .route("/verify-otp", post(register::verify_customer_otp))
        .route("/admin/send-otp", post(register::send_staff_otp))
        .route("/admin/verify-otp", post(register::verify_staff_otp))
        .route("/admin/session/start", post(session::start_session))
        .route("/admin/session/stop", post(session::stop_session))
        .route("/admin/session/status", get(session::session_status))
        .route("/admin/session/current", get(session::current_orders))
        .route("/admin/session/summary", get(session::session_summary))
        .route("/admin/orders/:id/mark-paid", post(orders::mark_paid))
        .route("/admin/orders/today", get(orders::orders_today))
        .route("/admin/orders/range", get(orders::orders_range))
        .route("/admin/orders/unreconciled", get(orders::unreconciled_orders))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
