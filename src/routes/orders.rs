//! Order intake, payment routing, and order reads

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Principal};
use crate::email::Mailer;
use crate::error::ApiError;
use crate::numbering::OrderNumbering;
use crate::payment::{to_minor_units, PaymentGateway};
use crate::state::AppState;
use crate::store::{
    CustomerId, Datastore, NewOrder, NewOrderItem, OrderId, OrderWithItems, PaymentMethod,
    PaymentStatus, ProductQuantity,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub upi_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub qty: i64,
    pub price: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: i64,
    pub order_number: String,
    pub payment_status: PaymentStatus,
    pub is_current: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
}

fn parse_method(s: &str) -> Result<PaymentMethod, ApiError> {
    match s {
        "cashOnDelivery" => Ok(PaymentMethod::CashOnDelivery),
        "upiGpay" => Ok(PaymentMethod::UpiGpay),
        "upiPhonePe" => Ok(PaymentMethod::UpiPhonePe),
        "gatewayOnline" => Ok(PaymentMethod::GatewayOnline),
        other => Err(ApiError::InvalidRequest(format!(
            "Unknown payment method: {}",
            other
        ))),
    }
}

fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{} is required", name)))
}

/// POST /orders
/// Create an order, tag it against the active session, and branch on the
/// payment method
pub async fn create_order<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError>
where
    D: Datastore + 'static,
    M: Mailer + 'static,
    G: PaymentGateway + 'static,
{
    let name = required(req.name, "name")?;
    let phone = required(req.phone, "phone")?;
    let address = required(req.address, "address")?;
    let method = parse_method(&required(req.method, "method")?)?;
    if req.items.is_empty() {
        return Err(ApiError::InvalidRequest("items must not be empty".to_string()));
    }
    let total = req
        .total
        .filter(|t| *t > 0.0)
        .ok_or_else(|| ApiError::InvalidRequest("total must be positive".to_string()))?;

    let upi_id = if method.is_upi() {
        Some(required(req.upi_id, "upiId")?)
    } else {
        None
    };

    // Snapshot of the active session at the instant of creation; the tag
    // is fixed here and only the stop sweep ever clears the flag.
    let active = state.store.active_session()?;
    let (session_id, is_current) = match &active {
        Some(session) => (Some(session.id), true),
        None => (None, false),
    };

    let order = state.store.create_order(NewOrder {
        customer_name: name,
        customer_phone: phone,
        customer_address: address,
        payment_method: method,
        total,
        customer_id: req.account_id.map(CustomerId),
        upi_id: upi_id.clone(),
        session_id,
        is_current,
        items: req
            .items
            .into_iter()
            .map(|i| NewOrderItem {
                product_id: i.product_id,
                quantity: i.qty,
                price: i.price,
            })
            .collect(),
    })?;

    tracing::info!(
        order_id = order.id.0,
        method = method.as_str(),
        total,
        session_id = ?session_id.map(|s| s.0),
        "Order created"
    );

    let mut gateway_reference = None;
    let message = match method {
        PaymentMethod::CashOnDelivery => {
            "Order placed. Payment pending; collect on delivery.".to_string()
        }
        PaymentMethod::UpiGpay | PaymentMethod::UpiPhonePe => {
            "Order placed. Complete the UPI payment to confirm.".to_string()
        }
        PaymentMethod::GatewayOnline => {
            // The order row is already committed; a gateway failure leaves
            // it pending for reconciliation rather than rolling it back.
            let amount = to_minor_units(total);
            let receipt = order.id.0.to_string();
            let task_state = state.clone();
            let charge = tokio::task::spawn_blocking(move || {
                task_state.gateway.create_charge(amount, &receipt)
            })
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::UpstreamFailure)?;

            state.store.set_gateway_reference(order.id, &charge.reference)?;
            gateway_reference = Some(charge.reference);
            "Order placed. Complete payment with the gateway reference.".to_string()
        }
    };

    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.id.0,
        order_number: state.numbering.display_number(order.id),
        payment_status: order.payment_status,
        is_current: order.is_current,
        message,
        gateway_reference,
        upi_id,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    pub session_id: Option<i64>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: i64,
    pub qty: i64,
    pub price: f64,
}

pub(crate) fn order_view(numbering: &dyn OrderNumbering, entry: OrderWithItems) -> OrderView {
    let OrderWithItems { order, items } = entry;
    OrderView {
        order_id: order.id.0,
        order_number: numbering.display_number(order.id),
        customer_name: order.customer_name,
        customer_phone: order.customer_phone,
        customer_address: order.customer_address,
        payment_method: order.payment_method,
        payment_status: order.payment_status,
        total: order.total,
        upi_id: order.upi_id,
        gateway_reference: order.gateway_reference,
        session_id: order.session_id.map(|s| s.0),
        is_current: order.is_current,
        created_at: order.created_at,
        items: items
            .into_iter()
            .map(|i| OrderItemView {
                product_id: i.product_id,
                qty: i.quantity,
                price: i.price_at_order,
            })
            .collect(),
    }
}

/// GET /orders/mine
/// The calling customer's orders, newest first
pub async fn my_orders<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    let principal = auth::require_customer(&state.keys, &headers)?;
    let customer_id = match principal {
        Principal::Customer { id, .. } => CustomerId(id),
        Principal::Staff { .. } => return Err(ApiError::Forbidden),
    };

    let orders = state.store.orders_for_customer(customer_id)?;
    Ok(Json(
        orders
            .into_iter()
            .map(|o| order_view(state.numbering.as_ref(), o))
            .collect(),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidResponse {
    pub success: bool,
    pub order_id: i64,
    pub payment_status: PaymentStatus,
}

/// POST /admin/orders/:id/mark-paid
/// The only transition out of `pending`
pub async fn mark_paid<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MarkPaidResponse>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let order = state.store.mark_paid(OrderId(id))?;
    tracing::info!(order_id = order.id.0, "Order marked paid");

    Ok(Json(MarkPaidResponse {
        success: true,
        order_id: order.id.0,
        payment_status: order.payment_status,
    }))
}

fn product_totals(orders: &[OrderWithItems]) -> Vec<ProductQuantity> {
    use std::collections::HashMap;

    let mut quantities: HashMap<i64, i64> = HashMap::new();
    for entry in orders {
        for item in &entry.items {
            *quantities.entry(item.product_id).or_insert(0) += item.quantity;
        }
    }

    let mut totals: Vec<ProductQuantity> = quantities
        .into_iter()
        .map(|(product_id, quantity)| ProductQuantity {
            product_id,
            quantity,
        })
        .collect();
    totals.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.product_id.cmp(&b.product_id)));
    totals
}

/// GET /admin/orders/today
/// Per-product quantity totals over today's orders
pub async fn orders_today<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductQuantity>>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let start = Utc::now()
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    let orders = state
        .store
        .orders_created_between(start, start + Duration::days(1))?;

    Ok(Json(product_totals(&orders)))
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: String,
    pub to: String,
}

/// GET /admin/orders/range?from=YYYY-MM-DD&to=YYYY-MM-DD
/// Per-product quantity totals over an inclusive date range
pub async fn orders_range<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductQuantity>>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);

    let orders = state.store.orders_created_between(start, end)?;
    Ok(Json(product_totals(&orders)))
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    s.parse::<NaiveDate>()
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid date: {}", s)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreconciledOrder {
    pub order_id: i64,
    pub order_number: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// GET /admin/orders/unreconciled
/// Gateway orders still pending with no charge reference; the manual
/// reconciliation worklist for partial gateway failures
pub async fn unreconciled_orders<D, M, G>(
    State(state): State<Arc<AppState<D, M, G>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UnreconciledOrder>>, ApiError>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    auth::require_staff(&state.keys, &state.store, &headers)?;

    let orders = state.store.unreconciled_orders()?;
    Ok(Json(
        orders
            .into_iter()
            .map(|o| UnreconciledOrder {
                order_id: o.id.0,
                order_number: state.numbering.display_number(o.id),
                total: o.total,
                created_at: o.created_at,
            })
            .collect(),
    ))
}
