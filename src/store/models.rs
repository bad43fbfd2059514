//! Data models for the persistent store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique order identifier (assigned by the store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

/// Unique order-management-session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub i64);

/// Unique customer account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

/// Unique staff account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub i64);

/// How the customer intends to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    CashOnDelivery,
    UpiGpay,
    UpiPhonePe,
    GatewayOnline,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::UpiGpay => "upi_gpay",
            PaymentMethod::UpiPhonePe => "upi_phonepe",
            PaymentMethod::GatewayOnline => "gateway_online",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            "upi_gpay" => Some(PaymentMethod::UpiGpay),
            "upi_phonepe" => Some(PaymentMethod::UpiPhonePe),
            "gateway_online" => Some(PaymentMethod::GatewayOnline),
            _ => None,
        }
    }

    /// UPI methods carry a UPI identifier on the order
    pub fn is_upi(&self) -> bool {
        matches!(self, PaymentMethod::UpiGpay | PaymentMethod::UpiPhonePe)
    }
}

/// Payment state of an order. Only ever moves pending -> paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// State of an order-management session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Stopped => "stopped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "stopped" => Some(SessionStatus::Stopped),
            _ => None,
        }
    }
}

/// A customer purchase request
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: f64,
    pub customer_id: Option<CustomerId>,
    pub upi_id: Option<String>,
    /// Remote charge reference, set once the gateway accepts the charge
    pub gateway_reference: Option<String>,
    pub session_id: Option<SessionId>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

/// One line of a purchase. The unit price is copied at order time and
/// never re-read from the catalog.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_order: f64,
}

/// Input for creating an order together with its line items
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub customer_id: Option<CustomerId>,
    pub upi_id: Option<String>,
    pub session_id: Option<SessionId>,
    pub is_current: bool,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price: f64,
}

/// An order with its line items attached
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A bounded service window during which incoming orders are live
#[derive(Debug, Clone)]
pub struct OrderSession {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub created_by: StaffId,
}

/// Per-product quantity total within a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuantity {
    pub product_id: i64,
    pub quantity: i64,
}

/// Aggregate view of the active session's orders
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub products: Vec<ProductQuantity>,
    pub order_count: i64,
    pub customer_count: i64,
}

/// A customer account
#[derive(Debug, Clone)]
pub struct CustomerAccount {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub home_address: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A staff account
#[derive(Debug, Clone)]
pub struct StaffAccount {
    pub id: StaffId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for materializing a customer account
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub location: Option<String>,
    pub home_address: Option<String>,
    pub role: String,
}

/// Input for materializing a staff account
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
}
