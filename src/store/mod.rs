//! Storage abstractions for the order backend

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for order and line-item storage
pub trait OrderStore: Send + Sync {
    /// Create an order together with its line items, atomically.
    /// The session tag and current flag are fixed here and never
    /// retroactively changed except by the stop sweep.
    fn create_order(&self, new: NewOrder) -> StoreResult<Order>;

    /// Get an order by id
    fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Line items of an order
    fn order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>>;

    /// Orders placed by a customer account, newest first
    fn orders_for_customer(&self, customer: CustomerId) -> StoreResult<Vec<OrderWithItems>>;

    /// The only transition out of `pending`. Fails `NotFound` if the order
    /// does not exist and `Conflict` if it is already paid.
    fn mark_paid(&self, id: OrderId) -> StoreResult<Order>;

    /// Attach the remote charge reference after gateway creation
    fn set_gateway_reference(&self, id: OrderId, reference: &str) -> StoreResult<()>;

    /// Orders created in `[from, to)`, newest first
    fn orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<OrderWithItems>>;

    /// Full order+items snapshot of a session, newest first
    fn session_orders(&self, session: SessionId) -> StoreResult<Vec<OrderWithItems>>;

    /// Per-product totals plus distinct order/customer counts for a session,
    /// sorted by quantity descending
    fn session_summary(&self, session: SessionId) -> StoreResult<SessionSummary>;

    /// Gateway orders still pending with no charge reference; the
    /// reconciliation view of partial gateway failures
    fn unreconciled_orders(&self) -> StoreResult<Vec<Order>>;
}

/// Trait for order-management-session storage.
///
/// Implementations must guarantee that at most one session is active at any
/// instant, even under concurrent `start_session` calls.
pub trait SessionStore: Send + Sync {
    /// Atomic check-then-insert. Fails `Conflict` if a session is already
    /// active.
    fn start_session(&self, admin: StaffId) -> StoreResult<OrderSession>;

    /// Close the active session and clear the current flag on every order
    /// tagged with it. Fails `Conflict` if no session is active. The sweep
    /// is skipped when the store does not carry the flag column.
    fn stop_session(&self) -> StoreResult<OrderSession>;

    /// The active session, if any
    fn active_session(&self) -> StoreResult<Option<OrderSession>>;

    /// The most recently stopped session, if any
    fn last_stopped_session(&self) -> StoreResult<Option<OrderSession>>;
}

/// Trait for customer and staff account storage
pub trait AccountStore: Send + Sync {
    fn create_customer(&self, new: NewCustomer) -> StoreResult<CustomerId>;

    fn get_customer_by_email(&self, email: &str) -> StoreResult<Option<CustomerAccount>>;

    fn create_staff(&self, new: NewStaff) -> StoreResult<StaffId>;

    fn get_staff_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>>;
}

/// Everything the application needs from a persistent store
pub trait Datastore: OrderStore + SessionStore + AccountStore {}

impl<T: OrderStore + SessionStore + AccountStore> Datastore for T {}
