//! In-memory storage implementation

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{
    AccountStore, CustomerAccount, CustomerId, NewCustomer, NewOrder, NewStaff, Order, OrderId,
    OrderItem, OrderSession, OrderStore, OrderWithItems, PaymentMethod, PaymentStatus,
    ProductQuantity, SessionId, SessionStatus, SessionStore, SessionSummary, StaffAccount,
    StaffId, StoreResult,
};
use crate::error::ApiError;

/// In-memory store backing tests and development runs
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    items: RwLock<HashMap<OrderId, Vec<OrderItem>>>,
    sessions: RwLock<HashMap<SessionId, OrderSession>>,
    customers: RwLock<HashMap<CustomerId, CustomerAccount>>,
    staff: RwLock<HashMap<StaffId, StaffAccount>>,
    next_order_id: AtomicI64,
    next_session_id: AtomicI64,
    next_customer_id: AtomicI64,
    next_staff_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            items: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            customers: RwLock::new(HashMap::new()),
            staff: RwLock::new(HashMap::new()),
            next_order_id: AtomicI64::new(1),
            next_session_id: AtomicI64::new(1),
            next_customer_id: AtomicI64::new(1),
            next_staff_id: AtomicI64::new(1),
        }
    }

    fn with_items(&self, order: Order) -> OrderWithItems {
        let items = self
            .items
            .read()
            .unwrap()
            .get(&order.id)
            .cloned()
            .unwrap_or_default();
        OrderWithItems { order, items }
    }

    fn collect_newest_first<F>(&self, filter: F) -> Vec<OrderWithItems>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap()
            .values()
            .filter(|o| filter(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        orders.into_iter().map(|o| self.with_items(o)).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore for MemoryStore {
    fn create_order(&self, new: NewOrder) -> StoreResult<Order> {
        let id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst));
        let order = Order {
            id,
            customer_name: new.customer_name,
            customer_phone: new.customer_phone,
            customer_address: new.customer_address,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            total: new.total,
            customer_id: new.customer_id,
            upi_id: new.upi_id,
            gateway_reference: None,
            session_id: new.session_id,
            is_current: new.is_current,
            created_at: Utc::now(),
        };
        let items: Vec<OrderItem> = new
            .items
            .into_iter()
            .map(|i| OrderItem {
                order_id: id,
                product_id: i.product_id,
                quantity: i.quantity,
                price_at_order: i.price,
            })
            .collect();

        self.orders.write().unwrap().insert(id, order.clone());
        self.items.write().unwrap().insert(id, items);
        Ok(order)
    }

    fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().unwrap().get(&id).cloned())
    }

    fn order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    fn orders_for_customer(&self, customer: CustomerId) -> StoreResult<Vec<OrderWithItems>> {
        Ok(self.collect_newest_first(|o| o.customer_id == Some(customer)))
    }

    fn mark_paid(&self, id: OrderId) -> StoreResult<Order> {
        let mut orders = self.orders.write().unwrap();
        let order = orders.get_mut(&id).ok_or(ApiError::NotFound("Order"))?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(ApiError::Conflict("Order is already paid".to_string()));
        }
        order.payment_status = PaymentStatus::Paid;
        Ok(order.clone())
    }

    fn set_gateway_reference(&self, id: OrderId, reference: &str) -> StoreResult<()> {
        let mut orders = self.orders.write().unwrap();
        let order = orders.get_mut(&id).ok_or(ApiError::NotFound("Order"))?;
        order.gateway_reference = Some(reference.to_string());
        Ok(())
    }

    fn orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<OrderWithItems>> {
        Ok(self.collect_newest_first(|o| o.created_at >= from && o.created_at < to))
    }

    fn session_orders(&self, session: SessionId) -> StoreResult<Vec<OrderWithItems>> {
        Ok(self.collect_newest_first(|o| o.session_id == Some(session)))
    }

    fn session_summary(&self, session: SessionId) -> StoreResult<SessionSummary> {
        let orders = self.session_orders(session)?;

        let mut quantities: HashMap<i64, i64> = HashMap::new();
        let mut customers: HashSet<String> = HashSet::new();
        for entry in &orders {
            customers.insert(entry.order.customer_name.clone());
            for item in &entry.items {
                *quantities.entry(item.product_id).or_insert(0) += item.quantity;
            }
        }

        let mut products: Vec<ProductQuantity> = quantities
            .into_iter()
            .map(|(product_id, quantity)| ProductQuantity {
                product_id,
                quantity,
            })
            .collect();
        products.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.product_id.cmp(&b.product_id)));

        Ok(SessionSummary {
            products,
            order_count: orders.len() as i64,
            customer_count: customers.len() as i64,
        })
    }

    fn unreconciled_orders(&self) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap()
            .values()
            .filter(|o| {
                o.payment_method == PaymentMethod::GatewayOnline
                    && o.payment_status == PaymentStatus::Pending
                    && o.gateway_reference.is_none()
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

impl SessionStore for MemoryStore {
    fn start_session(&self, admin: StaffId) -> StoreResult<OrderSession> {
        // Check and insert under a single write guard so two concurrent
        // starts cannot both observe "no active session".
        let mut sessions = self.sessions.write().unwrap();
        if sessions.values().any(|s| s.status == SessionStatus::Active) {
            return Err(ApiError::Conflict(
                "An order session is already active".to_string(),
            ));
        }
        let session = OrderSession {
            id: SessionId(self.next_session_id.fetch_add(1, Ordering::SeqCst)),
            start_time: Utc::now(),
            end_time: None,
            status: SessionStatus::Active,
            created_by: admin,
        };
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn stop_session(&self) -> StoreResult<OrderSession> {
        let stopped = {
            let mut sessions = self.sessions.write().unwrap();
            let active = sessions
                .values_mut()
                .find(|s| s.status == SessionStatus::Active)
                .ok_or_else(|| ApiError::Conflict("No active order session".to_string()))?;
            active.status = SessionStatus::Stopped;
            active.end_time = Some(Utc::now());
            active.clone()
        };

        // Sweep: orders tagged with this session are no longer current.
        let mut orders = self.orders.write().unwrap();
        for order in orders.values_mut() {
            if order.session_id == Some(stopped.id) {
                order.is_current = false;
            }
        }

        Ok(stopped)
    }

    fn active_session(&self) -> StoreResult<Option<OrderSession>> {
        Ok(self
            .sessions
            .read()
            .unwrap()
            .values()
            .find(|s| s.status == SessionStatus::Active)
            .cloned())
    }

    fn last_stopped_session(&self) -> StoreResult<Option<OrderSession>> {
        Ok(self
            .sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| s.status == SessionStatus::Stopped)
            .max_by_key(|s| (s.end_time, s.id.0))
            .cloned())
    }
}

impl AccountStore for MemoryStore {
    fn create_customer(&self, new: NewCustomer) -> StoreResult<CustomerId> {
        let normalized = new.email.to_lowercase();
        let mut customers = self.customers.write().unwrap();
        if customers.values().any(|c| c.email == normalized) {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        let id = CustomerId(self.next_customer_id.fetch_add(1, Ordering::SeqCst));
        customers.insert(
            id,
            CustomerAccount {
                id,
                name: new.name,
                email: normalized,
                password_hash: new.password_hash,
                phone_number: new.phone_number,
                location: new.location,
                home_address: new.home_address,
                role: new.role,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_customer_by_email(&self, email: &str) -> StoreResult<Option<CustomerAccount>> {
        let normalized = email.to_lowercase();
        Ok(self
            .customers
            .read()
            .unwrap()
            .values()
            .find(|c| c.email == normalized)
            .cloned())
    }

    fn create_staff(&self, new: NewStaff) -> StoreResult<StaffId> {
        let normalized = new.email.to_lowercase();
        let mut staff = self.staff.write().unwrap();
        if staff
            .values()
            .any(|s| s.email == normalized || s.username == new.username)
        {
            return Err(ApiError::Conflict(
                "Email or username already registered".to_string(),
            ));
        }
        let id = StaffId(self.next_staff_id.fetch_add(1, Ordering::SeqCst));
        staff.insert(
            id,
            StaffAccount {
                id,
                username: new.username,
                email: normalized,
                password_hash: new.password_hash,
                name: new.name,
                phone_number: new.phone_number,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_staff_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>> {
        let normalized = email.to_lowercase();
        Ok(self
            .staff
            .read()
            .unwrap()
            .values()
            .find(|s| s.email == normalized)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewOrderItem;

    fn new_order(session: Option<SessionId>, current: bool) -> NewOrder {
        NewOrder {
            customer_name: "A".to_string(),
            customer_phone: "555".to_string(),
            customer_address: "X".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
            total: 100.0,
            customer_id: None,
            upi_id: None,
            session_id: session,
            is_current: current,
            items: vec![NewOrderItem {
                product_id: 1,
                quantity: 2,
                price: 50.0,
            }],
        }
    }

    #[test]
    fn test_only_one_active_session() {
        let store = MemoryStore::new();

        store.start_session(StaffId(1)).unwrap();
        let second = store.start_session(StaffId(2));
        assert!(matches!(second, Err(ApiError::Conflict(_))));

        store.stop_session().unwrap();
        store.start_session(StaffId(1)).unwrap();
    }

    #[test]
    fn test_stop_without_active_session_conflicts() {
        let store = MemoryStore::new();
        assert!(matches!(store.stop_session(), Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_stop_sweep_clears_current_flag() {
        let store = MemoryStore::new();
        let session = store.start_session(StaffId(1)).unwrap();

        let tagged = store.create_order(new_order(Some(session.id), true)).unwrap();
        let untagged = store.create_order(new_order(None, false)).unwrap();

        store.stop_session().unwrap();

        assert!(!store.get_order(tagged.id).unwrap().unwrap().is_current);
        assert!(!store.get_order(untagged.id).unwrap().unwrap().is_current);
        assert_eq!(
            store.get_order(tagged.id).unwrap().unwrap().session_id,
            Some(session.id)
        );
    }

    #[test]
    fn test_mark_paid_is_monotone() {
        let store = MemoryStore::new();
        let order = store.create_order(new_order(None, false)).unwrap();

        let paid = store.mark_paid(order.id).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let again = store.mark_paid(order.id);
        assert!(matches!(again, Err(ApiError::Conflict(_))));
        assert_eq!(
            store.get_order(order.id).unwrap().unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_mark_paid_missing_order() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.mark_paid(OrderId(99)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_session_summary_sorted_by_quantity() {
        let store = MemoryStore::new();
        let session = store.start_session(StaffId(1)).unwrap();

        let mut first = new_order(Some(session.id), true);
        first.items = vec![
            NewOrderItem { product_id: 1, quantity: 1, price: 50.0 },
            NewOrderItem { product_id: 2, quantity: 5, price: 20.0 },
        ];
        let mut second = new_order(Some(session.id), true);
        second.customer_name = "B".to_string();
        second.items = vec![NewOrderItem { product_id: 1, quantity: 2, price: 50.0 }];

        store.create_order(first).unwrap();
        store.create_order(second).unwrap();

        let summary = store.session_summary(session.id).unwrap();
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.customer_count, 2);
        assert_eq!(summary.products[0].product_id, 2);
        assert_eq!(summary.products[0].quantity, 5);
        assert_eq!(summary.products[1].product_id, 1);
        assert_eq!(summary.products[1].quantity, 3);
    }
}
