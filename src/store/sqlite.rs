//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    AccountStore, CustomerAccount, CustomerId, NewCustomer, NewOrder, NewStaff, Order, OrderId,
    OrderItem, OrderSession, OrderStore, OrderWithItems, PaymentMethod, PaymentStatus,
    ProductQuantity, SessionId, SessionStatus, SessionStore, SessionSummary, StaffAccount,
    StaffId, StoreResult,
};
use crate::error::ApiError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const ORDER_COLUMNS: &str = "id, customer_name, customer_phone, customer_address, \
     payment_method, payment_status, total_price, customer_id, upi_id, \
     gateway_reference, session_id, is_current_order, created_at";

/// SQLite-based store implementing the order, session, and account traits
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Whether the orders table carries the current-order flag column.
    /// Checked once at open; the stop sweep is skipped when absent.
    has_current_flag: bool,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(|e| ApiError::Internal(e.to_string()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Self::migrate(&conn)?;

        let has_current_flag = Self::has_column(&conn, "orders", "is_current_order")?;
        if !has_current_flag {
            tracing::warn!("orders table has no is_current_order column; stop sweep disabled");
        }

        Ok(Self {
            conn: Mutex::new(conn),
            has_current_flag,
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Customer accounts
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                phone_number TEXT,
                location TEXT,
                home_address TEXT,
                role TEXT NOT NULL DEFAULT 'customer',
                created_at TEXT NOT NULL
            );

            -- Staff accounts
            CREATE TABLE IF NOT EXISTS staff (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT,
                phone_number TEXT,
                created_at TEXT NOT NULL
            );

            -- Order-management sessions. created_by is a plain principal
            -- id, not an FK: the acting staff principal may be an elevated
            -- customer account.
            CREATE TABLE IF NOT EXISTS order_management_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_by INTEGER NOT NULL
            );
            -- At most one active session, enforced by the store itself
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_single_active
                ON order_management_sessions(status) WHERE status = 'active';

            -- Orders
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                customer_address TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                payment_status TEXT NOT NULL DEFAULT 'pending',
                total_price REAL NOT NULL,
                customer_id INTEGER REFERENCES customers(id),
                upi_id TEXT,
                gateway_reference TEXT,
                session_id INTEGER REFERENCES order_management_sessions(id),
                is_current_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_session ON orders(session_id);
            CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
            CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at);

            -- Order line items
            CREATE TABLE IF NOT EXISTS order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                product_id INTEGER NOT NULL,
                quantity INTEGER NOT NULL,
                price_at_time REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);
            "#,
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(())
    }

    fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, ApiError> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| ApiError::Internal(e.to_string()))? {
            let name: String = row.get(1).map_err(|e| ApiError::Internal(e.to_string()))?;
            if name == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn row_to_order(row: &Row<'_>) -> rusqlite::Result<Order> {
        let id: i64 = row.get(0)?;
        let method: String = row.get(4)?;
        let status: String = row.get(5)?;
        let customer_id: Option<i64> = row.get(7)?;
        let session_id: Option<i64> = row.get(10)?;
        let is_current: i64 = row.get(11)?;
        let created_at: String = row.get(12)?;
        Ok(Order {
            id: OrderId(id),
            customer_name: row.get(1)?,
            customer_phone: row.get(2)?,
            customer_address: row.get(3)?,
            payment_method: PaymentMethod::from_str(&method)
                .unwrap_or(PaymentMethod::CashOnDelivery),
            payment_status: PaymentStatus::from_str(&status).unwrap_or(PaymentStatus::Pending),
            total: row.get(6)?,
            customer_id: customer_id.map(CustomerId),
            upi_id: row.get(8)?,
            gateway_reference: row.get(9)?,
            session_id: session_id.map(SessionId),
            is_current: is_current != 0,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_session(row: &Row<'_>) -> rusqlite::Result<OrderSession> {
        let id: i64 = row.get(0)?;
        let start_time: String = row.get(1)?;
        let end_time: Option<String> = row.get(2)?;
        let status: String = row.get(3)?;
        let created_by: i64 = row.get(4)?;
        Ok(OrderSession {
            id: SessionId(id),
            start_time: parse_timestamp(&start_time),
            end_time: end_time.as_deref().map(parse_timestamp),
            status: SessionStatus::from_str(&status).unwrap_or(SessionStatus::Stopped),
            created_by: StaffId(created_by),
        })
    }

    fn query_orders(&self, where_clause: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<Order>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS, where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let orders = stmt
            .query_map(args, Self::row_to_order)
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(orders)
    }

    fn attach_items(&self, orders: Vec<Order>) -> StoreResult<Vec<OrderWithItems>> {
        orders
            .into_iter()
            .map(|order| {
                let items = self.order_items(order.id)?;
                Ok(OrderWithItems { order, items })
            })
            .collect()
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl OrderStore for SqliteStore {
    fn create_order(&self, new: NewOrder) -> StoreResult<Order> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO orders (customer_name, customer_phone, customer_address, \
             payment_method, payment_status, total_price, customer_id, upi_id, \
             session_id, is_current_order, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                new.customer_name,
                new.customer_phone,
                new.customer_address,
                new.payment_method.as_str(),
                PaymentStatus::Pending.as_str(),
                new.total,
                new.customer_id.map(|c| c.0),
                new.upi_id,
                new.session_id.map(|s| s.0),
                new.is_current as i64,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        let id = tx.last_insert_rowid();
        for item in &new.items {
            tx.execute(
                "INSERT INTO order_items (order_id, product_id, quantity, price_at_time) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, item.product_id, item.quantity, item.price],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        }

        tx.commit().map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Order {
            id: OrderId(id),
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
            created_at,
        })
    }

    fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS),
            params![id.0],
            Self::row_to_order,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT order_id, product_id, quantity, price_at_time \
                 FROM order_items WHERE order_id = ?1 ORDER BY id",
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let items = stmt
            .query_map(params![id.0], |row| {
                let order_id: i64 = row.get(0)?;
                Ok(OrderItem {
                    order_id: OrderId(order_id),
                    product_id: row.get(1)?,
                    quantity: row.get(2)?,
                    price_at_order: row.get(3)?,
                })
            })
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(items)
    }

    fn orders_for_customer(&self, customer: CustomerId) -> StoreResult<Vec<OrderWithItems>> {
        let orders = self.query_orders("WHERE customer_id = ?1", params![customer.0])?;
        self.attach_items(orders)
    }

    fn mark_paid(&self, id: OrderId) -> StoreResult<Order> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE orders SET payment_status = ?1 \
                 WHERE id = ?2 AND payment_status = ?3",
                params![
                    PaymentStatus::Paid.as_str(),
                    id.0,
                    PaymentStatus::Pending.as_str()
                ],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?
        };

        if updated == 0 {
            return match self.get_order(id)? {
                Some(_) => Err(ApiError::Conflict("Order is already paid".to_string())),
                None => Err(ApiError::NotFound("Order")),
            };
        }

        self.get_order(id)?.ok_or(ApiError::NotFound("Order"))
    }

    fn set_gateway_reference(&self, id: OrderId, reference: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn
            .execute(
                "UPDATE orders SET gateway_reference = ?1 WHERE id = ?2",
                params![reference, id.0],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if updated == 0 {
            return Err(ApiError::NotFound("Order"));
        }
        Ok(())
    }

    fn orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<OrderWithItems>> {
        let from = from.to_rfc3339();
        let to = to.to_rfc3339();
        let orders = self.query_orders(
            "WHERE created_at >= ?1 AND created_at < ?2",
            params![from, to],
        )?;
        self.attach_items(orders)
    }

    fn session_orders(&self, session: SessionId) -> StoreResult<Vec<OrderWithItems>> {
        let orders = self.query_orders("WHERE session_id = ?1", params![session.0])?;
        self.attach_items(orders)
    }

    fn session_summary(&self, session: SessionId) -> StoreResult<SessionSummary> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT oi.product_id, SUM(oi.quantity) AS qty \
                 FROM orders o JOIN order_items oi ON oi.order_id = o.id \
                 WHERE o.session_id = ?1 \
                 GROUP BY oi.product_id \
                 ORDER BY qty DESC, oi.product_id",
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let products = stmt
            .query_map(params![session.0], |row| {
                Ok(ProductQuantity {
                    product_id: row.get(0)?,
                    quantity: row.get(1)?,
                })
            })
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let (order_count, customer_count) = conn
            .query_row(
                "SELECT COUNT(DISTINCT id), COUNT(DISTINCT customer_name) \
                 FROM orders WHERE session_id = ?1",
                params![session.0],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(SessionSummary {
            products,
            order_count,
            customer_count,
        })
    }

    fn unreconciled_orders(&self) -> StoreResult<Vec<Order>> {
        self.query_orders(
            "WHERE payment_method = ?1 AND payment_status = ?2 \
             AND gateway_reference IS NULL",
            params![
                PaymentMethod::GatewayOnline.as_str(),
                PaymentStatus::Pending.as_str()
            ],
        )
    }
}

impl SessionStore for SqliteStore {
    fn start_session(&self, admin: StaffId) -> StoreResult<OrderSession> {
        let conn = self.conn.lock().unwrap();
        let start_time = Utc::now();

        // Plain insert racing against the partial unique index on
        // status='active'; losing the race is a Conflict, not a retry.
        conn.execute(
            "INSERT INTO order_management_sessions (start_time, status, created_by) \
             VALUES (?1, ?2, ?3)",
            params![
                start_time.to_rfc3339(),
                SessionStatus::Active.as_str(),
                admin.0
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                    return ApiError::Conflict("An order session is already active".to_string());
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        Ok(OrderSession {
            id: SessionId(conn.last_insert_rowid()),
            start_time,
            end_time: None,
            status: SessionStatus::Active,
            created_by: admin,
        })
    }

    fn stop_session(&self) -> StoreResult<OrderSession> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let active = tx
            .query_row(
                "SELECT id, start_time, end_time, status, created_by \
                 FROM order_management_sessions WHERE status = ?1",
                params![SessionStatus::Active.as_str()],
                Self::row_to_session,
            )
            .optional()
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .ok_or_else(|| ApiError::Conflict("No active order session".to_string()))?;

        let end_time = Utc::now();
        tx.execute(
            "UPDATE order_management_sessions \
             SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![
                SessionStatus::Stopped.as_str(),
                end_time.to_rfc3339(),
                active.id.0
            ],
        )
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        if self.has_current_flag {
            tx.execute(
                "UPDATE orders SET is_current_order = 0 WHERE session_id = ?1",
                params![active.id.0],
            )
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        }

        tx.commit().map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(OrderSession {
            end_time: Some(end_time),
            status: SessionStatus::Stopped,
            ..active
        })
    }

    fn active_session(&self) -> StoreResult<Option<OrderSession>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, start_time, end_time, status, created_by \
             FROM order_management_sessions WHERE status = ?1",
            params![SessionStatus::Active.as_str()],
            Self::row_to_session,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn last_stopped_session(&self) -> StoreResult<Option<OrderSession>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, start_time, end_time, status, created_by \
             FROM order_management_sessions WHERE status = ?1 \
             ORDER BY end_time DESC, id DESC LIMIT 1",
            params![SessionStatus::Stopped.as_str()],
            Self::row_to_session,
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

impl AccountStore for SqliteStore {
    fn create_customer(&self, new: NewCustomer) -> StoreResult<CustomerId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO customers (name, email, password_hash, phone_number, \
             location, home_address, role, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.name,
                new.email.to_lowercase(),
                new.password_hash,
                new.phone_number,
                new.location,
                new.home_address,
                new.role,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::Conflict("Email already registered".to_string());
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        Ok(CustomerId(conn.last_insert_rowid()))
    }

    fn get_customer_by_email(&self, email: &str) -> StoreResult<Option<CustomerAccount>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, email, password_hash, phone_number, location, \
             home_address, role, created_at FROM customers WHERE email = ?1",
            params![normalized],
            |row| {
                let id: i64 = row.get(0)?;
                let created_at: String = row.get(8)?;
                Ok(CustomerAccount {
                    id: CustomerId(id),
                    name: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    phone_number: row.get(4)?,
                    location: row.get(5)?,
                    home_address: row.get(6)?,
                    role: row.get(7)?,
                    created_at: parse_timestamp(&created_at),
                })
            },
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn create_staff(&self, new: NewStaff) -> StoreResult<StaffId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staff (username, email, password_hash, name, phone_number, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.username,
                new.email.to_lowercase(),
                new.password_hash,
                new.name,
                new.phone_number,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::Conflict(
                        "Email or username already registered".to_string(),
                    );
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        Ok(StaffId(conn.last_insert_rowid()))
    }

    fn get_staff_by_email(&self, email: &str) -> StoreResult<Option<StaffAccount>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, email, password_hash, name, phone_number, created_at \
             FROM staff WHERE email = ?1",
            params![normalized],
            |row| {
                let id: i64 = row.get(0)?;
                let created_at: String = row.get(6)?;
                Ok(StaffAccount {
                    id: StaffId(id),
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    name: row.get(4)?,
                    phone_number: row.get(5)?,
                    created_at: parse_timestamp(&created_at),
                })
            },
        )
        .optional()
        .map_err(|e| ApiError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewOrderItem;

    fn open_test_store() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    fn seed_staff(store: &SqliteStore) -> StaffId {
        store
            .create_staff(NewStaff {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: None,
                phone_number: None,
            })
            .unwrap()
    }

    #[test]
    fn test_unique_active_session_index() {
        let store = open_test_store();
        let admin = seed_staff(&store);

        store.start_session(admin).unwrap();
        assert!(matches!(
            store.start_session(admin),
            Err(ApiError::Conflict(_))
        ));

        store.stop_session().unwrap();
        store.start_session(admin).unwrap();
    }

    #[test]
    fn test_order_roundtrip_and_sweep() {
        let store = open_test_store();
        let admin = seed_staff(&store);
        let session = store.start_session(admin).unwrap();

        let order = store
            .create_order(NewOrder {
                customer_name: "A".to_string(),
                customer_phone: "555".to_string(),
                customer_address: "X".to_string(),
                payment_method: PaymentMethod::CashOnDelivery,
                total: 100.0,
                customer_id: None,
                upi_id: None,
                session_id: Some(session.id),
                is_current: true,
                items: vec![NewOrderItem {
                    product_id: 1,
                    quantity: 2,
                    price: 50.0,
                }],
            })
            .unwrap();

        let fetched = store.get_order(order.id).unwrap().unwrap();
        assert!(fetched.is_current);
        assert_eq!(fetched.session_id, Some(session.id));
        assert_eq!(store.order_items(order.id).unwrap().len(), 1);

        store.stop_session().unwrap();
        let swept = store.get_order(order.id).unwrap().unwrap();
        assert!(!swept.is_current);
        assert_eq!(swept.session_id, Some(session.id));
    }

    #[test]
    fn test_mark_paid_transitions_once() {
        let store = open_test_store();
        let order = store
            .create_order(NewOrder {
                customer_name: "A".to_string(),
                customer_phone: "555".to_string(),
                customer_address: "X".to_string(),
                payment_method: PaymentMethod::CashOnDelivery,
                total: 50.0,
                customer_id: None,
                upi_id: None,
                session_id: None,
                is_current: false,
                items: vec![],
            })
            .unwrap();

        assert_eq!(
            store.mark_paid(order.id).unwrap().payment_status,
            PaymentStatus::Paid
        );
        assert!(matches!(
            store.mark_paid(order.id),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            store.mark_paid(OrderId(999)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_unreconciled_listing() {
        let store = open_test_store();
        let order = store
            .create_order(NewOrder {
                customer_name: "A".to_string(),
                customer_phone: "555".to_string(),
                customer_address: "X".to_string(),
                payment_method: PaymentMethod::GatewayOnline,
                total: 120.0,
                customer_id: None,
                upi_id: None,
                session_id: None,
                is_current: false,
                items: vec![],
            })
            .unwrap();

        assert_eq!(store.unreconciled_orders().unwrap().len(), 1);

        store.set_gateway_reference(order.id, "chg_123").unwrap();
        assert!(store.unreconciled_orders().unwrap().is_empty());
    }
}
