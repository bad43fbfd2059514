//! One-time-code issuance records
//!
//! Codes prove possession of an email address before any durable account
//! row is written. Records are keyed by (email, workflow) so a customer
//! registration and a staff registration for the same address cannot
//! clobber each other.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// How long an issued code stays valid
pub const OTP_TTL_SECONDS: i64 = 5 * 60;

/// Which registration workflow issued the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpKind {
    CustomerSignup,
    StaffSignup,
}

/// Lookup key for a pending code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub email: String,
    pub kind: OtpKind,
}

impl OtpKey {
    pub fn new(email: &str, kind: OtpKind) -> Self {
        Self {
            email: email.to_lowercase(),
            kind,
        }
    }
}

/// The account to materialize once the code is verified. Credential
/// secrets stay raw here; they are hashed at materialization, the only
/// point a durable record is written.
#[derive(Debug, Clone)]
pub enum OtpPayload {
    Customer {
        name: String,
        email: String,
        password: String,
        phone_number: Option<String>,
        location: Option<String>,
        home_address: Option<String>,
    },
    Staff {
        username: String,
        email: String,
        password: String,
        name: Option<String>,
        phone_number: Option<String>,
    },
}

/// A pending one-time code
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub payload: OtpPayload,
}

/// Outcome of an atomic consume attempt
#[derive(Debug)]
pub enum OtpClaim {
    /// Code matched; the record has been evicted and the payload is
    /// yielded exactly once
    Matched(OtpPayload),
    /// No record for this key
    Missing,
    /// Record was past its window and has been evicted
    Expired,
    /// Submitted code did not match; the record is retained for retries
    Mismatch,
}

/// Keyed, TTL-aware storage for pending codes. Swappable so the eviction
/// policy can be tested independent of transport.
pub trait OtpStore: Send + Sync {
    /// Store a record, overwriting any prior record for the key
    /// (last-issued-wins)
    fn put(&self, key: OtpKey, record: OtpRecord);

    /// Atomically check and consume: expiry evicts, a mismatch retains,
    /// a match removes the record and yields the payload
    fn consume(&self, key: &OtpKey, code: &str, now: DateTime<Utc>) -> OtpClaim;

    /// Drop every record past its window; returns how many were evicted
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

fn is_expired(record: &OtpRecord, now: DateTime<Utc>) -> bool {
    now - record.issued_at > Duration::seconds(OTP_TTL_SECONDS)
}

/// In-memory OTP store
pub struct InMemoryOtpStore {
    records: RwLock<HashMap<OtpKey, OtpRecord>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, key: OtpKey, record: OtpRecord) {
        self.records.write().unwrap().insert(key, record);
    }

    fn consume(&self, key: &OtpKey, code: &str, now: DateTime<Utc>) -> OtpClaim {
        let mut records = self.records.write().unwrap();
        let record = match records.get(key) {
            Some(r) => r,
            None => return OtpClaim::Missing,
        };

        if is_expired(record, now) {
            records.remove(key);
            return OtpClaim::Expired;
        }

        if record.code != code {
            return OtpClaim::Mismatch;
        }

        let record = records.remove(key).expect("record present under write lock");
        OtpClaim::Matched(record.payload)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|_, r| !is_expired(r, now));
        before - records.len()
    }
}
