//! Bearer-token authentication
//!
//! Customer and staff tokens are signed with independent secrets. Every
//! token is tagged with its audience (JWT `kid` header plus a matching
//! `aud` claim); verification dispatches on the tag instead of
//! trial-decoding against each secret in turn.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::store::AccountStore;

/// Token lifetime
const TOKEN_TTL_DAYS: i64 = 1;

const AUD_CUSTOMER: &str = "customer";
const AUD_STAFF: &str = "staff";

/// The authenticated identity attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Customer {
        id: i64,
        email: String,
        role: String,
    },
    Staff {
        id: i64,
        email: String,
        username: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    /// Present on staff-audience tokens issued to customer accounts
    /// elevated to staff at login
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    aud: String,
    exp: i64,
}

/// Signing and verification keys for both token audiences
pub struct TokenKeys {
    customer_encoding: EncodingKey,
    customer_decoding: DecodingKey,
    staff_encoding: EncodingKey,
    staff_decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secrets(customer_secret: &str, staff_secret: &str) -> Self {
        Self {
            customer_encoding: EncodingKey::from_secret(customer_secret.as_bytes()),
            customer_decoding: DecodingKey::from_secret(customer_secret.as_bytes()),
            staff_encoding: EncodingKey::from_secret(staff_secret.as_bytes()),
            staff_decoding: DecodingKey::from_secret(staff_secret.as_bytes()),
        }
    }

    pub fn issue_customer(&self, id: i64, email: &str, role: &str) -> Result<String, ApiError> {
        self.issue(
            AUD_CUSTOMER,
            &self.customer_encoding,
            Claims {
                sub: id,
                email: email.to_string(),
                username: None,
                role: Some(role.to_string()),
                aud: AUD_CUSTOMER.to_string(),
                exp: expiry(),
            },
        )
    }

    pub fn issue_staff(&self, id: i64, email: &str, username: &str) -> Result<String, ApiError> {
        self.issue(
            AUD_STAFF,
            &self.staff_encoding,
            Claims {
                sub: id,
                email: email.to_string(),
                username: Some(username.to_string()),
                role: None,
                aud: AUD_STAFF.to_string(),
                exp: expiry(),
            },
        )
    }

    /// Staff-audience token for a customer account whose role grants staff
    /// access; the role flag lets the gate skip the directory check.
    pub fn issue_elevated_staff(
        &self,
        id: i64,
        email: &str,
        username: &str,
        role: &str,
    ) -> Result<String, ApiError> {
        self.issue(
            AUD_STAFF,
            &self.staff_encoding,
            Claims {
                sub: id,
                email: email.to_string(),
                username: Some(username.to_string()),
                role: Some(role.to_string()),
                aud: AUD_STAFF.to_string(),
                exp: expiry(),
            },
        )
    }

    fn issue(&self, kid: &str, key: &EncodingKey, claims: Claims) -> Result<String, ApiError> {
        let header = Header {
            kid: Some(kid.to_string()),
            ..Header::new(Algorithm::HS256)
        };
        encode(&header, &claims, key).map_err(|e| ApiError::Internal(e.to_string()))
    }

    fn verify_claims(&self, token: &str) -> Result<Claims, ApiError> {
        let header = decode_header(token).map_err(|_| ApiError::Unauthenticated)?;
        let (audience, key) = match header.kid.as_deref() {
            Some(AUD_CUSTOMER) => (AUD_CUSTOMER, &self.customer_decoding),
            Some(AUD_STAFF) => (AUD_STAFF, &self.staff_decoding),
            _ => return Err(ApiError::Unauthenticated),
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthenticated)
    }

    /// Verify a token of either audience and produce its principal
    pub fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        let claims = self.verify_claims(token)?;
        Ok(principal_from(claims))
    }
}

fn expiry() -> i64 {
    (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp()
}

fn principal_from(claims: Claims) -> Principal {
    if claims.aud == AUD_STAFF {
        Principal::Staff {
            id: claims.sub,
            username: claims.username.unwrap_or_else(|| claims.email.clone()),
            email: claims.email,
        }
    } else {
        Principal::Customer {
            id: claims.sub,
            role: claims.role.unwrap_or_else(|| "customer".to_string()),
            email: claims.email,
        }
    }
}

/// Pull the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)
}

/// Resolve a principal of either audience
pub fn require_principal(keys: &TokenKeys, headers: &HeaderMap) -> Result<Principal, ApiError> {
    keys.verify(bearer_token(headers)?)
}

/// Resolve a customer principal; staff tokens are rejected
pub fn require_customer(keys: &TokenKeys, headers: &HeaderMap) -> Result<Principal, ApiError> {
    match require_principal(keys, headers)? {
        p @ Principal::Customer { .. } => Ok(p),
        Principal::Staff { .. } => Err(ApiError::Forbidden),
    }
}

/// Resolve a staff principal. Role-elevated tokens are accepted directly;
/// directory-issued tokens must still resolve to a live staff record, so
/// a token for a deleted staff account is rejected before its expiry.
pub fn require_staff<D>(
    keys: &TokenKeys,
    store: &D,
    headers: &HeaderMap,
) -> Result<Principal, ApiError>
where
    D: AccountStore + ?Sized,
{
    let claims = keys.verify_claims(bearer_token(headers)?)?;
    if claims.aud != AUD_STAFF {
        return Err(ApiError::Forbidden);
    }

    if claims.role.is_none() && store.get_staff_by_email(&claims.email)?.is_none() {
        return Err(ApiError::Forbidden);
    }

    Ok(principal_from(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewStaff};
    use axum::http::HeaderValue;

    fn keys() -> TokenKeys {
        TokenKeys::from_secrets("customer-secret", "staff-secret")
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_customer_token_roundtrip() {
        let keys = keys();
        let token = keys.issue_customer(7, "a@x.com", "customer").unwrap();

        match keys.verify(&token).unwrap() {
            Principal::Customer { id, email, role } => {
                assert_eq!(id, 7);
                assert_eq!(email, "a@x.com");
                assert_eq!(role, "customer");
            }
            other => panic!("expected customer principal, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token_rejected() {
        let keys = keys();
        assert!(matches!(
            keys.verify("not-a-token"),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn test_audiences_not_interchangeable() {
        let customer_keys = TokenKeys::from_secrets("same-secret", "same-secret");
        // Even with identical secrets, a customer-tagged token never
        // satisfies the staff gate.
        let token = customer_keys.issue_customer(1, "a@x.com", "customer").unwrap();
        let store = MemoryStore::new();
        let result = require_staff(&customer_keys, &store, &headers_with(&token));
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[test]
    fn test_staff_revocation_check() {
        let keys = keys();
        let store = MemoryStore::new();

        // Token for a staff identity that is not in the directory
        let token = keys.issue_staff(1, "ghost@x.com", "ghost").unwrap();
        assert!(matches!(
            require_staff(&keys, &store, &headers_with(&token)),
            Err(ApiError::Forbidden)
        ));

        use crate::store::AccountStore;
        store
            .create_staff(NewStaff {
                username: "ghost".to_string(),
                email: "ghost@x.com".to_string(),
                password_hash: "hash".to_string(),
                name: None,
                phone_number: None,
            })
            .unwrap();
        assert!(require_staff(&keys, &store, &headers_with(&token)).is_ok());
    }

    #[test]
    fn test_elevated_staff_token_skips_directory() {
        let keys = keys();
        let store = MemoryStore::new();

        let token = keys
            .issue_elevated_staff(3, "chef@x.com", "chef", "staff")
            .unwrap();
        assert!(require_staff(&keys, &store, &headers_with(&token)).is_ok());
    }

    #[test]
    fn test_missing_header_unauthenticated() {
        let keys = keys();
        assert!(matches!(
            require_principal(&keys, &HeaderMap::new()),
            Err(ApiError::Unauthenticated)
        ));
    }
}
