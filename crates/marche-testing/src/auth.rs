//! Mock auth helpers for handler tests.
//!
//! Services behind the gateway receive `x-marche-account-id` + `x-marche-account-role`
//! headers injected by the gateway. In tests, `MockAuth` builds these headers directly
//! so no real gateway or JWT is needed.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use marche_auth_types::identity::{ACCOUNT_ID_HEADER, ACCOUNT_ROLE_HEADER};
use marche_domain::account::AccountRole;

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl MockAuth {
    pub fn new(account_id: Uuid, role: AccountRole) -> Self {
        Self { account_id, role }
    }

    pub fn admin() -> Self {
        Self::new(Uuid::new_v4(), AccountRole::Admin)
    }

    pub fn client() -> Self {
        Self::new(Uuid::new_v4(), AccountRole::Client)
    }

    /// Return headers as if the gateway injected them.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static(ACCOUNT_ID_HEADER),
            HeaderValue::from_str(&self.account_id.to_string()).unwrap(),
        );
        map.insert(
            HeaderName::from_static(ACCOUNT_ROLE_HEADER),
            HeaderValue::from_static(self.role.as_str()),
        );
        map
    }
}
