//! Gateway-injected identity headers extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::request::Parts;
use uuid::Uuid;

use marche_domain::account::AccountRole;

/// Header carrying the authenticated account id.
pub const ACCOUNT_ID_HEADER: &str = "x-marche-account-id";

/// Header carrying the authenticated account role.
pub const ACCOUNT_ROLE_HEADER: &str = "x-marche-account-role";

/// Caller identity as asserted by the gateway.
///
/// Extraction fails with 401 when either header is absent or unparseable.
/// The role here is only what the gateway saw at login; handlers use it to
/// gate routes (403) and use cases re-read the stored account.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl IdentityHeaders {
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

fn header<T: std::str::FromStr>(parts: &Parts, name: &str) -> Option<T> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

impl<S> FromRequestParts<S> for IdentityHeaders
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send`; values are read
    // synchronously so the returned future owns everything it needs.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let account_id: Option<Uuid> = header(parts, ACCOUNT_ID_HEADER);
        let role: Option<AccountRole> = header(parts, ACCOUNT_ROLE_HEADER);

        async move {
            let account_id = account_id.ok_or(StatusCode::UNAUTHORIZED)?;
            let role = role.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self { account_id, role })
        }
    }
}
