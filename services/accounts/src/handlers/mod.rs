pub mod account;
pub mod live;
pub mod moderation;
pub mod registration;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;

use crate::domain::types::Provenance;

/// A JSON body whose rejection is left to the handler, so malformed input
/// still renders as an [`AccountsServiceError`](crate::error::AccountsServiceError).
pub(crate) type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client address and user agent as forwarded by the gateway.
///
/// `x-forwarded-for` wins over `x-real-ip`; only its first hop is kept.
pub(crate) fn provenance_from_headers(headers: &HeaderMap) -> Provenance {
    let ip_address = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_owned);
    Provenance {
        ip_address,
        user_agent: header_str(headers, "user-agent").map(str::to_owned),
    }
}
