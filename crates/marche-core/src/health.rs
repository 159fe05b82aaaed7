use axum::http::StatusCode;

/// `GET /healthz`: the process is up and serving.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `GET /readyz`: the router is mounted. Storage reachability is reported
/// per request through `UPSTREAM` errors, not here.
pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
