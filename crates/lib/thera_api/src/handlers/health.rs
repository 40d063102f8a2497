//! Liveness endpoint.

/// `GET /`: always `OK` while the process serves requests.
pub async fn health() -> &'static str {
    "OK"
}
