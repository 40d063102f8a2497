//! Domain models shared by the core services and the HTTP layer.
//!
//! These are internal domain models; request/response payloads live in
//! `thera_api::models`.

pub mod chat;
pub mod user;
