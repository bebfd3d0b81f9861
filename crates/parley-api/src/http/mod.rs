//! HTTP/REST API layer for Parley.
//!
//! Axum-based JSON API: `POST /chat`, `DELETE /chat/session/{id}`, and the
//! liveness/readiness probes, with CORS and request tracing.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
