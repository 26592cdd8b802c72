//! NotifyHub ingestion API.
//!
//! Endpoints:
//! - POST /send: validate, persist as `queued` and enqueue a notification
//! - GET  /status/{id}: current status of a notification
//! - GET  /health, /healthz: liveness

pub mod routes;
pub mod state;
