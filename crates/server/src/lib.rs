//! HTTP surface for buildguide.
//!
//! Exposes the router so the binary and the integration tests share one
//! wiring.

pub mod api;
pub mod app;
