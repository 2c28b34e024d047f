//! End-to-end tests for enrichment-rs
//!
//! These tests talk to a real completion server.
//! Run with: cargo test -- --ignored
//!
//! Required environment variables:
//! - COMPLETION_BASE_URL: e.g. `http://localhost:8000/v1`
//! - COMPLETION_MODEL: model served at that endpoint (optional)
//! - COMPLETION_API_KEY: bearer token, if the server wants one (optional)

pub mod completion_server;
