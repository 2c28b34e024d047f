//! Common test utilities for enrichment-rs
//!
//! This module provides shared test infrastructure for all tests:
//! - Test fixtures and data factories
//! - Completion provider stubs
//! - Object storage mocks
//! - Custom assertions and helpers

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use fixtures::{ProductFactory, test_config};
pub use providers::{EchoResponder, StubProvider};

/// Skip test if environment variable is not set
#[macro_export]
macro_rules! skip_without_env {
    ($var:expr) => {
        if std::env::var($var).is_err() {
            eprintln!("Skipping test: {} environment variable not set", $var);
            return;
        }
    };
}
