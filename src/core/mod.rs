//! Core functionality for the enrichment pipeline
//!
//! This module contains the domain types, the completion providers and the
//! batch orchestration that ties them together.

pub mod batch;
pub mod providers;
pub mod types;
