//! Integration tests for enrichment-rs
//!
//! These tests drive the HTTP clients against mock servers and run the full
//! pipeline over a temporary local bucket.

pub mod config_tests;
pub mod pipeline_tests;
pub mod supabase_storage_tests;
