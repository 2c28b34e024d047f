//! Utility modules for the enrichment pipeline
//!
//! - **error**: crate-wide error type and `Result` alias
//! - **logging**: tracing subscriber setup for the binary

pub mod error;
pub mod logging;

pub use error::{EnrichmentError, Result};
pub use logging::{LogFormat, init_logging};

/// Format a duration in milliseconds as a short human readable string
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{}ms", duration_ms)
    } else if duration_ms < 60_000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else if duration_ms < 3_600_000 {
        format!("{:.1}m", duration_ms as f64 / 60_000.0)
    } else {
        format!("{:.1}h", duration_ms as f64 / 3_600_000.0)
    }
}

/// Truncate string to at most `max_len` characters with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
