//! Completion provider errors

use thiserror::Error;

/// Errors returned by a completion provider for a single request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Authentication failed for {provider}: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },

    #[error("Rate limit exceeded for {provider}: {message}")]
    RateLimit {
        provider: &'static str,
        message: String,
        retry_after: Option<u64>,
    },

    #[error("API error from {provider} (status {status}): {message}")]
    ApiError {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Network error for {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("Request to {provider} timed out: {message}")]
    Timeout {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    ResponseParsing {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid configuration for {provider}: {message}")]
    Configuration {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn authentication(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    pub fn rate_limit(
        provider: &'static str,
        message: impl Into<String>,
        retry_after: Option<u64>,
    ) -> Self {
        Self::RateLimit {
            provider,
            message: message.into(),
            retry_after,
        }
    }

    pub fn api_error(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }

    pub fn timeout(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider,
            message: message.into(),
        }
    }

    pub fn response_parsing(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ResponseParsing {
            provider,
            message: message.into(),
        }
    }

    pub fn configuration(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider,
            message: message.into(),
        }
    }

    /// Provider name the error originated from
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Authentication { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::ApiError { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ResponseParsing { provider, .. }
            | Self::Configuration { provider, .. } => provider,
        }
    }

    /// Whether resending the same request can reasonably succeed
    ///
    /// The executor retries every failed attempt regardless; this only feeds
    /// the log level and the final report.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::RateLimit { .. }
            | Self::ResponseParsing { .. } => true,
            Self::ApiError { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::Authentication { .. } | Self::Configuration { .. } => false,
        }
    }

    /// Map a reqwest transport error
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(provider, err.to_string())
        } else if err.is_decode() {
            Self::response_parsing(provider, err.to_string())
        } else {
            Self::network(provider, err.to_string())
        }
    }

    /// Map a non-success HTTP status and its body
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::authentication(provider, body),
            429 => Self::rate_limit(provider, body, None),
            _ => Self::api_error(provider, status, body),
        }
    }
}
