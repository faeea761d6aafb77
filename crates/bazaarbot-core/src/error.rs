use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Validation errors for domain type construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid exchange '{value}', expected one of NSE, BSE")]
    InvalidExchange { value: String },

    #[error("invalid timeframe '{value}', expected one of 1d, 1w, 1M, 3M, 6M, 1y, 5y")]
    InvalidTimeframe { value: String },
}

/// Outcome classification for upstream data fetches.
///
/// Callers use the kind to decide between giving up (`NotFound`,
/// `InvalidRequest`) and falling back to stale cached data
/// (`RateLimited`, `Unavailable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Upstream has no data for the requested resource.
    NotFound,
    /// Transient upstream failure (timeout, connect/read error, 5xx).
    Unavailable,
    /// Admission was rejected, either locally or by the provider.
    RateLimited,
    /// The request itself was malformed.
    InvalidRequest,
    /// Unexpected payload shape or a local programming error.
    Internal,
}

/// Structured fetch error carried through the coalescer and clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a caller holding stale data should prefer it over this error.
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_kinds() {
        assert_eq!(SourceError::not_found("x").code(), "source.not_found");
        assert_eq!(SourceError::rate_limited("x").code(), "source.rate_limited");
        assert_eq!(SourceError::unavailable("x").code(), "source.unavailable");
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(SourceError::unavailable("x").retryable());
        assert!(!SourceError::not_found("x").retryable());
        assert!(!SourceError::rate_limited("x").retryable());
        assert!(!SourceError::invalid_request("x").retryable());
    }
}
