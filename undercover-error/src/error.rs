//! The main Error type

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The unified error type for every workspace operation.
///
/// - `kind`: what type of error occurred
/// - `message`: human-readable description
/// - `status`: whether the error is retryable
/// - `operation`: what operation caused the error
/// - `context`: key-value pairs for debugging
/// - `source`: the underlying error (if any)
///
/// ```rust
/// use undercover_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::RateLimited, "rate limit exceeded")
///     .with_operation("openai::complete")
///     .with_context("model", "gpt-4o");
///
/// assert_eq!(err.kind(), ErrorKind::RateLimited);
/// assert_eq!(err.status(), ErrorStatus::Temporary);
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up a context value by key (first match)
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Rule out retries regardless of kind
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Set the operation that caused this error.
    ///
    /// A previously set operation moves into the context as "called" so the
    /// call chain survives.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    // =========================================================================
    // Status mutations
    // =========================================================================

    /// Mark as persistent after failed retries
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Conversions (keep these few; raw errors must not leak)
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::SerializationFailed, err.to_string())
            .with_operation("serde_json")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Rate-limit errors always carry the "rate limit" tag in their message
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        Self::new(ErrorKind::RateLimited, "rate limit exceeded")
            .with_context("provider", provider)
    }

    pub fn network_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkFailed, message)
    }

    pub fn api_failed(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiFailed, message).with_context("status", status.to_string())
    }

    pub fn authentication_failed(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        Self::new(
            ErrorKind::AuthenticationFailed,
            format!("authentication failed for provider '{}'", provider),
        )
        .with_context("provider", provider)
    }

    pub fn timeout(secs: f64) -> Self {
        Self::new(ErrorKind::Timeout, format!("chat call timed out after {}s", secs))
    }

    pub fn provider_unavailable(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        Self::new(
            ErrorKind::ProviderUnavailable,
            format!("no chat capability registered for '{}'", provider),
        )
        .with_context("provider", provider)
        .permanent()
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    pub fn no_valid_target(voter: impl Into<String>) -> Self {
        let voter = voter.into();
        Self::new(ErrorKind::NoValidTarget, "no other player can be voted for")
            .with_context("voter", voter)
    }

    pub fn category_not_found(category: impl Into<String>) -> Self {
        let category = category.into();
        Self::new(
            ErrorKind::CategoryNotFound,
            format!("unknown category '{}'", category),
        )
        .with_context("category", category)
    }

    pub fn concept_not_found(category: impl Into<String>, index: usize) -> Self {
        let category = category.into();
        Self::new(
            ErrorKind::ConceptNotFound,
            format!("invalid index {} for category '{}'", index, category),
        )
        .with_context("category", category)
        .with_context("index", index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::MalformedResponse, "missing statement");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(err.message(), "missing statement");
        assert_eq!(err.status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::ApiFailed, "bad gateway")
            .with_operation("anthropic::complete")
            .with_context("model", "claude-3-haiku")
            .with_context("status", "502");

        assert_eq!(err.operation(), "anthropic::complete");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context_value("status"), Some("502"));
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::NetworkFailed, "connection reset")
            .with_operation("openai::complete")
            .with_operation("player::generate_statement");

        assert_eq!(err.operation(), "player::generate_statement");
        assert_eq!(err.context()[0], ("called", "openai::complete".to_string()));
    }

    #[test]
    fn test_persist() {
        let err = Error::rate_limited("google");
        assert!(err.is_retryable());

        let err = err.persist();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Persistent);
    }

    #[test]
    fn test_rate_limit_message_tag() {
        let err = Error::rate_limited("openai");
        assert!(err.message().contains("rate limit"));
        assert_eq!(err.context_value("provider"), Some("openai"));
    }

    #[test]
    fn test_display() {
        let err = Error::new(ErrorKind::RateLimited, "rate limit exceeded")
            .with_operation("gemini::complete")
            .with_context("model", "gemini-1.5-flash");

        let display = format!("{}", err);
        assert!(display.contains("RateLimited"));
        assert!(display.contains("temporary"));
        assert!(display.contains("gemini::complete"));
        assert!(display.contains("model: gemini-1.5-flash"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "game.json");
        let err = Error::from(io_err);
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.source_ref().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert_eq!(err.kind(), ErrorKind::SerializationFailed);
    }
}
