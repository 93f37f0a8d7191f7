//! Error kinds for game and provider operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to pick a handling policy, e.g. the retry
/// decorator only backs off on `RateLimited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// Catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid game or provider configuration
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Provider / transport errors
    // =========================================================================
    /// No chat capability is registered for the requested provider
    ProviderUnavailable,

    /// API key missing or rejected
    AuthenticationFailed,

    /// Vendor signalled a rate limit (HTTP 429)
    RateLimited,

    /// Connection-level failure
    NetworkFailed,

    /// Vendor returned a non-success status
    ApiFailed,

    /// A chat call exceeded its time limit
    Timeout,

    // =========================================================================
    // Agent output errors
    // =========================================================================
    /// Model output could not be parsed as JSON
    ParseFailed,

    /// Model output parsed but lacks a required field
    MalformedResponse,

    /// A vote was requested but no other player can be targeted
    NoValidTarget,

    // =========================================================================
    // Concept errors
    // =========================================================================
    /// Unknown concept category
    CategoryNotFound,

    /// Pair index out of range for a category
    ConceptNotFound,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Serialization/deserialization failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::ApiFailed => "ApiFailed",
            ErrorKind::Timeout => "Timeout",

            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::NoValidTarget => "NoValidTarget",

            ErrorKind::CategoryNotFound => "CategoryNotFound",
            ErrorKind::ConceptNotFound => "ConceptNotFound",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::NetworkFailed
                | ErrorKind::Timeout
                | ErrorKind::ProviderUnavailable
        )
    }

    /// Transport/provider class of the error taxonomy
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::AuthenticationFailed
                | ErrorKind::RateLimited
                | ErrorKind::NetworkFailed
                | ErrorKind::ApiFailed
                | ErrorKind::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::RateLimited.to_string(), "RateLimited");
        assert_eq!(ErrorKind::MalformedResponse.to_string(), "MalformedResponse");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::MalformedResponse.is_retryable());
        assert!(!ErrorKind::ConfigInvalid.is_retryable());
    }

    #[test]
    fn test_transport_class() {
        assert!(ErrorKind::ApiFailed.is_transport());
        assert!(ErrorKind::Timeout.is_transport());
        assert!(!ErrorKind::ParseFailed.is_transport());
    }
}
