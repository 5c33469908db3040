//! Error types for DSS operations.
//!
//! Every fallible DSS operation returns `Result<T, DssError>`. `DssError`
//! pairs a message with an [`ErrorKind`] drawn from the error-class surface
//! a caller may observe (see the entity-keys and error-class sections of the
//! specification this crate implements). There are no panics or exceptions
//! in the public API; `rusqlite`/`io`/`toml` failures are mapped to a kind
//! at the point they cross the Store boundary.

use thiserror::Error;

/// The error-class surface a DSS caller may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ok,
    InvalidData,
    Conflict,
    NoSpace,
    OutOfMemory,
    IoError,
    NoLock,
    AccessDenied,
    NotFound,
    Ambiguous,
    NotSupported,
    NotConnected,
    SchemaMismatch,
    CommunicationError,
    InvalidFilter,
    InvalidField,
    AlreadyInitialized,
}

/// Canonical error type for all DSS operations.
#[derive(Error, Debug)]
#[error("{kind:?}: {message}")]
pub struct DssError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DssError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidData, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn ambiguous(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ambiguous, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    pub fn no_lock(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoLock, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFilter, message)
    }

    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidField, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotConnected, message)
    }

    pub fn already_initialized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyInitialized, message)
    }
}

impl From<rusqlite::Error> for DssError {
    fn from(e: rusqlite::Error) -> Self {
        let kind = crate::store::errmap::classify_sqlite_error(&e);
        DssError::with_source(kind, e.to_string(), e)
    }
}

impl From<std::io::Error> for DssError {
    fn from(e: std::io::Error) -> Self {
        DssError::with_source(ErrorKind::IoError, e.to_string(), e)
    }
}

impl From<toml::de::Error> for DssError {
    fn from(e: toml::de::Error) -> Self {
        DssError::with_source(ErrorKind::InvalidData, e.to_string(), e)
    }
}

pub type Result<T> = std::result::Result<T, DssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = DssError::not_found("oid=bar");
        assert_eq!(format!("{}", err), "NotFound: oid=bar");
    }

    #[test]
    fn constructors_set_expected_kind() {
        assert_eq!(DssError::conflict("x").kind, ErrorKind::Conflict);
        assert_eq!(DssError::ambiguous("x").kind, ErrorKind::Ambiguous);
        assert_eq!(DssError::not_supported("x").kind, ErrorKind::NotSupported);
    }
}
