//! Error-class mapping: backend error → [`ErrorKind`].
//!
//! The specification's mapping table is keyed on PostgreSQL SQL-state
//! prefixes (`23...` → Conflict, `53100` → NoSpace, ...). This crate's
//! concrete Store binds to SQLite (the teacher's backend, `core/db.rs`),
//! which reports failures as [`rusqlite::Error`] carrying a
//! [`rusqlite::ffi::ErrorCode`] rather than a SQL-state string. This module
//! re-expresses the same error classes against that vocabulary: each
//! extended SQLite result code is routed to the class a PostgreSQL
//! SQL-state in the same family would map to. `PHLK1`/`PHLK2` (lock
//! protocol errors) have no SQLite equivalent at all — those are raised by
//! application logic in `lock::registry` from affected-row counts, never
//! synthesized here.
use crate::error::ErrorKind;
use rusqlite::ErrorCode;

/// Match the documented SQL-state-class table, longest-prefix-first, by
/// going through `rusqlite`'s extended result code instead of a string
/// prefix (SQLite has no SQL-state notion).
pub fn classify_sqlite_error(e: &rusqlite::Error) -> ErrorKind {
    match e {
        rusqlite::Error::SqliteFailure(code, _) => classify_error_code(code.code),
        rusqlite::Error::QueryReturnedNoRows => ErrorKind::NotFound,
        rusqlite::Error::InvalidColumnType(..) => ErrorKind::InvalidData,
        rusqlite::Error::InvalidParameterName(..) => ErrorKind::InvalidData,
        rusqlite::Error::InvalidQuery => ErrorKind::InvalidData,
        rusqlite::Error::SqlInputError { .. } => ErrorKind::InvalidData,
        rusqlite::Error::ToSqlConversionFailure(_) => ErrorKind::InvalidData,
        _ => ErrorKind::CommunicationError,
    }
}

fn classify_error_code(code: ErrorCode) -> ErrorKind {
    match code {
        ErrorCode::ConstraintViolation => ErrorKind::Conflict,
        ErrorCode::DiskFull => ErrorKind::NoSpace,
        ErrorCode::OutOfMemory => ErrorKind::OutOfMemory,
        ErrorCode::TooBig
        | ErrorCode::Unknown
        | ErrorCode::InternalMalfunction
        | ErrorCode::PermissionDenied
        | ErrorCode::OperationAborted
        | ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::TypeMismatch
        | ErrorCode::ApiMisuse
        | ErrorCode::NoLargeFileSupport
        | ErrorCode::ParameterOutOfRange
        | ErrorCode::NotADatabase => ErrorKind::IoError,
        ErrorCode::SystemIoFailure => ErrorKind::IoError,
        ErrorCode::CannotOpen | ErrorCode::FileLockingProtocolFailed => {
            ErrorKind::CommunicationError
        }
        ErrorCode::SchemaChanged => ErrorKind::SchemaMismatch,
        ErrorCode::AuthorizationForStatementDenied | ErrorCode::ReadOnly => {
            ErrorKind::AccessDenied
        }
        ErrorCode::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::InvalidData,
    }
}
