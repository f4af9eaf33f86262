//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Member writes must enforce `Member::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`,
//!   `UnknownSortField`) in addition to DB transport errors.

use crate::db::DbError;
use crate::model::member::MemberValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod member_repo;
pub mod obligations_repo;
pub mod subscriber_repo;

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared repository error for member, obligation and subscriber storage.
#[derive(Debug)]
pub enum StoreError {
    Validation(MemberValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    /// Sort key is not a known property of the listed record.
    UnknownSortField(String),
    /// Write rejected by a UNIQUE constraint.
    Conflict(String),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UnknownSortField(property) => {
                write!(f, "no property `{property}` found for sorting")
            }
            Self::Conflict(details) => write!(f, "unique constraint violated: {details}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MemberValidationError> for StoreError {
    fn from(value: MemberValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            {
                let details = message
                    .clone()
                    .unwrap_or_else(|| "duplicate value".to_string());
                return Self::Conflict(details);
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
