//! Structured record stores on top of [`Database`](crate::db::Database).
//!
//! Every query goes through [`Database::run`](crate::db::Database::run), so
//! callers get the reconnect-and-retry-once behavior and must not retry
//! again themselves.
//!
//! - [`DebateStore`] - locally uploaded debate documents
//! - [`IssueStore`] - periodical issues, one per (year, month)
//! - [`TaxonomyStore`] - categories, tags and image categories

mod debates;
mod issues;
mod taxonomy;

pub use debates::{DebateStore, LocalDebateRecord, NewDebate};
pub use issues::{Issue, IssueFilter, IssueStore, IssueUpsert, NewIssue, UpsertOutcome};
pub use taxonomy::{NewTerm, TaxonomyKind, TaxonomyStore, Term, slugify};

use thiserror::Error;

use crate::db::DbErrorKind;

/// Errors raised by the record stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed after the pool's own retry.
    #[error("database error ({kind}): {message}")]
    Database {
        /// Typed classification of the failure.
        kind: DbErrorKind,
        /// Human-readable database error text.
        message: String,
    },

    /// A row with the same unique key already exists.
    #[error("{what} already exists")]
    Conflict {
        /// What collided, e.g. `category 'news'`.
        what: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// Returns the typed database error kind, when this is a database error.
    #[must_use]
    pub fn database_kind(&self) -> Option<DbErrorKind> {
        match self {
            Self::Database { kind, .. } => Some(*kind),
            Self::Conflict { .. } => None,
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_from_row_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.database_kind(), Some(DbErrorKind::RowNotFound));
        assert!(err.to_string().contains("row_not_found"));
    }

    #[test]
    fn test_conflict_has_no_database_kind() {
        let err = StoreError::Conflict {
            what: "tag 'news'".to_string(),
        };
        assert_eq!(err.database_kind(), None);
        assert_eq!(err.to_string(), "tag 'news' already exists");
    }
}
