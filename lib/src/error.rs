//! Error kinds shared by the content store, metadata store, search index,
//! reconciler and coordinator.
//!
//! Mirrors the teacher's convention of one `thiserror`-derived enum per
//! failure domain rather than a single ad-hoc `String` error.

use crate::model::ConflictDetail;

/// The five error kinds the core distinguishes, per the save/read pipeline's
/// propagation policy: `Conflict` and `NotFound` are typed signals the
/// caller branches on, `Validation` is a client error, `Io` and `Internal`
/// both surface as 500s but are kept distinct for logging.
#[derive(thiserror::Error, Debug)]
pub enum NoteError {
    #[error("note '{title}' was modified by someone else")]
    Conflict {
        title: String,
        detail: Box<ConflictDetail>,
    },

    #[error("note '{0}' not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl NoteError {
    pub fn io(context: impl std::fmt::Display) -> Self {
        Self::Io(context.to_string())
    }

    pub fn internal(context: impl std::fmt::Display) -> Self {
        Self::Internal(context.to_string())
    }
}

impl From<git2::Error> for NoteError {
    fn from(err: git2::Error) -> Self {
        Self::io(err)
    }
}

impl From<sqlx::Error> for NoteError {
    fn from(err: sqlx::Error) -> Self {
        Self::io(err)
    }
}

impl From<tantivy::TantivyError> for NoteError {
    fn from(err: tantivy::TantivyError) -> Self {
        // SI failures never abort a save/reconcile in progress; call sites
        // that must not fail hard on search-index trouble catch this error
        // and log it instead of propagating, per spec ss4.1/ss4.2.
        Self::io(err)
    }
}

impl From<std::io::Error> for NoteError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err)
    }
}

impl From<tokio::task::JoinError> for NoteError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("background task panicked: {err}"))
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
