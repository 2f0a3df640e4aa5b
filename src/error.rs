use std::os::raw::c_int;

use crate::sys;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by connections and statements.
///
/// Every engine-originated variant carries the engine result code and its
/// diagnostic text. After any of these the failing [`Connection`](crate::Connection)
/// or [`Statement`](crate::Statement) can still be dropped safely.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The database could not be opened, created or closed, or the connection is closed.
    #[error("connection error (code {code}): {message}")]
    Connection { code: i32, message: String },

    /// The engine rejected the SQL text during preparation.
    #[error("sqlite error during prepare (code {code}): {message}")]
    Query { code: i32, message: String },

    /// An argument could not be bound to its placeholder.
    #[error("sqlite error during binding at position {position} (code {code}): {message}")]
    Bind {
        position: usize,
        code: i32,
        message: String,
    },

    /// The engine failed while advancing the cursor or reading the current row.
    #[error("sqlite error during step (code {code}): {message}")]
    RowFetch { code: i32, message: String },

    /// A single row was required but the cursor was exhausted.
    #[error("statement did not return a row")]
    NoRow,
}

impl Error {
    /// Engine result code, if the failure originated in the engine.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Connection { code, .. }
            | Error::Query { code, .. }
            | Error::Bind { code, .. }
            | Error::RowFetch { code, .. } => Some(*code),
            Error::NoRow => None,
        }
    }

    pub(crate) fn connection(code: c_int, message: impl Into<String>) -> Self {
        Error::Connection {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn query(code: c_int, message: impl Into<String>) -> Self {
        Error::Query {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn bind(position: usize, code: c_int) -> Self {
        Error::Bind {
            position,
            code,
            message: sys::errstr(code),
        }
    }

    pub(crate) fn row_fetch(code: c_int, message: impl Into<String>) -> Self {
        Error::RowFetch {
            code,
            message: message.into(),
        }
    }
}
