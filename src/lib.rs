//! Record mapping over embedded SQLite.
//!
//! [`Connection::execute`] prepares a statement and binds positional arguments
//! by value type. The returned [`Statement`] populates caller-defined records
//! by matching result column names to field names:
//!
//! ```
//! use sqlrec::Connection;
//!
//! sqlrec::record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Person {
//!         pub id: i32,
//!         pub name: String,
//!     }
//! }
//!
//! let conn = Connection::open_in_memory()?;
//! conn.run("CREATE TABLE t (id INTEGER, name TEXT)", ())?;
//! conn.run("INSERT INTO t VALUES (?, ?)", (42, "Ada"))?;
//!
//! let mut p = Person::default();
//! conn.execute("SELECT id, name FROM t WHERE id = ?", (42,))?
//!     .fetch_one(&mut p)?;
//! assert_eq!(p, Person { id: 42, name: "Ada".into() });
//! # Ok::<(), sqlrec::Error>(())
//! ```
#![allow(unsafe_code)]

mod connection;
mod error;
mod params;
mod record;
mod statement;
mod sys;
mod value;

pub use connection::{AccessMode, Connection, OpenOptions};
pub use error::{Error, Result};
pub use params::{Params, RecordParams};
pub use record::{DynRecord, FieldSpec, Fields, Record, Scalar};
pub use statement::{CursorState, RecordFactory, Rows, Statement, TypedView};
pub use value::{Datum, ScalarType, Slot, ToSql, Value};
