use std::{ffi::CString, marker::PhantomData, os::raw::c_int, path::Path, ptr::NonNull, rc::Rc};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    params::Params,
    statement::Statement,
    sys,
};

/// Access mode requested when opening a database.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
    /// Read-write, creating the database if it does not exist.
    #[default]
    ReadWriteCreate,
}

impl AccessMode {
    fn flags(self) -> c_int {
        match self {
            AccessMode::ReadOnly => sys::OPEN_READONLY,
            AccessMode::ReadWrite => sys::OPEN_READWRITE,
            AccessMode::ReadWriteCreate => sys::OPEN_READWRITE | sys::OPEN_CREATE,
        }
    }
}

/// Options for opening a [`Connection`].
///
/// ```no_run
/// use sqlrec::{AccessMode, OpenOptions};
///
/// let conn = OpenOptions::new()
///     .mode(AccessMode::ReadOnly)
///     .open("app.db")?;
/// # Ok::<(), sqlrec::Error>(())
/// ```
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    mode: AccessMode,
    uri: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Interpret the location as a `file:` URI.
    pub fn uri(mut self, uri: bool) -> Self {
        self.uri = uri;
        self
    }

    fn flags(&self) -> c_int {
        let mut flags = self.mode.flags();
        if self.uri {
            flags |= sys::OPEN_URI;
        }
        flags
    }

    pub fn open(&self, location: impl AsRef<Path>) -> Result<Connection> {
        let location = location.as_ref();
        let shown = location.display().to_string();
        let path = location
            .to_str()
            .ok_or_else(|| {
                Error::connection(sys::CANTOPEN, format!("{shown}: path is not valid UTF-8"))
            })
            .and_then(|p| {
                CString::new(p).map_err(|_| {
                    Error::connection(sys::CANTOPEN, format!("{shown}: path contains NUL"))
                })
            })?;

        let (rc, db) = unsafe { sys::open(&path, self.flags()) };
        if rc != sys::OK {
            let message = unsafe { sys::diagnostic(db, rc) };
            if !db.is_null() {
                unsafe { sys::close(db) };
            }
            return Err(Error::connection(rc, format!("{shown}: {message}")));
        }
        let db = NonNull::new(db).ok_or_else(|| {
            Error::connection(sys::CANTOPEN, format!("{shown}: engine returned null db"))
        })?;

        debug!(location = %shown, mode = ?self.mode, "opened database");
        Ok(Connection {
            db: Some(db),
            _nosend: PhantomData,
        })
    }
}

/// One open handle to the embedded engine.
///
/// The handle is released exactly once: by [`close`](Self::close) or on drop.
/// Statements borrow the connection, so it cannot be closed while one is alive.
pub struct Connection {
    db: Option<NonNull<sys::Db>>,
    // make !Send + !Sync like rusqlite::Connection
    _nosend: PhantomData<Rc<()>>,
}

impl Connection {
    pub fn open(location: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        OpenOptions::new().mode(mode).open(location)
    }

    pub fn open_in_memory() -> Result<Self> {
        OpenOptions::new().open(":memory:")
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    fn handle(&self) -> Result<NonNull<sys::Db>> {
        self.db
            .ok_or_else(|| Error::connection(sys::MISUSE, "connection is closed"))
    }

    /// Prepare `sql` and bind `params` to its placeholders in order.
    ///
    /// No row is fetched yet. A preparation failure leaves the connection usable.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<Statement<'_>> {
        let mut stmt = Statement::prepare(self.handle()?, sql)?;
        stmt.bind(&params)?;
        Ok(stmt)
    }

    /// Execute `sql` and step it to completion, discarding any rows.
    pub fn run<P: Params>(&self, sql: &str, params: P) -> Result<()> {
        self.execute(sql, params)?.run()
    }

    /// Release the handle. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(db) = self.db.take() else {
            return Ok(());
        };
        let rc = unsafe { sys::close(db.as_ptr()) };
        if rc != sys::OK {
            return Err(Error::connection(rc, sys::errstr(rc)));
        }
        debug!("closed database");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            let rc = unsafe { sys::close(db.as_ptr()) };
            if rc != sys::OK {
                warn!(code = rc, "closing database failed: {}", sys::errstr(rc));
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .finish()
    }
}
