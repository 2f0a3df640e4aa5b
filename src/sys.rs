//! Engine capability surface.
//!
//! Everything the mapping layer needs from SQLite goes through this module:
//! open/close, prepare/finalize, the typed binders, step, and the column readers.
//! The wrappers stay `unsafe` where the caller must guarantee handle validity.

use std::{
    ffi::CStr,
    os::raw::{c_char, c_int},
    ptr,
};

use libsqlite3_sys as ffi;

pub use ffi::{sqlite3 as Db, sqlite3_stmt as Stmt};

pub const OK: c_int = ffi::SQLITE_OK;
pub const ROW: c_int = ffi::SQLITE_ROW;
pub const DONE: c_int = ffi::SQLITE_DONE;
pub const ERROR: c_int = ffi::SQLITE_ERROR;
pub const MISUSE: c_int = ffi::SQLITE_MISUSE;
pub const CANTOPEN: c_int = ffi::SQLITE_CANTOPEN;
pub const TOOBIG: c_int = ffi::SQLITE_TOOBIG;
pub const MISMATCH: c_int = ffi::SQLITE_MISMATCH;
pub const RANGE: c_int = ffi::SQLITE_RANGE;

pub const OPEN_READONLY: c_int = ffi::SQLITE_OPEN_READONLY;
pub const OPEN_READWRITE: c_int = ffi::SQLITE_OPEN_READWRITE;
pub const OPEN_CREATE: c_int = ffi::SQLITE_OPEN_CREATE;
pub const OPEN_URI: c_int = ffi::SQLITE_OPEN_URI;

/// Result of `sqlite3_step`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    Row,
    Done,
    Error(c_int),
}

/// Open `path` with `flags`. On failure the engine may still hand back a handle
/// (carrying the diagnostic); it is returned so the caller can read it and close it.
pub unsafe fn open(path: &CStr, flags: c_int) -> (c_int, *mut Db) {
    let mut db: *mut Db = ptr::null_mut();
    let rc = ffi::sqlite3_open_v2(path.as_ptr(), &mut db, flags, ptr::null());
    (rc, db)
}

pub unsafe fn close(db: *mut Db) -> c_int {
    ffi::sqlite3_close_v2(db)
}

/// Prepare the first statement of `sql`. Returns the result code, the statement
/// handle (null for empty input) and the byte offset where unparsed text begins.
pub unsafe fn prepare(db: *mut Db, sql: &str) -> (c_int, *mut Stmt, usize) {
    let mut stmt: *mut Stmt = ptr::null_mut();
    let mut tail: *const c_char = ptr::null();
    let Ok(len) = c_int::try_from(sql.len()) else {
        return (TOOBIG, stmt, 0);
    };
    let head = sql.as_ptr() as *const c_char;
    let rc = ffi::sqlite3_prepare_v2(db, head, len, &mut stmt, &mut tail);
    let consumed = if tail.is_null() {
        sql.len()
    } else {
        (tail as usize).saturating_sub(head as usize)
    };
    (rc, stmt, consumed)
}

pub unsafe fn finalize(stmt: *mut Stmt) -> c_int {
    ffi::sqlite3_finalize(stmt)
}

pub unsafe fn bind_int(stmt: *mut Stmt, pos: c_int, v: i32) -> c_int {
    ffi::sqlite3_bind_int(stmt, pos, v)
}

pub unsafe fn bind_int64(stmt: *mut Stmt, pos: c_int, v: i64) -> c_int {
    ffi::sqlite3_bind_int64(stmt, pos, v)
}

pub unsafe fn bind_double(stmt: *mut Stmt, pos: c_int, v: f64) -> c_int {
    ffi::sqlite3_bind_double(stmt, pos, v)
}

/// Length-prefixed text binding; embedded NUL bytes survive. The engine copies the bytes.
pub unsafe fn bind_text(stmt: *mut Stmt, pos: c_int, text: &[u8]) -> c_int {
    let Ok(len) = c_int::try_from(text.len()) else {
        return TOOBIG;
    };
    ffi::sqlite3_bind_text(
        stmt,
        pos,
        text.as_ptr() as *const c_char,
        len,
        ffi::SQLITE_TRANSIENT(),
    )
}

pub unsafe fn bind_null(stmt: *mut Stmt, pos: c_int) -> c_int {
    ffi::sqlite3_bind_null(stmt, pos)
}

pub unsafe fn step(stmt: *mut Stmt) -> Step {
    match ffi::sqlite3_step(stmt) {
        ROW => Step::Row,
        DONE => Step::Done,
        rc => Step::Error(rc),
    }
}

pub unsafe fn column_count(stmt: *mut Stmt) -> usize {
    usize::try_from(ffi::sqlite3_column_count(stmt)).unwrap_or(0)
}

/// Column name bytes, or `None` if the engine could not produce one (OOM).
pub unsafe fn column_name<'a>(stmt: *mut Stmt, index: usize) -> Option<&'a [u8]> {
    let p = ffi::sqlite3_column_name(stmt, index as c_int);
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_bytes())
    }
}

pub unsafe fn column_int(stmt: *mut Stmt, index: usize) -> i32 {
    ffi::sqlite3_column_int(stmt, index as c_int)
}

pub unsafe fn column_int64(stmt: *mut Stmt, index: usize) -> i64 {
    ffi::sqlite3_column_int64(stmt, index as c_int)
}

pub unsafe fn column_double(stmt: *mut Stmt, index: usize) -> f64 {
    ffi::sqlite3_column_double(stmt, index as c_int)
}

/// Text of a column with its explicit byte length. Valid until the next step or finalize.
pub unsafe fn column_text<'a>(stmt: *mut Stmt, index: usize) -> &'a [u8] {
    // text before bytes: the length must describe the converted representation
    let p = ffi::sqlite3_column_text(stmt, index as c_int);
    let n = ffi::sqlite3_column_bytes(stmt, index as c_int);
    if p.is_null() || n <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(p, n as usize)
}

/// Most recent diagnostic recorded on `db`.
pub unsafe fn errmsg(db: *mut Db) -> String {
    if db.is_null() {
        return String::new();
    }
    let p = ffi::sqlite3_errmsg(db);
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

/// Diagnostic for a failed call: the handle's message when it has one,
/// otherwise the generic text for `rc`.
pub unsafe fn diagnostic(db: *mut Db, rc: c_int) -> String {
    let msg = errmsg(db);
    if msg.is_empty() || rc != ffi::sqlite3_errcode(db) {
        errstr(rc)
    } else {
        msg
    }
}

/// Static description of a result code.
pub fn errstr(rc: c_int) -> String {
    let p = unsafe { ffi::sqlite3_errstr(rc) };
    if p.is_null() {
        return format!("sqlite result code {rc}");
    }
    unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
}
