use std::{fmt, marker::PhantomData, os::raw::c_int, ptr::NonNull, rc::Rc};

use tracing::{debug, trace};

use crate::{
    connection::Connection,
    error::{Error, Result},
    params::Params,
    record::{DynRecord, FieldSpec, Fields, Record},
    sys,
    value::{Slot, Value},
};

/// Where a statement's cursor stands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    RowAvailable,
    Exhausted,
    Errored,
}

/// For each result column, the index of the field it fills, if any.
type ColumnPlan = Vec<Option<usize>>;

/// A prepared, bound statement and its cursor.
///
/// Produced by [`Connection::execute`]. Preparation and binding have already
/// happened; rows are fetched lazily by [`fetch_one`](Self::fetch_one),
/// [`for_each`](Self::for_each), [`rows`](Self::rows) and friends. The cursor is
/// single-pass: once exhausted, further consumption yields nothing.
///
/// The native statement is finalized on drop, however many rows were consumed.
pub struct Statement<'conn> {
    stmt: NonNull<sys::Stmt>,
    db: NonNull<sys::Db>,
    columns: Vec<String>,
    state: CursorState,
    failure: Option<Error>,
    _conn: PhantomData<&'conn Connection>,
    // !Send + !Sync, same as the connection
    _nosend: PhantomData<Rc<()>>,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn prepare(db: NonNull<sys::Db>, sql: &str) -> Result<Self> {
        let (rc, raw, consumed) = unsafe { sys::prepare(db.as_ptr(), sql) };
        if rc != sys::OK {
            if !raw.is_null() {
                unsafe { sys::finalize(raw) };
            }
            return Err(Error::query(rc, unsafe { sys::diagnostic(db.as_ptr(), rc) }));
        }
        let stmt = NonNull::new(raw)
            .ok_or_else(|| Error::query(sys::ERROR, "statement contains no SQL"))?;

        let rest = sql.get(consumed..).unwrap_or_default().trim();
        if !rest.is_empty() {
            debug!(ignored = rest, "only the first SQL statement was prepared");
        }

        // Owned from here on: any failure below finalizes through Drop.
        let mut out = Self {
            stmt,
            db,
            columns: Vec::new(),
            state: CursorState::NotStarted,
            failure: None,
            _conn: PhantomData,
            _nosend: PhantomData,
        };

        out.columns = out.read_columns().map_err(|(code, message)| Error::query(code, message))?;
        let count = out.columns.len();

        debug!(sql, columns = count, "prepared statement");
        Ok(out)
    }

    /// Bind `params` to placeholders `1..=n`, left to right.
    pub(crate) fn bind<P: Params + ?Sized>(&mut self, params: &P) -> Result<()> {
        let stmt = self.stmt.as_ptr();
        let mut position = 0usize;
        params.bind_each(&mut |value| {
            position += 1;
            let Ok(at) = c_int::try_from(position) else {
                return Err(Error::bind(position, sys::RANGE));
            };
            let rc = unsafe {
                match value {
                    Value::Null => sys::bind_null(stmt, at),
                    Value::Int(v) => sys::bind_int(stmt, at, v),
                    Value::Int64(v) => sys::bind_int64(stmt, at, v),
                    Value::Double(v) => sys::bind_double(stmt, at, v),
                    Value::Text(v) => sys::bind_text(stmt, at, v.as_bytes()),
                }
            };
            if rc == sys::OK {
                Ok(())
            } else {
                Err(Error::bind(position, rc))
            }
        })?;
        trace!(bound = position, "bound statement arguments");
        Ok(())
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Result column names as the engine reports them right now.
    fn read_columns(&self) -> std::result::Result<Vec<String>, (c_int, String)> {
        let stmt = self.stmt.as_ptr();
        let count = unsafe { sys::column_count(stmt) };
        (0..count)
            .map(|i| {
                let name = unsafe { sys::column_name(stmt, i) }
                    .ok_or_else(|| (sys::ERROR, format!("engine returned no name for column {i}")))?;
                std::str::from_utf8(name)
                    .map(str::to_owned)
                    .map_err(|_| (sys::MISMATCH, format!("column {i} name is not valid UTF-8")))
            })
            .collect()
    }

    /// Re-read the column names after a step. The engine silently re-prepares a
    /// statement whose schema changed, so names read at preparation may be stale.
    fn refresh_columns(&mut self) -> Result<()> {
        match self.read_columns() {
            Ok(columns) => {
                if columns != self.columns {
                    debug!(?columns, "result columns changed since preparation");
                    self.columns = columns;
                }
                Ok(())
            }
            Err((code, message)) => Err(self.fail(Error::row_fetch(code, message))),
        }
    }

    /// Mark the cursor errored; later steps return `err` again.
    fn fail(&mut self, err: Error) -> Error {
        self.state = CursorState::Errored;
        self.failure = Some(err.clone());
        err
    }

    /// Advance the cursor one row. `Ok(false)` once exhausted; the engine is
    /// never stepped again after that.
    fn step(&mut self) -> Result<bool> {
        match self.state {
            CursorState::Exhausted => return Ok(false),
            CursorState::Errored => {
                return Err(self.failure.clone().unwrap_or_else(|| {
                    Error::row_fetch(sys::MISUSE, "statement previously failed")
                }))
            }
            CursorState::NotStarted | CursorState::RowAvailable => {}
        }

        match unsafe { sys::step(self.stmt.as_ptr()) } {
            sys::Step::Row => {
                self.state = CursorState::RowAvailable;
                Ok(true)
            }
            sys::Step::Done => {
                self.state = CursorState::Exhausted;
                trace!("cursor exhausted");
                Ok(false)
            }
            sys::Step::Error(rc) => {
                let err = Error::row_fetch(rc, unsafe { sys::diagnostic(self.db.as_ptr(), rc) });
                Err(self.fail(err))
            }
        }
    }

    /// Match result columns to fields of `target`: each column goes to the first
    /// field with the same name that no earlier column has claimed.
    fn plan<F: Fields + ?Sized>(&self, target: &F) -> ColumnPlan {
        let mut filled = vec![false; target.field_count()];
        self.columns
            .iter()
            .map(|column| {
                let hit = (0..filled.len())
                    .find(|&i| !filled[i] && target.field_name(i) == Some(column.as_str()));
                if let Some(i) = hit {
                    filled[i] = true;
                }
                hit
            })
            .collect()
    }

    /// Populate `target` from the current row. A failed read errors the cursor
    /// like a failed step does.
    fn fill<F: Fields + ?Sized>(&mut self, plan: &[Option<usize>], target: &mut F) -> Result<()> {
        for (column, field) in plan.iter().enumerate() {
            let Some(slot) = field.and_then(|f| target.field_slot(f)) else {
                continue;
            };
            if let Err(err) = self.read_column(column, slot) {
                return Err(self.fail(err));
            }
        }
        Ok(())
    }

    /// Read the current row's `column` through the reader matching the slot type.
    /// Engine coercion applies when the column holds another storage class.
    fn read_column(&self, column: usize, slot: Slot<'_>) -> Result<()> {
        let stmt = self.stmt.as_ptr();
        match slot {
            Slot::Int(v) => *v = unsafe { sys::column_int(stmt, column) },
            Slot::Int64(v) => *v = unsafe { sys::column_int64(stmt, column) },
            Slot::Float(v) => *v = unsafe { sys::column_double(stmt, column) } as f32,
            Slot::Double(v) => *v = unsafe { sys::column_double(stmt, column) },
            Slot::Text(v) => {
                let bytes = unsafe { sys::column_text(stmt, column) };
                let text = std::str::from_utf8(bytes).map_err(|_| {
                    Error::row_fetch(
                        sys::MISMATCH,
                        format!("column `{}` is not valid UTF-8", self.columns[column]),
                    )
                })?;
                v.clear();
                v.push_str(text);
            }
        }
        Ok(())
    }

    /// Step exactly once and populate `target` from the row.
    ///
    /// Fails with [`Error::NoRow`] if the cursor is exhausted instead. Fields
    /// without a matching column keep their current value.
    pub fn fetch_one<F: Fields + ?Sized>(&mut self, target: &mut F) -> Result<()> {
        if !self.step()? {
            return Err(Error::NoRow);
        }
        self.refresh_columns()?;
        let plan = self.plan(target);
        self.fill(&plan, target)
    }

    /// [`fetch_one`](Self::fetch_one) into a fresh record.
    pub fn fetch<R: Record>(&mut self) -> Result<R> {
        let mut record = R::default();
        self.fetch_one(&mut record)?;
        Ok(record)
    }

    /// Lazy iterator over the remaining rows, each populating a fresh `R`.
    pub fn rows<R: Record>(&mut self) -> Rows<'_, 'conn, fn() -> R> {
        Rows::new(self, R::default as fn() -> R)
    }

    /// Lazy iterator over the remaining rows, each populating a record made by `factory`.
    pub fn rows_with<F: RecordFactory>(&mut self, factory: F) -> Rows<'_, 'conn, F> {
        Rows::new(self, factory)
    }

    /// Call `visit` with a fresh record for every remaining row, in result order.
    ///
    /// Runs until the cursor is exhausted; an engine failure stops the loop and is
    /// returned.
    pub fn for_each<R, V>(&mut self, mut visit: V) -> Result<()>
    where
        R: Record,
        V: FnMut(R),
    {
        for record in self.rows::<R>() {
            visit(record?);
        }
        Ok(())
    }

    /// Append every remaining row to `target`, preserving order and existing elements.
    pub fn collect_into<R, E>(&mut self, target: &mut E) -> Result<()>
    where
        R: Record,
        E: Extend<R>,
    {
        self.for_each(|record: R| target.extend(Some(record)))
    }

    pub fn collect<R: Record>(&mut self) -> Result<Vec<R>> {
        self.rows().collect()
    }

    /// Step to exhaustion, discarding rows.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? {}
        Ok(())
    }

    /// A view producing records shaped by `specs` instead of a declared type.
    pub fn typed(&mut self, specs: &[FieldSpec]) -> TypedView<'_, 'conn> {
        TypedView {
            stmt: self,
            shape: Rc::from(specs),
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        unsafe { sys::finalize(self.stmt.as_ptr()) };
        trace!(state = ?self.state, "finalized statement");
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("columns", &self.columns)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// -------------------------- Rows --------------------------

/// Source of the fresh record each row is written into; see [`Statement::rows_with`].
pub trait RecordFactory {
    type Record: Fields;

    fn make(&mut self) -> Self::Record;
}

impl<T: Fields> RecordFactory for fn() -> T {
    type Record = T;

    fn make(&mut self) -> T {
        (*self)()
    }
}

impl RecordFactory for Rc<[FieldSpec]> {
    type Record = DynRecord;

    fn make(&mut self) -> DynRecord {
        DynRecord::with_shape(Rc::clone(self))
    }
}

/// Single-pass iterator over a statement's remaining rows.
///
/// Yields `Err` at most once: after an engine failure the iterator is fused.
pub struct Rows<'s, 'conn, F> {
    stmt: &'s mut Statement<'conn>,
    factory: F,
    plan: Option<ColumnPlan>,
    done: bool,
}

impl<'s, 'conn, F: RecordFactory> Rows<'s, 'conn, F> {
    fn new(stmt: &'s mut Statement<'conn>, factory: F) -> Self {
        Self {
            stmt,
            factory,
            plan: None,
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Option<F::Record>> {
        if !self.stmt.step()? {
            return Ok(None);
        }
        let mut record = self.factory.make();
        // every record from one factory has the same field names, so one plan serves all rows
        if self.plan.is_none() {
            self.stmt.refresh_columns()?;
            self.plan = Some(self.stmt.plan(&record));
        }
        let plan = self.plan.as_deref().unwrap_or_default();
        self.stmt.fill(plan, &mut record)?;
        Ok(Some(record))
    }
}

impl<F: RecordFactory> Iterator for Rows<'_, '_, F> {
    type Item = Result<F::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// -------------------------- TypedView --------------------------

/// Row consumption with an ad hoc record shape; see [`Statement::typed`].
pub struct TypedView<'s, 'conn> {
    stmt: &'s mut Statement<'conn>,
    shape: Rc<[FieldSpec]>,
}

impl<'conn> TypedView<'_, 'conn> {
    pub fn specs(&self) -> &[FieldSpec] {
        &self.shape
    }

    pub fn rows(&mut self) -> Rows<'_, 'conn, Rc<[FieldSpec]>> {
        Rows::new(&mut *self.stmt, Rc::clone(&self.shape))
    }

    pub fn fetch_one(&mut self) -> Result<DynRecord> {
        let mut record = DynRecord::with_shape(Rc::clone(&self.shape));
        self.stmt.fetch_one(&mut record)?;
        Ok(record)
    }

    pub fn for_each<V: FnMut(DynRecord)>(&mut self, mut visit: V) -> Result<()> {
        for record in self.rows() {
            visit(record?);
        }
        Ok(())
    }

    pub fn collect_into<E: Extend<DynRecord>>(&mut self, target: &mut E) -> Result<()> {
        self.for_each(|record| target.extend(Some(record)))
    }

    pub fn collect(&mut self) -> Result<Vec<DynRecord>> {
        self.rows().collect()
    }
}
