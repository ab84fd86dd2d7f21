use crate::connection::SqlConnection;
use crate::error::{DbError, DbResult};
use crate::value::SqlValue;

/// Cursor position of a prepared command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Bindable; nothing executed since creation or the last `reset`.
    Unexecuted,
    /// A row is available for column reads.
    RowAvailable,
    /// The statement ran to completion; `reset` before stepping again.
    Exhausted,
}

/// One compiled SQL statement with its parameter and row-cursor state.
///
/// Parameters bind 1-indexed while the command is unexecuted. The first
/// `step` runs the statement as a single serialized native call, buffering
/// any result rows; further `step`s walk the buffer without touching the
/// engine. `reset` clears bindings and cursor so the command can run again
/// without recompiling.
///
/// A command borrows its parent [`SqlConnection`], so the connection cannot
/// be closed (or outlived) while the command is alive, and the command
/// cannot move to another thread.
pub struct DataCommand<'conn> {
    conn: &'conn SqlConnection,
    sql: String,
    parameter_count: usize,
    column_count: usize,
    bindings: Vec<Option<SqlValue>>,
    rows: Vec<Vec<SqlValue>>,
    cursor: usize,
    state: CursorState,
}

impl<'conn> DataCommand<'conn> {
    pub(crate) fn new(
        conn: &'conn SqlConnection,
        sql: &str,
        parameter_count: usize,
        column_count: usize,
    ) -> Self {
        Self {
            conn,
            sql: sql.to_owned(),
            parameter_count,
            column_count,
            bindings: vec![None; parameter_count],
            rows: Vec::new(),
            cursor: 0,
            state: CursorState::Unexecuted,
        }
    }

    /// The raw SQL text of the statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `?` parameters the statement declares.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Number of result columns the statement declares.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    // --- binding -----------------------------------------------------------

    /// Bind an 8-bit integer at 1-based `position`.
    ///
    /// # Errors
    /// [`DbError::InvalidArgument`] for a position outside
    /// `1..=parameter_count`; [`DbError::InternalError`] when the command has
    /// been stepped and not reset.
    pub fn bind_int8(&mut self, position: usize, value: i8) -> DbResult<()> {
        self.bind(position, SqlValue::Int8(value))
    }

    /// Bind a 16-bit integer at 1-based `position`.
    pub fn bind_int16(&mut self, position: usize, value: i16) -> DbResult<()> {
        self.bind(position, SqlValue::Int16(value))
    }

    /// Bind a 32-bit integer at 1-based `position`.
    pub fn bind_int32(&mut self, position: usize, value: i32) -> DbResult<()> {
        self.bind(position, SqlValue::Int32(value))
    }

    /// Bind a 64-bit integer at 1-based `position`.
    pub fn bind_int64(&mut self, position: usize, value: i64) -> DbResult<()> {
        self.bind(position, SqlValue::Int64(value))
    }

    /// Bind a 32-bit float at 1-based `position`.
    pub fn bind_float(&mut self, position: usize, value: f32) -> DbResult<()> {
        self.bind(position, SqlValue::Float(value))
    }

    /// Bind a 64-bit float at 1-based `position`.
    pub fn bind_double(&mut self, position: usize, value: f64) -> DbResult<()> {
        self.bind(position, SqlValue::Double(value))
    }

    /// Bind text at 1-based `position`.
    pub fn bind_string(&mut self, position: usize, value: &str) -> DbResult<()> {
        self.bind(position, SqlValue::Text(value.to_owned()))
    }

    /// Bind binary data at 1-based `position`.
    pub fn bind_blob(&mut self, position: usize, value: &[u8]) -> DbResult<()> {
        self.bind(position, SqlValue::Blob(value.to_vec()))
    }

    /// Bind SQL NULL at 1-based `position`.
    pub fn bind_null(&mut self, position: usize) -> DbResult<()> {
        self.bind(position, SqlValue::Null)
    }

    /// Bind an optional 8-bit integer; `None` binds SQL NULL.
    pub fn bind_optional_int8(&mut self, position: usize, value: Option<i8>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_int8(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind an optional 16-bit integer; `None` binds SQL NULL.
    pub fn bind_optional_int16(&mut self, position: usize, value: Option<i16>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_int16(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind an optional 32-bit integer; `None` binds SQL NULL.
    pub fn bind_optional_int32(&mut self, position: usize, value: Option<i32>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_int32(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind an optional 64-bit integer; `None` binds SQL NULL.
    pub fn bind_optional_int64(&mut self, position: usize, value: Option<i64>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_int64(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind an optional 32-bit float; `None` binds SQL NULL.
    pub fn bind_optional_float(&mut self, position: usize, value: Option<f32>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_float(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind an optional 64-bit float; `None` binds SQL NULL.
    pub fn bind_optional_double(&mut self, position: usize, value: Option<f64>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_double(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind optional text; `None` binds SQL NULL.
    pub fn bind_optional_string(&mut self, position: usize, value: Option<&str>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_string(position, v),
            None => self.bind_null(position),
        }
    }

    /// Bind optional binary data; `None` binds SQL NULL.
    pub fn bind_optional_blob(&mut self, position: usize, value: Option<&[u8]>) -> DbResult<()> {
        match value {
            Some(v) => self.bind_blob(position, v),
            None => self.bind_null(position),
        }
    }

    // --- execution ---------------------------------------------------------

    /// Advance the cursor. Returns `true` when a row is available for column
    /// reads, `false` when the statement is exhausted; a non-row-producing
    /// statement completes with `false` after one step.
    ///
    /// # Errors
    /// [`DbError::ExecutionError`] for engine failures (constraint violation,
    /// busy/locked), for an unbound parameter slot, and for stepping an
    /// exhausted command that was not reset.
    pub fn step(&mut self) -> DbResult<bool> {
        match self.state {
            CursorState::Unexecuted => {
                let params = self.collect_bindings()?;
                self.rows = self.conn.run_prepared(&self.sql, &params)?;
                self.cursor = 0;
                if self.rows.is_empty() {
                    self.state = CursorState::Exhausted;
                    Ok(false)
                } else {
                    self.state = CursorState::RowAvailable;
                    Ok(true)
                }
            }
            CursorState::RowAvailable => {
                self.cursor += 1;
                if self.cursor < self.rows.len() {
                    Ok(true)
                } else {
                    self.rows.clear();
                    self.state = CursorState::Exhausted;
                    Ok(false)
                }
            }
            CursorState::Exhausted => Err(DbError::ExecutionError(
                "statement exhausted; reset before stepping again".into(),
            )),
        }
    }

    /// Clear bound parameters and buffered rows and return the cursor to the
    /// unexecuted state. The compiled statement is kept; re-execution does
    /// not re-parse the SQL.
    pub fn reset(&mut self) {
        self.bindings = vec![None; self.parameter_count];
        self.rows.clear();
        self.cursor = 0;
        self.state = CursorState::Unexecuted;
    }

    // --- column reads ------------------------------------------------------

    /// Whether the 0-based `index` column of the current row is SQL NULL.
    ///
    /// # Errors
    /// [`DbError::InternalError`] when no row is available;
    /// [`DbError::InvalidArgument`] for an out-of-range index.
    pub fn is_column_null(&self, index: usize) -> DbResult<bool> {
        Ok(self.column_value(index)?.is_null())
    }

    /// Read column `index` as an 8-bit integer.
    ///
    /// # Errors
    /// [`DbError::InvalidArgument`] when the column is NULL, non-integer, or
    /// out of the 8-bit range; [`DbError::InternalError`] when no row is
    /// available.
    pub fn column_int8(&self, index: usize) -> DbResult<i8> {
        let wide = self.integer(index)?;
        i8::try_from(wide)
            .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "8 bits")))
    }

    /// Read column `index` as a 16-bit integer.
    pub fn column_int16(&self, index: usize) -> DbResult<i16> {
        let wide = self.integer(index)?;
        i16::try_from(wide)
            .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "16 bits")))
    }

    /// Read column `index` as a 32-bit integer.
    pub fn column_int32(&self, index: usize) -> DbResult<i32> {
        let wide = self.integer(index)?;
        i32::try_from(wide)
            .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "32 bits")))
    }

    /// Read column `index` as a 64-bit integer.
    pub fn column_int64(&self, index: usize) -> DbResult<i64> {
        self.integer(index)
    }

    /// Read column `index` as a 32-bit float.
    pub fn column_float(&self, index: usize) -> DbResult<f32> {
        Ok(self.column_double(index)? as f32)
    }

    /// Read column `index` as a 64-bit float. Integer columns widen.
    pub fn column_double(&self, index: usize) -> DbResult<f64> {
        match self.column_value(index)? {
            SqlValue::Double(v) => Ok(*v),
            SqlValue::Int64(v) => Ok(*v as f64),
            SqlValue::Null => Err(DbError::InvalidArgument(null_read(index))),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "float"))),
        }
    }

    /// Read column `index` as text. Integer and real columns are formatted
    /// as decimal text, matching the engine's column coercion.
    pub fn column_string(&self, index: usize) -> DbResult<String> {
        match self.column_value(index)? {
            SqlValue::Text(v) => Ok(v.clone()),
            SqlValue::Int64(v) => Ok(v.to_string()),
            SqlValue::Double(v) => Ok(v.to_string()),
            SqlValue::Null => Err(DbError::InvalidArgument(null_read(index))),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "text"))),
        }
    }

    /// Read column `index` as binary data.
    pub fn column_blob(&self, index: usize) -> DbResult<Vec<u8>> {
        match self.column_value(index)? {
            SqlValue::Blob(v) => Ok(v.clone()),
            SqlValue::Null => Err(DbError::InvalidArgument(null_read(index))),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "blob"))),
        }
    }

    /// Read column `index` as an optional 8-bit integer; NULL reads as
    /// `None`.
    pub fn column_optional_int8(&self, index: usize) -> DbResult<Option<i8>> {
        match self.optional_integer(index)? {
            None => Ok(None),
            Some(wide) => i8::try_from(wide)
                .map(Some)
                .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "8 bits"))),
        }
    }

    /// Read column `index` as an optional 16-bit integer; NULL reads as
    /// `None`.
    pub fn column_optional_int16(&self, index: usize) -> DbResult<Option<i16>> {
        match self.optional_integer(index)? {
            None => Ok(None),
            Some(wide) => i16::try_from(wide)
                .map(Some)
                .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "16 bits"))),
        }
    }

    /// Read column `index` as an optional 32-bit integer; NULL reads as
    /// `None`.
    pub fn column_optional_int32(&self, index: usize) -> DbResult<Option<i32>> {
        match self.optional_integer(index)? {
            None => Ok(None),
            Some(wide) => i32::try_from(wide)
                .map(Some)
                .map_err(|_| DbError::InvalidArgument(narrowing(index, wide, "32 bits"))),
        }
    }

    /// Read column `index` as an optional 64-bit integer; NULL reads as
    /// `None`.
    pub fn column_optional_int64(&self, index: usize) -> DbResult<Option<i64>> {
        self.optional_integer(index)
    }

    /// Read column `index` as an optional 32-bit float; NULL reads as
    /// `None`.
    pub fn column_optional_float(&self, index: usize) -> DbResult<Option<f32>> {
        Ok(self.column_optional_double(index)?.map(|v| v as f32))
    }

    /// Read column `index` as an optional 64-bit float; NULL reads as
    /// `None`.
    pub fn column_optional_double(&self, index: usize) -> DbResult<Option<f64>> {
        match self.column_value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Double(v) => Ok(Some(*v)),
            SqlValue::Int64(v) => Ok(Some(*v as f64)),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "float"))),
        }
    }

    /// Read column `index` as optional text; NULL reads as `None`.
    pub fn column_optional_string(&self, index: usize) -> DbResult<Option<String>> {
        match self.column_value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v.clone())),
            SqlValue::Int64(v) => Ok(Some(v.to_string())),
            SqlValue::Double(v) => Ok(Some(v.to_string())),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "text"))),
        }
    }

    /// Read column `index` as optional binary data; NULL reads as `None`.
    pub fn column_optional_blob(&self, index: usize) -> DbResult<Option<Vec<u8>>> {
        match self.column_value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Blob(v) => Ok(Some(v.clone())),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "blob"))),
        }
    }

    // --- internals ---------------------------------------------------------

    fn bind(&mut self, position: usize, value: SqlValue) -> DbResult<()> {
        if self.state != CursorState::Unexecuted {
            return Err(DbError::InternalError(
                "cannot bind after stepping; reset the command first".into(),
            ));
        }
        if position == 0 || position > self.parameter_count {
            return Err(DbError::InvalidArgument(format!(
                "bind position {position} outside 1..={}",
                self.parameter_count
            )));
        }
        self.bindings[position - 1] = Some(value);
        Ok(())
    }

    fn collect_bindings(&self) -> DbResult<Vec<SqlValue>> {
        let mut params = Vec::with_capacity(self.parameter_count);
        for (slot, value) in self.bindings.iter().enumerate() {
            match value {
                Some(v) => params.push(v.clone()),
                None => {
                    return Err(DbError::ExecutionError(format!(
                        "parameter {} was never bound",
                        slot + 1
                    )));
                }
            }
        }
        Ok(params)
    }

    fn column_value(&self, index: usize) -> DbResult<&SqlValue> {
        if self.state != CursorState::RowAvailable {
            return Err(DbError::InternalError(
                "no row available; step the command first".into(),
            ));
        }
        if index >= self.column_count {
            return Err(DbError::InvalidArgument(format!(
                "column index {index} outside 0..{}",
                self.column_count
            )));
        }
        Ok(&self.rows[self.cursor][index])
    }

    fn integer(&self, index: usize) -> DbResult<i64> {
        match self.column_value(index)? {
            SqlValue::Int64(v) => Ok(*v),
            SqlValue::Null => Err(DbError::InvalidArgument(null_read(index))),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "integer"))),
        }
    }

    fn optional_integer(&self, index: usize) -> DbResult<Option<i64>> {
        match self.column_value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int64(v) => Ok(Some(*v)),
            other => Err(DbError::InvalidArgument(type_mismatch(index, other, "integer"))),
        }
    }
}

impl std::fmt::Debug for DataCommand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCommand")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn null_read(index: usize) -> String {
    format!("column {index} is NULL; use the optional getter")
}

fn type_mismatch(index: usize, value: &SqlValue, wanted: &str) -> String {
    format!("column {index} holds {value:?}, not {wanted}")
}

fn narrowing(index: usize, value: i64, width: &str) -> String {
    format!("column {index} value {value} does not fit {width}")
}
