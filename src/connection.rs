use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use rusqlite::OpenFlags as EngineOpenFlags;
use tracing::debug;

use crate::command::DataCommand;
use crate::error::{DbError, DbResult};
use crate::sync::{NaiveSynchronizationObject, SyncScope, SynchronizationObject};
use crate::value::SqlValue;

/// Engine-extension selection at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlags {
    /// Plain database, no extra modules.
    None,
    /// Request the engine's full-text index module. The bundled engine
    /// compiles it in, so the flag records intent only; open semantics are
    /// identical with and without it.
    FullTextExtension,
}

/// Access mode for the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFlags {
    /// Existing file, reads only.
    ReadOnly,
    /// Reads and writes; the file is created when missing. The parent
    /// directory must already exist.
    ReadWrite,
}

/// An open handle to one embedded database file.
///
/// Every operation that touches the native handle acquires the connection's
/// [`SynchronizationObject`] first and releases it when the call completes,
/// error paths included. The type is deliberately not `Sync`: each thread
/// opens its own connection against the shared file, and the synchronization
/// object arbitrates between them. No operation retries internally; a
/// busy/locked engine surfaces as [`DbError::ExecutionError`].
pub struct SqlConnection {
    handle: rusqlite::Connection,
    sync: Box<dyn SynchronizationObject>,
    path: PathBuf,
    in_transaction: Cell<bool>,
    last_error: RefCell<Option<String>>,
}

impl SqlConnection {
    /// Open (creating if permitted) the database at `path`, serialized by a
    /// [`NaiveSynchronizationObject`] for that path.
    ///
    /// # Errors
    /// Returns [`DbError::ConnectionBroken`] when the path is unreachable,
    /// the file is not a valid database, or the requested access mode cannot
    /// be granted.
    pub fn open(
        path: impl AsRef<Path>,
        open_flags: OpenFlags,
        access_flags: AccessFlags,
    ) -> DbResult<Self> {
        let sync = Box::new(NaiveSynchronizationObject::new(path.as_ref()));
        Self::open_with_synchronization(path, open_flags, access_flags, sync)
    }

    /// Open with a caller-supplied synchronization object, which the
    /// connection owns for its lifetime.
    ///
    /// # Errors
    /// Returns [`DbError::ConnectionBroken`] when the path is unreachable,
    /// the file is not a valid database, or the requested access mode cannot
    /// be granted.
    pub fn open_with_synchronization(
        path: impl AsRef<Path>,
        open_flags: OpenFlags,
        access_flags: AccessFlags,
        sync: Box<dyn SynchronizationObject>,
    ) -> DbResult<Self> {
        let path = path.as_ref();
        let engine_flags = match access_flags {
            AccessFlags::ReadOnly => EngineOpenFlags::SQLITE_OPEN_READ_ONLY,
            AccessFlags::ReadWrite => {
                EngineOpenFlags::SQLITE_OPEN_READ_WRITE | EngineOpenFlags::SQLITE_OPEN_CREATE
            }
        } | EngineOpenFlags::SQLITE_OPEN_NO_MUTEX;

        let handle = {
            let _scope = SyncScope::enter(sync.as_ref());
            let handle = rusqlite::Connection::open_with_flags(path, engine_flags)
                .map_err(|e| open_failure(path, &e))?;
            // The engine defers validity checks to the first statement;
            // probe here so a corrupt or non-database file fails at open.
            handle
                .query_row("PRAGMA schema_version", [], |_| Ok(()))
                .map_err(|e| open_failure(path, &e))?;
            handle
        };

        if open_flags == OpenFlags::FullTextExtension {
            debug!(path = %path.display(), "full-text index module requested");
        }
        debug!(path = %path.display(), ?access_flags, "database opened");

        Ok(Self {
            handle,
            sync,
            path: path.to_path_buf(),
            in_transaction: Cell::new(false),
            last_error: RefCell::new(None),
        })
    }

    /// Execute one complete SQL statement immediately; no result rows are
    /// returned. Suitable for DDL and unparameterized DML.
    ///
    /// # Errors
    /// Returns [`DbError::SyntaxError`] for empty or malformed SQL, and
    /// [`DbError::ExecutionError`] when the engine fails during the step
    /// (constraint violation, busy/locked).
    pub fn exec_command(&self, sql: &str) -> DbResult<()> {
        if sql.trim().is_empty() {
            return Err(DbError::SyntaxError("empty SQL text".into()));
        }
        let _scope = SyncScope::enter(self.sync.as_ref());
        let mut stmt = self
            .handle
            .prepare(sql)
            .map_err(|e| self.fail(DbError::SyntaxError, &e))?;
        let mut rows = stmt.raw_query();
        // Step once; a returned row is discarded, completion is success.
        rows.next()
            .map_err(|e| self.fail(DbError::ExecutionError, &e))?;
        Ok(())
    }

    /// Compile `sql` into a [`DataCommand`] bound to this connection. The
    /// compiled form stays in the connection's statement cache until the
    /// command is dropped, so re-execution after `reset` does not re-parse.
    ///
    /// # Errors
    /// Returns [`DbError::SyntaxError`] for empty or invalid SQL.
    pub fn prepare_data_command(&self, sql: &str) -> DbResult<DataCommand<'_>> {
        if sql.trim().is_empty() {
            return Err(DbError::SyntaxError("empty SQL text".into()));
        }
        let (parameter_count, column_count) = {
            let _scope = SyncScope::enter(self.sync.as_ref());
            let stmt = self
                .handle
                .prepare_cached(sql)
                .map_err(|e| self.fail(DbError::SyntaxError, &e))?;
            (stmt.parameter_count(), stmt.column_count())
        };
        Ok(DataCommand::new(self, sql, parameter_count, column_count))
    }

    /// Begin a transaction.
    ///
    /// # Errors
    /// Returns [`DbError::InternalError`] when a transaction is already open
    /// on this connection; transactions do not nest.
    pub fn begin_transaction(&self) -> DbResult<()> {
        if self.in_transaction.get() {
            return Err(DbError::InternalError(
                "transaction already open on this connection".into(),
            ));
        }
        self.run_batch("BEGIN")?;
        self.in_transaction.set(true);
        debug!(path = %self.path.display(), "transaction begun");
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// Returns [`DbError::InternalError`] when no transaction is open, or
    /// [`DbError::ExecutionError`] when the engine rejects the commit.
    pub fn commit_transaction(&self) -> DbResult<()> {
        if !self.in_transaction.get() {
            return Err(DbError::InternalError(
                "no transaction open on this connection".into(),
            ));
        }
        self.run_batch("COMMIT")?;
        self.in_transaction.set(false);
        debug!(path = %self.path.display(), "transaction committed");
        Ok(())
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Returns [`DbError::InternalError`] when no transaction is open, or
    /// [`DbError::ExecutionError`] when the engine rejects the rollback.
    pub fn rollback_transaction(&self) -> DbResult<()> {
        if !self.in_transaction.get() {
            return Err(DbError::InternalError(
                "no transaction open on this connection".into(),
            ));
        }
        self.run_batch("ROLLBACK")?;
        self.in_transaction.set(false);
        debug!(path = %self.path.display(), "transaction rolled back");
        Ok(())
    }

    /// The native error message of the most recent failed operation, for
    /// diagnostic logging only. The typed error already carries the message
    /// that matters to callers.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    /// Path this connection was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle. Outstanding [`DataCommand`]s borrow the connection,
    /// so this cannot be called while any are alive; dropping the connection
    /// closes it implicitly.
    ///
    /// # Errors
    /// Returns [`DbError::ConnectionBroken`] when the engine fails to close.
    pub fn close(self) -> DbResult<()> {
        let SqlConnection {
            handle, sync, path, ..
        } = self;
        let _scope = SyncScope::enter(sync.as_ref());
        handle
            .close()
            .map_err(|(_, e)| DbError::ConnectionBroken(format!("cannot close {}: {e}", path.display())))?;
        debug!(path = %path.display(), "database closed");
        Ok(())
    }

    /// Execute a cached statement with bound parameters and buffer every
    /// result row inside one serialized native call.
    pub(crate) fn run_prepared(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> DbResult<Vec<Vec<SqlValue>>> {
        let _scope = SyncScope::enter(self.sync.as_ref());
        let mut stmt = self
            .handle
            .prepare_cached(sql)
            .map_err(|e| self.fail(DbError::SyntaxError, &e))?;
        let column_count = stmt.column_count();
        let engine_params = rusqlite::params_from_iter(params.iter().map(SqlValue::to_engine));
        let mut rows = stmt
            .query(engine_params)
            .map_err(|e| self.fail(DbError::ExecutionError, &e))?;

        let mut buffered = Vec::new();
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut values = Vec::with_capacity(column_count);
                    for index in 0..column_count {
                        let value = row
                            .get_ref(index)
                            .map_err(|e| self.fail(DbError::ExecutionError, &e))?;
                        values.push(SqlValue::from_engine(value));
                    }
                    buffered.push(values);
                }
                Ok(None) => break,
                Err(e) => return Err(self.fail(DbError::ExecutionError, &e)),
            }
        }
        Ok(buffered)
    }

    /// Record the native message and wrap it in the given kind.
    fn fail(&self, kind: fn(String) -> DbError, err: &rusqlite::Error) -> DbError {
        let message = err.to_string();
        *self.last_error.borrow_mut() = Some(message.clone());
        kind(message)
    }

    fn run_batch(&self, sql: &str) -> DbResult<()> {
        let _scope = SyncScope::enter(self.sync.as_ref());
        self.handle
            .execute_batch(sql)
            .map_err(|e| self.fail(DbError::ExecutionError, &e))
    }
}

impl std::fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlConnection")
            .field("path", &self.path)
            .field("in_transaction", &self.in_transaction.get())
            .finish_non_exhaustive()
    }
}

fn open_failure(path: &Path, err: &rusqlite::Error) -> DbError {
    DbError::ConnectionBroken(format!("cannot open {}: {e}", path.display(), e = err))
}
