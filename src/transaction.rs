use tracing::warn;

use crate::connection::SqlConnection;
use crate::error::DbResult;

/// Guard that opens a transaction and guarantees it is closed on every exit
/// path: committed explicitly, rolled back otherwise.
///
/// A rollback failure during drop is logged and swallowed so it never masks
/// an error already unwinding through the caller.
pub struct ScopedTransaction<'conn> {
    conn: &'conn SqlConnection,
    committed: bool,
}

impl<'conn> ScopedTransaction<'conn> {
    /// Begin a transaction on `conn`.
    ///
    /// # Errors
    /// Propagates the begin failure, including [`DbError::InternalError`]
    /// when a transaction is already open on this connection.
    ///
    /// [`DbError::InternalError`]: crate::DbError::InternalError
    pub fn new(conn: &'conn SqlConnection) -> DbResult<Self> {
        conn.begin_transaction()?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    /// Commit the transaction.
    ///
    /// # Errors
    /// Propagates the commit failure; the guard then attempts a rollback on
    /// drop.
    pub fn commit(mut self) -> DbResult<()> {
        self.conn.commit_transaction()?;
        self.committed = true;
        Ok(())
    }
}

impl std::fmt::Debug for ScopedTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedTransaction")
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl Drop for ScopedTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = self.conn.rollback_transaction() {
            warn!(error = %err, "implicit rollback failed");
        }
    }
}
