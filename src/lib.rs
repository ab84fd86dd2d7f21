//! Serialized access to an embedded `SQLite` database file from many threads.
//!
//! Each thread owns its own [`SqlConnection`]; every native call a connection
//! makes is bracketed by a [`SynchronizationObject`], so concurrent readers
//! and writers against the same file serialize at single-call granularity.
//! Statements are compiled once into a [`DataCommand`] with typed, NULL-aware
//! parameter binding and column extraction, and [`ScopedTransaction`] keeps
//! transactions closed on every exit path.
//!
//! The default [`NaiveSynchronizationObject`] arbitrates between threads of
//! one process only; swap in your own implementation via
//! [`SqlConnection::open_with_synchronization`] when multiple processes share
//! the file.

mod command;
mod connection;
mod error;
mod sync;
mod transaction;
mod value;

pub use command::DataCommand;
pub use connection::{AccessFlags, OpenFlags, SqlConnection};
pub use error::{DbError, DbResult};
pub use sync::{NaiveSynchronizationObject, SynchronizationObject};
pub use transaction::ScopedTransaction;
pub use value::SqlValue;
