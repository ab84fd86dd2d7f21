use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use lazy_static::lazy_static;

/// Mutual-exclusion contract serializing native calls against one database
/// file.
///
/// `lock` blocks until the caller holds exclusive access; `unlock` releases
/// it. Implementations must be callable from many threads against the same
/// underlying file. The connection brackets every native call with one
/// lock/unlock pair, so implementations arbitrate at whatever granularity
/// the storage demands: the default is a process-local gate, a file-lock or
/// engine-busy-handler based implementation can replace it without touching
/// connection code.
pub trait SynchronizationObject: Send + Sync {
    /// Block until exclusive access to the database file is held.
    fn lock(&self);

    /// Release exclusive access.
    fn unlock(&self);
}

/// Binary gate over one database path. `Mutex` + `Condvar` rather than a
/// bare mutex: `unlock` arrives without a guard value.
struct PathGate {
    held: Mutex<bool>,
    released: Condvar,
}

impl PathGate {
    fn new() -> Self {
        Self {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut held = recover(self.held.lock());
        while *held {
            held = recover(self.released.wait(held));
        }
        *held = true;
    }

    fn release(&self) {
        let mut held = recover(self.held.lock());
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

// A poisoned lock still holds a consistent bool.
fn recover<'a>(
    result: Result<MutexGuard<'a, bool>, std::sync::PoisonError<MutexGuard<'a, bool>>>,
) -> MutexGuard<'a, bool> {
    result.unwrap_or_else(std::sync::PoisonError::into_inner)
}

lazy_static! {
    /// One gate per database path for the lifetime of the process. Entries
    /// are created lazily on the first open of a path and never removed;
    /// the registry itself is guarded by its own mutex.
    static ref GATE_REGISTRY: Mutex<HashMap<PathBuf, Arc<PathGate>>> = Mutex::new(HashMap::new());
}

fn gate_for(path: &Path) -> Arc<PathGate> {
    // Absolute form so "db.sqlite" and "./db.sqlite" share a gate. The file
    // may not exist yet, so full canonicalization is not an option.
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut registry = GATE_REGISTRY
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Arc::clone(
        registry
            .entry(key)
            .or_insert_with(|| Arc::new(PathGate::new())),
    )
}

/// Process-local synchronization keyed by database path.
///
/// Serializes the threads of this process against one file. It does not
/// arbitrate between processes; deployments sharing a file across processes
/// supply their own [`SynchronizationObject`] via
/// [`SqlConnection::open_with_synchronization`].
///
/// [`SqlConnection::open_with_synchronization`]: crate::SqlConnection::open_with_synchronization
pub struct NaiveSynchronizationObject {
    gate: Arc<PathGate>,
}

impl NaiveSynchronizationObject {
    /// Synchronization object for the database at `path`. Objects created
    /// for the same path share one gate.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            gate: gate_for(path.as_ref()),
        }
    }
}

impl SynchronizationObject for NaiveSynchronizationObject {
    fn lock(&self) {
        self.gate.acquire();
    }

    fn unlock(&self) {
        self.gate.release();
    }
}

/// Scope guard pairing `lock` with `unlock` on every exit path.
pub(crate) struct SyncScope<'a> {
    sync: &'a dyn SynchronizationObject,
}

impl<'a> SyncScope<'a> {
    pub(crate) fn enter(sync: &'a dyn SynchronizationObject) -> Self {
        sync.lock();
        Self { sync }
    }
}

impl Drop for SyncScope<'_> {
    fn drop(&mut self) {
        self.sync.unlock();
    }
}
