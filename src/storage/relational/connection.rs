//! Shared connection handling for the `SQLite` relational backend.
//!
//! Provides mutex handling with poison recovery and the pragma configuration
//! both stores rely on.

use crate::Result;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Helper to acquire the connection mutex with poison recovery.
///
/// If the mutex is poisoned (a panic in a previous critical section), the
/// inner value is recovered and a warning is logged; the connection state is
/// still valid for subsequent statements.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent artifact storage.
///
/// - **WAL mode**: concurrent readers alongside the single writer
/// - **NORMAL synchronous**: durability/performance balance
/// - **`busy_timeout`**: waits up to 5 seconds for locks instead of failing
///   immediately under contention
///
/// # Errors
///
/// Infallible today; fallible signature kept so pragma failures can surface
/// without an API break.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a string result which execute_batch would choke on.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
    Ok(())
}
