//! Bounded background execution for blocking startup routines.
//!
//! Server startups often block until the server reports readiness. The
//! runner moves that work onto a dedicated thread and waits at most
//! [`STARTUP_TIMEOUT`] for it. Whatever the operation produced is handed back
//! untouched: its `Ok` value, its own error value (an `anyhow::Error` keeps
//! the backtrace captured on the worker), or its panic, resumed on the
//! caller's thread with the original payload.
//!
//! On timeout the worker is abandoned, not cancelled. It keeps running to
//! completion and its late outcome is dropped.

use errors::TimeoutError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline applied by [`run_in_background`].
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

type Outcome<T, E> = Result<Result<T, E>, Box<dyn Any + Send + 'static>>;

/// Runs `op` on a dedicated thread and waits up to [`STARTUP_TIMEOUT`].
///
/// The operation is described in timeout errors by its closure type name.
///
/// ```rust,no_run
/// use fixtures::run_in_background;
///
/// let port: u16 = run_in_background(|| -> anyhow::Result<u16> {
///     std::thread::sleep(std::time::Duration::from_millis(50));
///     Ok(5000)
/// })?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn run_in_background<T, E, F>(op: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<TimeoutError> + From<std::io::Error> + Send + 'static,
{
    run_in_background_with_timeout(std::any::type_name::<F>(), STARTUP_TIMEOUT, op)
}

/// Same as [`run_in_background`] with an explicit description and deadline.
pub fn run_in_background_with_timeout<T, E, F>(
    operation: &str,
    timeout: Duration,
    op: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<TimeoutError> + From<std::io::Error> + Send + 'static,
{
    // Capacity 1 so the worker never blocks on send after the caller left.
    let (tx, rx) = mpsc::sync_channel::<Outcome<T, E>>(1);
    let label = operation.to_string();

    thread::Builder::new()
        .name("fixture-startup".to_string())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(op));
            if tx.send(outcome).is_err() {
                debug!(operation = %label, "Background operation finished after its deadline, outcome dropped");
            }
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => panic::resume_unwind(payload),
        Err(RecvTimeoutError::Timeout) => {
            warn!(operation, ?timeout, "Background operation timed out, abandoning it");
            Err(TimeoutError::new(operation, timeout).into())
        }
        Err(RecvTimeoutError::Disconnected) => Err(std::io::Error::other(format!(
            "background thread for {operation} exited without an outcome"
        ))
        .into()),
    }
}
