//! Asynchronous callback executors
//!
//! Whenever callback-based notifications are used, one important design issue
//! is to decide how the callback functions should be executed.
//!
//! A traditional answer to this problem has been to run callbacks directly on
//! the thread which concludes the operation, as part of the completion
//! process. While this approach, also known as inline callback execution,
//! has minimal scheduling overhead, it is not acceptable here:
//!
//! - Long-running callbacks would delay the worker which concluded the
//!   operation, and every other operation queued behind it
//! - A callback which calls back into the operation handle would do so in the
//!   middle of the completion process, which is a reentrancy hazard
//!
//! For this reason, callbacks are always handed over to a separate execution
//! context, which we call a callback executor, or executor for short. Since
//! executors are usually shared by many operations, callback bodies should be
//! fast and non-blocking.

mod pool;
mod spawn;

pub use self::pool::{ThreadPoolConfig, ThreadPoolExecutor};
pub use self::spawn::ThreadSpawnExecutor;

use crate::error::ExecutorError;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::warn;


/// Unit of work submitted to an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;


/// Execution context onto which operation callbacks are scheduled
pub trait CallbackExecutor: Send + Sync {
    /// Schedule a job for execution on another thread
    ///
    /// Implementations must never run the job on the caller's stack. If the
    /// job cannot be accepted, it is handed back to the caller along with the
    /// reason, so that the caller can get it executed by other means.
    ///
    fn execute(&self, job: Job) -> Result<(), (ExecutorError, Job)>;
}
//
impl<E: CallbackExecutor + ?Sized> CallbackExecutor for Arc<E> {
    fn execute(&self, job: Job) -> Result<(), (ExecutorError, Job)> {
        (**self).execute(job)
    }
}


/// Process-wide executor used when no executor was configured
static SHARED_EXECUTOR: Lazy<Arc<dyn CallbackExecutor>> = Lazy::new(|| {
    match ThreadPoolExecutor::new(ThreadPoolConfig::default()) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            warn!(error = %e,
                  "cannot start the shared callback pool, spawning threads instead");
            Arc::new(ThreadSpawnExecutor::new())
        }
    }
});


/// Access the process-wide callback executor
///
/// This is a thread pool with one worker per CPU, started on first use.
///
pub fn shared() -> Arc<dyn CallbackExecutor> {
    SHARED_EXECUTOR.clone()
}
