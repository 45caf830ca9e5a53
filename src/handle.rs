//! Client-side handle to an asynchronous storage operation
//!
//! The handle gives access to the outcome of an operation which is carried out
//! by a worker thread. It can be monitored in three ways, which can be freely
//! combined:
//!
//! - Polling, via `is_completed()`, never blocks and is the method of choice
//!   for e.g. refreshing a user interface.
//! - Blocking, via the wait primitive, suspends the client until the operation
//!   concludes. Timeouts and waiting on several operations are supported.
//! - Callbacks, configured when the operation is created, are run exactly once
//!   on a separate execution context when the operation concludes.
//!
//! All state is protected by a single mutex per handle. The worker publishes
//! the final state under that mutex, then sets the wait primitive, then
//! schedules the callback, so that whoever learns about the completion by any
//! of these means also sees the corresponding value or error.

use crate::error::{ContractViolation, OperationError};
use crate::executor::{self, CallbackExecutor, Job};
use crate::signal::WaitSignal;
use crate::state::OperationState;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};


/// Opaque correlation token attached to an operation
pub type Context = Arc<dyn Any + Send + Sync>;


/// Procedure run once the operation has concluded
pub(crate) type Callback<T> = Box<dyn FnOnce(AsyncOperationHandle<T>) + Send + 'static>;


/// Handle to the outcome of an asynchronous storage operation
///
/// Cloning the handle is cheap, and all clones refer to the same operation.
///
pub struct AsyncOperationHandle<T> {
    /// State shared with the worker and the other clones
    shared: Arc<Shared<T>>,
}
//
impl<T> AsyncOperationHandle<T> {
    /// Check whether the operation has concluded, without blocking
    pub fn is_completed(&self) -> bool {
        self.shared.cell.lock().state.is_final()
    }

    /// Check whether the operation concluded before the call which started it
    /// returned. This is always false while the operation is pending.
    pub fn completed_synchronously(&self) -> bool {
        let cell = self.shared.cell.lock();
        cell.state.is_final() && cell.completed_synchronously
    }

    /// Current state of the operation
    pub fn state(&self) -> OperationState {
        self.shared.cell.lock().state
    }

    /// Value produced by the operation, if it has concluded successfully
    ///
    /// This does not wait for the operation to conclude: None is returned if
    /// it is still pending.
    ///
    pub fn result(&self) -> Option<T>
        where T: Clone
    {
        self.shared.cell.lock().value.clone()
    }

    /// Error produced by the operation, if it has failed
    ///
    /// This does not wait for the operation to conclude: None is returned if
    /// it is still pending.
    ///
    pub fn exception(&self) -> Option<OperationError> {
        self.shared.cell.lock().error.clone()
    }

    /// Wait primitive which gets set once the operation concludes
    ///
    /// Use this to block with your own policy, e.g. on several operations at
    /// once via `WaitSignal::wait_any`.
    ///
    pub fn wait_handle(&self) -> Result<&WaitSignal, ContractViolation> {
        if self.shared.signal.is_disposed() {
            warn!("wait primitive requested from a disposed operation handle");
            return Err(ContractViolation::Disposed);
        }
        Ok(&self.shared.signal)
    }

    /// Block until the operation concludes
    pub fn wait(&self) -> Result<(), ContractViolation> {
        self.wait_handle()?.wait()
    }

    /// Block until the operation concludes or the timeout elapses, and tell
    /// which of the two happened (true means that the operation concluded)
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, ContractViolation> {
        self.wait_handle()?.wait_timeout(timeout)
    }

    /// Correlation token supplied by the caller when starting the operation
    pub fn caller_context(&self) -> Option<&Context> {
        self.shared.caller_context.as_ref()
    }

    /// Typed access to the caller's correlation token
    pub fn caller_context_as<C: Any>(&self) -> Option<&C> {
        self.shared.caller_context
                   .as_deref()
                   .and_then(|c| c.downcast_ref::<C>())
    }

    /// Release the wait primitive
    ///
    /// Returns true on the call which performed the release, later calls do
    /// nothing and return false. The outcome of the operation remains
    /// readable after disposal, but the wait primitive cannot be used anymore.
    ///
    pub fn dispose(&self) -> bool {
        let released = self.shared.signal.dispose();
        if released {
            debug!(state = ?self.state(), "operation handle disposed");
        }
        released
    }

    /// Check whether the handle was disposed
    pub fn is_disposed(&self) -> bool {
        self.shared.signal.is_disposed()
    }

    // Build a handle around some shared operation state
    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        AsyncOperationHandle { shared }
    }
}
//
impl<T> Clone for AsyncOperationHandle<T> {
    fn clone(&self) -> Self {
        AsyncOperationHandle { shared: self.shared.clone() }
    }
}
//
impl<T> fmt::Debug for AsyncOperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, synchronous) = {
            let cell = self.shared.cell.lock();
            (cell.state, cell.completed_synchronously)
        };
        f.debug_struct("AsyncOperationHandle")
         .field("state", &state)
         .field("completed_synchronously", &synchronous)
         .field("disposed", &self.shared.signal.is_disposed())
         .finish()
    }
}


/// State shared between the worker and the client handles
pub(crate) struct Shared<T> {
    /// Outcome of the operation (mutex-protected)
    cell: Mutex<Cell<T>>,

    /// Manual-reset signal set when the operation concludes
    signal: WaitSignal,

    /// Execution context of the callback
    executor: Arc<dyn CallbackExecutor>,

    /// Correlation token of the caller, handed back unchanged
    caller_context: Option<Context>,

    /// Correlation token of the issuing subsystem, never shown to the caller
    producer_context: Option<Context>,
}
//
impl<T> Shared<T> {
    /// Build the shared state of a pending operation
    pub(crate) fn new(callback: Option<Callback<T>>,
                      executor: Arc<dyn CallbackExecutor>,
                      caller_context: Option<Context>,
                      producer_context: Option<Context>) -> Self {
        Shared {
            cell: Mutex::new(Cell {
                state: OperationState::Pending,
                value: None,
                error: None,
                completed_synchronously: false,
                callback,
            }),
            signal: WaitSignal::new(),
            executor,
            caller_context,
            producer_context,
        }
    }

    pub(crate) fn state(&self) -> OperationState {
        self.cell.lock().state
    }

    pub(crate) fn producer_context(&self) -> Option<&Context> {
        self.producer_context.as_ref()
    }
}
//
impl<T: Send + 'static> Shared<T> {
    /// Move the operation to its final state, then notify the client
    pub(crate) fn conclude(self: &Arc<Self>,
                           outcome: Result<T, OperationError>,
                           was_synchronous: bool) -> Result<(), ContractViolation> {
        let next = match outcome {
            Ok(_) => OperationState::CompletedWithValue,
            Err(_) => OperationState::CompletedWithError,
        };

        // Publish the outcome, unless one was already published
        let callback = {
            let mut cell = self.cell.lock();
            if !cell.state.can_transition_to(next) {
                let state = cell.state;
                drop(cell);
                warn!(state = ?state, attempted = ?next,
                      "operation concluded more than once");
                return Err(ContractViolation::AlreadyCompleted { state });
            }
            match outcome {
                Ok(value) => cell.value = Some(value),
                Err(error) => cell.error = Some(error),
            }
            cell.completed_synchronously = was_synchronous;
            cell.state = next;
            cell.callback.take()
        };
        debug!(state = ?next, synchronous = was_synchronous, "operation concluded");

        // Wake up blocked clients, then schedule the callback
        self.signal.set();
        if let Some(callback) = callback {
            self.schedule(callback);
        }
        Ok(())
    }

    // Hand the callback over to its execution context
    //
    // A rejected job goes to the shared executor, then to a dedicated thread.
    // It is only lost if no thread can be created at all.
    fn schedule(self: &Arc<Self>, callback: Callback<T>) {
        let handle = AsyncOperationHandle::from_shared(self.clone());
        let job: Job = Box::new(move || callback(handle));
        let job = match self.executor.execute(job) {
            Ok(()) => return,
            Err((e, job)) => {
                warn!(error = %e,
                      "callback executor rejected the job, using the shared executor");
                job
            }
        };
        let job = match executor::shared().execute(job) {
            Ok(()) => return,
            Err((e, job)) => {
                warn!(error = %e,
                      "shared executor rejected the job, using a dedicated thread");
                job
            }
        };
        let spawned = thread::Builder::new()
            .name("storage-callback-fallback".to_owned())
            .spawn(job);
        if let Err(e) = spawned {
            error!(error = %e, "operation callback could not be scheduled");
        }
    }
}


/// Mutex-protected part of the shared state
struct Cell<T> {
    /// Current state of the operation
    state: OperationState,

    /// Set iff state is CompletedWithValue
    value: Option<T>,

    /// Set iff state is CompletedWithError
    error: Option<OperationError>,

    /// Latched along with the final state
    completed_synchronously: bool,

    /// Taken out when the operation concludes
    callback: Option<Callback<T>>,
}
