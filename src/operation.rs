//! Construction of asynchronous storage operations
//!
//! An operation is created by the subsystem which issues it, then split into a
//! worker-side `Completer` and a client-side `AsyncOperationHandle`, which can
//! respectively be sent to the worker thread and returned to the caller.

use crate::completer::Completer;
use crate::executor::{self, CallbackExecutor};
use crate::handle::{AsyncOperationHandle, Callback, Context, Shared};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::trace;


/// Asynchronous operation object
pub struct AsyncOp<T: Send + 'static> {
    /// Worker interface used to conclude the operation
    completer: Completer<T>,

    /// Client interface used to monitor the operation
    handle: AsyncOperationHandle<T>,
}
//
impl<T: Send + 'static> AsyncOp<T> {
    /// Create a pending operation without callback or correlation tokens
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a new operation
    pub fn builder() -> OperationBuilder<T> {
        OperationBuilder::new()
    }

    /// Split the asynchronous operation object into worker and client
    /// objects which can be respectively sent to worker and client threads
    pub fn split(self) -> (Completer<T>, AsyncOperationHandle<T>) {
        (self.completer, self.handle)
    }
}
//
impl<T: Send + 'static> Default for AsyncOp<T> {
    fn default() -> Self {
        Self::new()
    }
}


/// Configurable parameters of a new asynchronous operation
pub struct OperationBuilder<T> {
    /// Procedure run once the operation concludes
    callback: Option<Callback<T>>,

    /// Execution context of the callback (shared pool if unset)
    executor: Option<Arc<dyn CallbackExecutor>>,

    /// Correlation token of the caller
    caller_context: Option<Context>,

    /// Correlation token of the issuing subsystem
    producer_context: Option<Context>,
}
//
impl<T: Send + 'static> OperationBuilder<T> {
    /// Start from an operation without callback or correlation tokens
    pub fn new() -> Self {
        OperationBuilder {
            callback: None,
            executor: None,
            caller_context: None,
            producer_context: None,
        }
    }

    /// Run a callback once the operation concludes
    ///
    /// The callback receives a handle to the operation, and is run exactly
    /// once, on the configured executor, never on the worker's call stack.
    ///
    pub fn callback<F>(mut self, callback: F) -> Self
        where F: FnOnce(AsyncOperationHandle<T>) + Send + 'static
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Run the callback on a specific executor instead of the shared pool
    pub fn executor<E>(mut self, executor: E) -> Self
        where E: CallbackExecutor + 'static
    {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Run the callback on an executor shared with other operations
    pub fn shared_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Attach the caller's correlation token, handed back by the handle
    pub fn caller_context<C: Any + Send + Sync>(mut self, context: C) -> Self {
        self.caller_context = Some(Arc::new(context));
        self
    }

    /// Attach the issuing subsystem's correlation token, only reachable from
    /// the completer
    pub fn producer_context<P: Any + Send + Sync>(mut self, context: P) -> Self {
        self.producer_context = Some(Arc::new(context));
        self
    }

    /// Build the pending operation
    pub fn build(self) -> AsyncOp<T> {
        let executor = self.executor.unwrap_or_else(executor::shared);
        trace!(has_callback = self.callback.is_some(), "operation created");
        let shared = Arc::new(Shared::new(self.callback,
                                          executor,
                                          self.caller_context,
                                          self.producer_context));
        AsyncOp {
            completer: Completer::new(shared.clone()),
            handle: AsyncOperationHandle::from_shared(shared),
        }
    }
}
//
impl<T: Send + 'static> Default for OperationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
//
impl<T> fmt::Debug for OperationBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBuilder")
         .field("has_callback", &self.callback.is_some())
         .field("has_executor", &self.executor.is_some())
         .field("has_caller_context", &self.caller_context.is_some())
         .field("has_producer_context", &self.producer_context.is_some())
         .finish()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::error::OperationError;
    use crate::executor::{ThreadPoolConfig, ThreadPoolExecutor, ThreadSpawnExecutor};
    use crate::operation::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Check that building an operation does not run the callback
    #[test]
    fn build_does_not_call_back() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c_counter = counter.clone();
        let (completer, handle) = AsyncOp::<u8>::builder()
            .callback(move |_| { c_counter.fetch_add(1, Ordering::SeqCst); })
            .executor(ThreadSpawnExecutor::new())
            .build()
            .split();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!handle.is_completed());
        drop(completer);
    }

    /// Check that the callback receives the handle and the caller's token
    #[test]
    fn callback_gets_handle() {
        let (tx, rx) = mpsc::channel();
        let (completer, _) = AsyncOp::<u8>::builder()
            .caller_context("upload #3".to_owned())
            .callback(move |handle| {
                let token = handle.caller_context_as::<String>().cloned();
                tx.send((token, handle.exception())).unwrap();
            })
            .executor(ThreadSpawnExecutor::new())
            .build()
            .split();

        completer.fail(OperationError::Io("disk full".into()), false).unwrap();
        let (token, error) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(token.as_deref(), Some("upload #3"));
        assert_eq!(error, Some(OperationError::Io("disk full".into())));
    }

    /// Check that several operations can share one executor
    #[test]
    fn shared_executor() {
        let pool: Arc<dyn CallbackExecutor> = Arc::new(
            ThreadPoolExecutor::new(ThreadPoolConfig::default().with_workers(1))
                .unwrap()
        );
        let (tx, rx) = mpsc::channel();
        let completers: Vec<_> = (0..8u32).map(|idx| {
            let tx = tx.clone();
            let (completer, _) = AsyncOp::<u32>::builder()
                .callback(move |handle| tx.send(handle.result()).unwrap())
                .shared_executor(pool.clone())
                .build()
                .split();
            (idx, completer)
        }).collect();
        for (idx, completer) in &completers {
            completer.complete(*idx, false).unwrap();
        }

        let mut results: Vec<_> = (0..8)
            .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap())
            .collect();
        results.sort();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }
}
