//! Asynchronous operation monitoring for a cloud storage client
//!
//! Picture yourself in a situation where: you call into a storage service to
//! upload a file, fetch some metadata or open a session. You know that the
//! request is going to take some time, and you have other things to do
//! meanwhile, so you would rather not wait for its completion. But you would
//! like a way to know when it's done, get at its outcome, manage errors...
//!
//! Every such request is carried out by a worker thread, and represented to
//! you by an `AsyncOperationHandle`. The handle can be polled, blocked on (with
//! or without a timeout, alone or along with other handles), or can notify you
//! through a callback which runs on a separate thread exactly once. It also
//! tells you whether the operation concluded before the call which started it
//! had even returned, so that fast paths can be taken.
//!
//! Once an operation has concluded, its outcome is summarized as an immutable
//! `OperationResult`, which is what the synchronous-looking parts of the
//! client library hand back to their callers.
//!
//! ```
//! use storage_async_ops::{AsyncOp, OperationResult};
//! use std::thread;
//!
//! let (completer, handle) = AsyncOp::<u64>::new().split();
//! let worker = thread::spawn(move || completer.complete(42, false));
//!
//! handle.wait().unwrap();
//! assert_eq!(handle.result(), Some(42));
//! assert!(OperationResult::from_handle(&handle).unwrap().is_success());
//! handle.dispose();
//! worker.join().unwrap().unwrap();
//! ```

pub mod completer;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod handle;
pub mod operation;
pub mod progress;
pub mod signal;
pub mod state;

pub use crate::completer::Completer;
pub use crate::envelope::{OperationResult, ResultStatus};
pub use crate::error::{ContractViolation, ExecutorError, OperationError};
pub use crate::executor::{CallbackExecutor, ThreadPoolConfig, ThreadPoolExecutor,
                          ThreadSpawnExecutor};
pub use crate::handle::{AsyncOperationHandle, Context};
pub use crate::operation::{AsyncOp, OperationBuilder};
pub use crate::progress::Progress;
pub use crate::signal::WaitSignal;
pub use crate::state::OperationState;
