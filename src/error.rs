//! Error types of asynchronous storage operations
//!
//! Two families of errors must never be confused:
//!
//! - Operation errors are what went wrong with the work itself (the network
//!   timed out, the service answered with an error...). They are stored in the
//!   operation handle by the worker and handed back to the caller later.
//! - Contract violations are bugs in the code driving the handle, such as
//!   completing it twice. They are returned on the spot and never stored.

use crate::state::OperationState;
use thiserror::Error;


/// Failure of the work carried out by an asynchronous storage operation
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    /// The operation did not conclude within its allotted time
    #[error("timeout")]
    Timeout,

    /// The request could not be carried to or from the service
    #[error("transport failure: {0}")]
    Transport(String),

    /// Local input/output failed (e.g. reading the file being uploaded)
    #[error("I/O failure: {0}")]
    Io(String),

    /// The service answer could not be understood
    #[error("malformed service response: {0}")]
    Parse(String),

    /// The service rejected the request
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },

    /// The owning subsystem cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// The worker went away without ever concluding the operation
    #[error("operation abandoned by its worker")]
    Abandoned,
}
//
impl From<std::io::Error> for OperationError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => OperationError::Timeout,
            _ => OperationError::Io(e.to_string()),
        }
    }
}


/// Misuse of an operation handle by the code driving it
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContractViolation {
    /// Complete or Fail was called on an operation which already concluded
    #[error("operation already {state}, it cannot be concluded twice")]
    AlreadyCompleted { state: OperationState },

    /// The wait primitive was used after the handle was disposed
    #[error("operation handle was disposed")]
    Disposed,
}


/// Failure to hand a callback over to its execution context
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor does not accept new jobs anymore
    #[error("callback executor is shut down")]
    ShutDown,

    /// No thread could be created to run callbacks on
    #[error("failed to spawn callback thread: {0}")]
    Spawn(String),
}
