//! Immutable results of storage operations
//!
//! Once an operation has concluded, its outcome is handed to the top-level
//! caller as an `OperationResult`: an error (if any), a status summarizing
//! the outcome, and a payload (if any). Every operation kind uses this same
//! envelope with its own payload type; the aliases at the bottom of this
//! module only exist to make signatures easier to read.

use crate::error::OperationError;
use crate::handle::AsyncOperationHandle;
use crate::state::OperationState;


/// Summary of the outcome of an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResultStatus {
    /// The operation succeeded
    Success,

    /// The operation failed for a reason not covered below
    Failed,

    /// The operation did not conclude in time
    TimedOut,

    /// The operation was cancelled
    Cancelled,
}
//
impl ResultStatus {
    /// Status of an operation which failed with some error
    pub fn of_error(error: &OperationError) -> Self {
        match *error {
            OperationError::Timeout => ResultStatus::TimedOut,
            OperationError::Cancelled => ResultStatus::Cancelled,
            _ => ResultStatus::Failed,
        }
    }
}


/// Outcome of a storage operation
///
/// A failed result always carries an error and never a payload. A successful
/// result never carries an error, and carries a payload unless the operation
/// has nothing to return.
///
#[derive(Clone, Debug, PartialEq)]
pub struct OperationResult<T> {
    error: Option<OperationError>,
    status: ResultStatus,
    payload: Option<T>,
}
//
impl<T> OperationResult<T> {
    /// Successful outcome carrying a payload
    pub fn success(payload: T) -> Self {
        OperationResult {
            error: None,
            status: ResultStatus::Success,
            payload: Some(payload),
        }
    }

    /// Failed outcome
    pub fn failure(error: OperationError) -> Self {
        OperationResult {
            status: ResultStatus::of_error(&error),
            error: Some(error),
            payload: None,
        }
    }

    /// Build the result of a concluded operation, or None if it is pending
    pub fn from_handle(handle: &AsyncOperationHandle<T>) -> Option<Self>
        where T: Clone
    {
        match handle.state() {
            OperationState::Pending => None,
            OperationState::CompletedWithValue => handle.result().map(Self::success),
            OperationState::CompletedWithError => handle.exception().map(Self::failure),
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Check whether the operation succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Break the result down into its error, status and payload
    pub fn into_parts(self) -> (Option<OperationError>, ResultStatus, Option<T>) {
        (self.error, self.status, self.payload)
    }

    /// View the result as a standard Result (None payload for a successful
    /// operation with nothing to return)
    pub fn into_result(self) -> Result<Option<T>, OperationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.payload),
        }
    }
}
//
impl OperationResult<()> {
    /// Successful outcome of an operation which has nothing to return
    pub fn empty_success() -> Self {
        OperationResult {
            error: None,
            status: ResultStatus::Success,
            payload: None,
        }
    }
}
//
impl<T> From<Result<T, OperationError>> for OperationResult<T> {
    fn from(outcome: Result<T, OperationError>) -> Self {
        match outcome {
            Ok(payload) => Self::success(payload),
            Err(error) => Self::failure(error),
        }
    }
}


/// Result of an operation which returns nothing
pub type EmptyResult = OperationResult<()>;

/// Result of deleting a remote file or folder
pub type DeleteResult = OperationResult<()>;

/// Result of closing a session
pub type LogoutResult = OperationResult<()>;

/// Result of downloading a file's contents
pub type DownloadResult = OperationResult<Vec<u8>>;

/// Result of uploading a file, carrying the description of the stored file
pub type UploadResult<F> = OperationResult<F>;

/// Result of fetching file or folder metadata
pub type MetadataResult<M> = OperationResult<M>;

/// Result of listing a folder's items
pub type ListResult<I> = OperationResult<Vec<I>>;

/// Result of opening a session
pub type SessionResult<S> = OperationResult<S>;
