//! Facilities to represent the state of an asynchronous storage operation
//!
//! The model is the following: every operation handed out by the storage
//! client starts in a pending state, and the worker which performs it ends up
//! moving it to exactly one final state, with either a value or an error. No
//! intermediary state is tracked here: transfer progress is reported through
//! its own polling channel (see the `progress` module).

use std::fmt;


/// Representation of an asynchronous operation's state
///
/// Here are the possible state transitions:
///
/// - Pending -> CompletedWithValue
/// - Pending -> CompletedWithError
///
/// Once an operation is in either of the final states, its state won't change
/// anymore.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// The operation was started, but the worker has not concluded it yet
    Pending,

    /// The worker has successfully produced a value
    CompletedWithValue,

    /// The worker has failed and produced an error
    CompletedWithError,
}
//
impl OperationState {
    /// Check if this state is final (i.e. won't change anymore)
    pub fn is_final(self) -> bool {
        is_final(&self)
    }

    /// Check if moving from this state to `next` is a legal transition
    pub fn can_transition_to(self, next: OperationState) -> bool {
        use self::OperationState::*;
        match (self, next) {
            (Pending, CompletedWithValue) | (Pending, CompletedWithError) => true,
            _ => false,
        }
    }
}
//
impl Default for OperationState {
    fn default() -> Self {
        OperationState::Pending
    }
}
//
impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            OperationState::Pending => "pending",
            OperationState::CompletedWithValue => "completed with value",
            OperationState::CompletedWithError => "completed with error",
        };
        f.write_str(name)
    }
}


/// Check if an operation state is final (i.e. won't change anymore)
pub fn is_final(s: &OperationState) -> bool {
    use self::OperationState::*;
    match *s {
        Pending => false,
        CompletedWithValue | CompletedWithError => true,
    }
}
