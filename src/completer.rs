//! Worker-side interface of an asynchronous storage operation
//!
//! The completer is what the issuing subsystem keeps when it starts an
//! operation, and hands to whichever worker carries it out. It is the only way
//! to conclude the operation, and the only way to reach the producer-side
//! correlation token.
//!
//! Note that this interface should not be exposed to the clients of the
//! storage library, as doing so would let them forge operation outcomes.

use crate::error::{ContractViolation, OperationError};
use crate::handle::{AsyncOperationHandle, Context, Shared};
use crate::state::OperationState;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::warn;


/// Worker interface, used to conclude an asynchronous operation
pub struct Completer<T: Send + 'static> {
    /// State shared with the client handles
    shared: Arc<Shared<T>>,
}
//
impl<T: Send + 'static> Completer<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Completer { shared }
    }

    /// Conclude the operation successfully
    ///
    /// `was_synchronous` tells whether this happens before the call which
    /// started the operation has returned to its caller. An operation can only
    /// be concluded once, later attempts are rejected and change nothing.
    ///
    pub fn complete(&self, value: T, was_synchronous: bool) -> Result<(), ContractViolation> {
        self.shared.conclude(Ok(value), was_synchronous)
    }

    /// Conclude the operation with an error
    ///
    /// Same contract as `complete()`.
    ///
    pub fn fail(&self, error: OperationError, was_synchronous: bool) -> Result<(), ContractViolation> {
        self.shared.conclude(Err(error), was_synchronous)
    }

    /// Check whether the operation was already concluded
    pub fn is_completed(&self) -> bool {
        self.shared.state().is_final()
    }

    /// Correlation token of the issuing subsystem
    pub fn producer_context(&self) -> Option<&Context> {
        self.shared.producer_context()
    }

    /// Typed access to the issuing subsystem's correlation token
    pub fn producer_context_as<P: Any>(&self) -> Option<&P> {
        self.shared.producer_context()
                   .and_then(|c| (**c).downcast_ref::<P>())
    }

    /// Get a client handle to the operation
    pub fn handle(&self) -> AsyncOperationHandle<T> {
        AsyncOperationHandle::from_shared(self.shared.clone())
    }
}
//
impl<T: Send + 'static> Drop for Completer<T> {
    /// If the worker goes away before concluding the operation, fail it in
    /// order to prevent clients from waiting forever
    fn drop(&mut self) {
        if self.shared.state() == OperationState::Pending {
            warn!("operation completer dropped before concluding, failing it");
            let _ = self.shared.conclude(Err(OperationError::Abandoned), false);
        }
    }
}
//
impl<T: Send + 'static> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
         .field("state", &self.shared.state())
         .finish()
    }
}
