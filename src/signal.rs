//! Blocking-based synchronization with asynchronous operations
//!
//! This module provides the manual-reset signal which every operation handle
//! owns. It starts unset, gets set once when the operation concludes, and then
//! stays set, so that any number of threads can block on it before or after
//! the fact. Blocking is easy to use and reason about, but should be used with
//! care as the unpredictable delays that it introduces can be harmful to
//! application performance.
//!
//! Waiting can be bounded by a timeout, and done on several signals at once
//! through `wait_any`, so that clients can implement their own policies such
//! as "give up after 30 seconds" or "resume when any upload is done".

use crate::error::ContractViolation;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;


/// Manual-reset signal, set at most once and released at most once
#[derive(Debug, Default)]
pub struct WaitSignal {
    /// Current signal state (mutex-protected)
    state: Mutex<SignalState>,

    /// Condition variable used to wake up blocked waiters
    set_cv: Condvar,
}
//
impl WaitSignal {
    /// Create a new signal in the unset position
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal, waking up every thread blocked on it
    ///
    /// Setting an already set or disposed signal does nothing.
    ///
    pub fn set(&self) {
        let listeners = {
            let mut state = self.state.lock();
            if state.set || state.disposed {
                return;
            }
            state.set = true;
            self.set_cv.notify_all();
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners {
            listener.fire();
        }
    }

    /// Check whether the signal is set, without blocking
    pub fn is_set(&self) -> bool {
        self.state.lock().set
    }

    /// Check whether the signal was disposed
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Block until the signal is set
    pub fn wait(&self) -> Result<(), ContractViolation> {
        self.wait_until(None).map(|_| ())
    }

    /// Block until the signal is set or the timeout has elapsed, and tell
    /// which of the two happened (true means that the signal is set)
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, ContractViolation> {
        self.wait_until(Instant::now().checked_add(timeout))
    }

    /// Block until any of the signals is set, or the timeout has elapsed
    ///
    /// Returns the index of the first signal found set, or None on timeout.
    /// Without a timeout, waiting on an empty set of signals returns None
    /// immediately rather than blocking forever.
    ///
    pub fn wait_any(signals: &[&WaitSignal],
                    timeout: Option<Duration>) -> Result<Option<usize>, ContractViolation> {
        if signals.is_empty() {
            return Ok(None);
        }
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let listener = Arc::new(Listener::default());

        // Subscribe to all signals, bailing out early if one is already set
        for (idx, signal) in signals.iter().enumerate() {
            let mut state = signal.state.lock();
            let early = if state.disposed {
                Some(Err(ContractViolation::Disposed))
            } else if state.set {
                Some(Ok(Some(idx)))
            } else {
                state.listeners.push(listener.clone());
                None
            };
            drop(state);
            if let Some(outcome) = early {
                Self::unsubscribe(&signals[..idx], &listener);
                return outcome;
            }
        }

        // Wait for one of them to fire
        listener.wait_until(deadline);
        Self::unsubscribe(signals, &listener);

        // Find out which signal fired, if any
        for (idx, signal) in signals.iter().enumerate() {
            let state = signal.state.lock();
            if state.disposed {
                return Err(ContractViolation::Disposed);
            }
            if state.set {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }

    /// Release the signal
    ///
    /// Threads which are blocked on the signal are woken up and told that it
    /// was disposed. Returns true on the call which performed the release, and
    /// false on every later call.
    ///
    pub fn dispose(&self) -> bool {
        let listeners = {
            let mut state = self.state.lock();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            self.set_cv.notify_all();
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners {
            listener.fire();
        }
        debug!("wait signal disposed");
        true
    }

    // Shared implementation of wait() and wait_timeout()
    fn wait_until(&self, deadline: Option<Instant>) -> Result<bool, ContractViolation> {
        let mut state = self.state.lock();
        loop {
            if state.disposed {
                return Err(ContractViolation::Disposed);
            }
            if state.set {
                return Ok(true);
            }
            match deadline {
                Some(deadline) => {
                    if self.set_cv.wait_until(&mut state, deadline).timed_out() {
                        if state.disposed {
                            return Err(ContractViolation::Disposed);
                        }
                        return Ok(state.set);
                    }
                }
                None => self.set_cv.wait(&mut state),
            }
        }
    }

    // Remove a wait_any() listener from a set of signals
    fn unsubscribe(signals: &[&WaitSignal], listener: &Arc<Listener>) {
        for signal in signals {
            signal.state
                  .lock()
                  .listeners
                  .retain(|l| !Arc::ptr_eq(l, listener));
        }
    }
}


/// Mutex-protected part of the signal
#[derive(Debug, Default)]
struct SignalState {
    /// Whether the signal has been set
    set: bool,

    /// Whether the signal has been released
    disposed: bool,

    /// Threads waiting on this signal as part of a wait_any() call
    listeners: Vec<Arc<Listener>>,
}


/// Wake-up channel of a thread blocked in wait_any()
#[derive(Debug, Default)]
struct Listener {
    fired: Mutex<bool>,
    fired_cv: Condvar,
}
//
impl Listener {
    fn fire(&self) {
        *self.fired.lock() = true;
        self.fired_cv.notify_all();
    }

    fn wait_until(&self, deadline: Option<Instant>) {
        let mut fired = self.fired.lock();
        while !*fired {
            match deadline {
                Some(deadline) => {
                    if self.fired_cv.wait_until(&mut fired, deadline).timed_out() {
                        return;
                    }
                }
                None => self.fired_cv.wait(&mut fired),
            }
        }
    }
}
