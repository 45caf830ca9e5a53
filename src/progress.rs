//! Polling-based monitoring of transfer progress
//!
//! Long-running transfers (uploads, downloads) report how far they are along
//! as a `Progress` value. This module provides a way for the worker to publish
//! such values and for a client to poll the latest one. It provides maximal
//! performance in scenarios where the client does not need to synchronize
//! with the worker but only to periodically check its progress, as is the
//! case for example when updating progress bars in user interfaces.

use std::fmt;
use triple_buffer::{Input, Output, TripleBuffer};


/// How much of a transfer has been carried out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Progress {
    bytes_transferred: u64,
    total_byte_size: u64,
}
//
impl Progress {
    pub fn new(bytes_transferred: u64, total_byte_size: u64) -> Self {
        Progress { bytes_transferred, total_byte_size }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn total_byte_size(&self) -> u64 {
        self.total_byte_size
    }

    /// Fraction of the transfer which is done, if the total size is known
    pub fn fraction(&self) -> Option<f64> {
        if self.total_byte_size == 0 {
            return None;
        }
        Some(self.bytes_transferred as f64 / self.total_byte_size as f64)
    }

    /// Check whether every byte has been transferred
    pub fn is_complete(&self) -> bool {
        self.total_byte_size > 0 && self.bytes_transferred >= self.total_byte_size
    }
}
//
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} bytes", self.bytes_transferred, self.total_byte_size)
    }
}


/// Set up a progress channel, starting from some initial progress
pub fn channel(initial: Progress) -> (ProgressReporter, ProgressMonitor) {
    let (input, output) = TripleBuffer::new(&initial).split();
    (ProgressReporter { input }, ProgressMonitor { output })
}


/// Worker interface, used to publish transfer progress
pub struct ProgressReporter {
    /// New progress values will be sent through this triple buffer
    input: Input<Progress>,
}
//
impl ProgressReporter {
    /// Publish the latest progress, without ever blocking
    pub fn report(&mut self, progress: Progress) {
        self.input.write(progress);
    }
}
//
impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}


/// Client interface, used to poll transfer progress
pub struct ProgressMonitor {
    /// Current progress will be read through this triple buffer
    output: Output<Progress>,
}
//
impl ProgressMonitor {
    /// Access the latest published progress
    pub fn latest(&mut self) -> Progress {
        *self.output.read()
    }

    /// Check whether new progress was published since the last read
    pub fn has_update(&self) -> bool {
        self.output.updated()
    }
}
//
impl fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMonitor").finish_non_exhaustive()
    }
}
