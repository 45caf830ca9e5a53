//! Thread pool callback executor
//!
//! A fixed set of worker threads pulls callback jobs from a shared queue. This
//! bounds the amount of threads dedicated to callbacks no matter how many
//! operations are in flight, at the cost of letting a slow callback delay the
//! ones queued behind it.

use crate::error::ExecutorError;
use crate::executor::{CallbackExecutor, Job};
use crossbeam_channel::{Receiver, SendError, Sender};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};


/// User-configurable thread pool behaviour
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadPoolConfig {
    /// Number of worker threads (at least one)
    workers: usize,

    /// Name given to the worker threads
    thread_name: String,
}
//
impl ThreadPoolConfig {
    /// Set the number of worker threads (zero is rounded up to one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the name given to the worker threads
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}
//
impl Default for ThreadPoolConfig {
    /// One worker per available CPU, named after the callback role
    fn default() -> Self {
        ThreadPoolConfig {
            workers: thread::available_parallelism().map(|n| n.get())
                                                   .unwrap_or(4),
            thread_name: "storage-callback".to_owned(),
        }
    }
}


/// CallbackExecutor implementation backed by a fixed pool of threads
#[derive(Debug)]
pub struct ThreadPoolExecutor {
    /// Job queue input, taken away on shutdown
    sender: RwLock<Option<Sender<Job>>>,

    /// Worker threads, joined on shutdown
    workers: Mutex<Vec<JoinHandle<()>>>,
}
//
impl ThreadPoolExecutor {
    /// Start a new thread pool
    pub fn new(config: ThreadPoolConfig) -> Result<Self, ExecutorError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(config.workers);
        for idx in 0..config.workers {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, idx))
                .spawn(move || worker_loop(receiver));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Dropping the sender lets the workers started so far exit
                    drop(sender);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(ExecutorError::Spawn(e.to_string()));
                }
            }
        }
        debug!(workers = config.workers,
               thread_name = %config.thread_name,
               "callback thread pool started");
        Ok(ThreadPoolExecutor {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Stop accepting jobs, run the ones already queued, and join the workers
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.sender.write().take().is_none() {
            return;
        }
        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            // A worker cannot join itself (pool dropped from a callback)
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!("callback worker thread terminated abnormally");
            }
        }
        debug!("callback thread pool shut down");
    }

    /// Check whether the pool still accepts jobs
    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }
}
//
impl CallbackExecutor for ThreadPoolExecutor {
    fn execute(&self, job: Job) -> Result<(), (ExecutorError, Job)> {
        match &*self.sender.read() {
            Some(sender) => sender.send(job)
                                  .map_err(|SendError(job)| (ExecutorError::ShutDown, job)),
            None => Err((ExecutorError::ShutDown, job)),
        }
    }
}
//
impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}


// Main loop of the worker threads, exits once the queue is closed and drained
fn worker_loop(receiver: Receiver<Job>) {
    for job in receiver.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!(panic = panic_message(payload.as_ref()),
                   "operation callback panicked");
        }
    }
}


// Best-effort extraction of a panic message
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "<non-string panic payload>"
    }
}
