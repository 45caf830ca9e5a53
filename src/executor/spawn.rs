//! Thread-per-callback executor
//!
//! Every callback gets a fresh OS thread. This is wasteful, but a slow callback
//! can never delay another one, and it works even when no pool is available.

use crate::error::ExecutorError;
use crate::executor::{CallbackExecutor, Job};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;


/// CallbackExecutor implementation which spawns one thread per job
#[derive(Clone, Debug, Default)]
pub struct ThreadSpawnExecutor {
    /// Optional name given to the spawned threads
    thread_name: Option<Arc<str>>,
}
//
impl ThreadSpawnExecutor {
    /// Create a new thread-spawning executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the threads spawned by this executor
    pub fn with_thread_name(name: &str) -> Self {
        ThreadSpawnExecutor { thread_name: Some(name.into()) }
    }
}
//
impl CallbackExecutor for ThreadSpawnExecutor {
    fn execute(&self, job: Job) -> Result<(), (ExecutorError, Job)> {
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.thread_name {
            builder = builder.name(name.to_string());
        }

        // The job is shared with the thread so that it can be handed back if
        // the thread never starts
        let slot = Arc::new(Mutex::new(Some(job)));
        let c_slot = slot.clone();
        let spawned = builder.spawn(move || {
            let job = c_slot.lock().take();
            if let Some(job) = job {
                job();
            }
        });
        match spawned {
            Ok(_) => Ok(()),
            Err(e) => match slot.lock().take() {
                Some(job) => Err((ExecutorError::Spawn(e.to_string()), job)),
                None => Ok(()),
            },
        }
    }
}
