//! Multi-threaded behaviour of asynchronous operation handles

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;
use storage_async_ops::{AsyncOp, AsyncOperationHandle, ContractViolation, OperationError,
                        OperationState, ThreadPoolConfig, ThreadPoolExecutor,
                        ThreadSpawnExecutor, WaitSignal};

const PATIENCE: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A failure without callback is visible through the handle
#[test]
fn fail_without_callback() {
    init_logging();
    let (completer, handle) = AsyncOp::<u32>::new().split();
    completer.fail(OperationError::Timeout, false).unwrap();

    assert!(handle.is_completed());
    assert_eq!(handle.exception(), Some(OperationError::Timeout));
    assert_eq!(handle.exception().unwrap().to_string(), "timeout");
    assert_eq!(handle.result(), None);
    assert!(!handle.completed_synchronously());
}

/// A callback is run once, off the worker's stack, with the handle
#[test]
fn callback_runs_once_asynchronously() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let c_calls = calls.clone();
    let (completer, handle) = AsyncOp::<u32>::builder()
        .callback(move |handle: AsyncOperationHandle<u32>| {
            c_calls.fetch_add(1, Ordering::SeqCst);
            tx.send((thread::current().id(),
                     handle.result(),
                     handle.completed_synchronously())).unwrap();
        })
        .build()
        .split();

    completer.complete(42, true).unwrap();
    let (runner, result, synchronous) = rx.recv_timeout(PATIENCE).unwrap();
    assert_ne!(runner, thread::current().id());
    assert_eq!(result, Some(42));
    assert!(synchronous);

    // Concluding again must not trigger a second call
    assert!(completer.complete(43, true).is_err());
    drop(completer);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(rx.try_recv().is_err());

    assert!(handle.completed_synchronously());
    assert_eq!(handle.result(), Some(42));
}

/// A callback which calls back into the handle does not deadlock, even when
/// the worker is still holding on to the operation
#[test]
fn reentrant_callback() {
    init_logging();
    let (tx, rx) = mpsc::channel();
    let (completer, _) = AsyncOp::<String>::builder()
        .callback(move |handle| {
            let state = handle.state();
            let waited = handle.wait_timeout(Duration::from_millis(0));
            tx.send((state, waited, handle.result())).unwrap();
        })
        .executor(ThreadSpawnExecutor::new())
        .build()
        .split();

    completer.complete("metadata".to_owned(), false).unwrap();
    let (state, waited, result) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(state, OperationState::CompletedWithValue);
    assert_eq!(waited, Ok(true));
    assert_eq!(result.as_deref(), Some("metadata"));
}

/// Blocked waiters are released and see the final outcome
#[test]
fn waiters_are_released() {
    init_logging();
    let (completer, handle) = AsyncOp::<Vec<u8>>::new().split();
    let ready = Arc::new(Barrier::new(5));
    let waiters: Vec<_> = (0..4).map(|_| {
        let handle = handle.clone();
        let ready = ready.clone();
        thread::spawn(move || {
            ready.wait();
            let released = handle.wait_timeout(PATIENCE);
            (released, handle.is_completed(), handle.result())
        })
    }).collect();

    ready.wait();
    thread::sleep(Duration::from_millis(50));
    completer.complete(vec![0xCA, 0xFE], false).unwrap();

    for waiter in waiters {
        let (released, completed, result) = waiter.join().unwrap();
        assert_eq!(released, Ok(true));
        assert!(completed);
        assert_eq!(result, Some(vec![0xCA, 0xFE]));
    }
    assert!(handle.dispose());
}

/// Many readers racing one worker all see a consistent outcome
#[test]
fn concurrent_readers() {
    init_logging();
    const READERS: usize = 100;
    let (completer, handle) = AsyncOp::<u64>::new().split();
    let start = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS).map(|_| {
        let handle = handle.clone();
        let start = start.clone();
        thread::spawn(move || {
            start.wait();
            loop {
                let completed = handle.is_completed();
                let result = handle.result();
                if completed {
                    assert_eq!(handle.result(), Some(42));
                    assert_eq!(handle.exception(), None);
                    break;
                }
                if let Some(value) = result {
                    // A value may only become visible along with completion
                    assert_eq!(value, 42);
                    assert!(handle.is_completed());
                }
                thread::yield_now();
            }

            // Completion is monotonic
            for _ in 0..100 {
                assert!(handle.is_completed());
                assert_eq!(handle.result(), Some(42));
            }
        })
    }).collect();

    start.wait();
    completer.complete(42, false).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

/// Abandoned operations release their waiters with a dedicated error
#[test]
fn abandoned_operation() {
    init_logging();
    let (completer, handle) = AsyncOp::<u32>::new().split();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        drop(completer);
    });

    assert_eq!(handle.wait_timeout(PATIENCE), Ok(true));
    assert_eq!(handle.exception(), Some(OperationError::Abandoned));
    worker.join().unwrap();
}

/// The caller can wait on whichever of several operations concludes first
#[test]
fn wait_on_any_operation() {
    init_logging();
    let ops: Vec<_> = (0..3).map(|_| AsyncOp::<u32>::new().split()).collect();
    let handles: Vec<_> = ops.iter().map(|(_, h)| h.clone()).collect();
    let mut completers: Vec<_> = ops.into_iter().map(|(c, _)| c).collect();

    let second = completers.remove(1);
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        second.complete(2, false).unwrap();
    });

    let signals: Vec<&WaitSignal> = handles.iter()
                                           .map(|h| h.wait_handle().unwrap())
                                           .collect();
    assert_eq!(WaitSignal::wait_any(&signals, Some(PATIENCE)), Ok(Some(1)));
    assert_eq!(handles[1].result(), Some(2));
    assert!(!handles[0].is_completed());
    worker.join().unwrap();
}

/// A caller timing out does not prevent the operation from concluding later
#[test]
fn late_completion_after_timeout() {
    init_logging();
    let (completer, handle) = AsyncOp::<u32>::new().split();
    assert_eq!(handle.wait_timeout(Duration::from_millis(10)), Ok(false));

    completer.complete(5, false).unwrap();
    assert!(handle.is_completed());
    assert_eq!(handle.result(), Some(5));
}

/// Disposal keeps the outcome and blocks further use of the wait primitive
#[test]
fn dispose_after_completion() {
    init_logging();
    let (completer, handle) = AsyncOp::<u32>::new().split();
    completer.fail(OperationError::Transport("connection reset".into()), false)
             .unwrap();

    assert!(handle.dispose());
    assert!(!handle.dispose());
    assert_eq!(handle.exception(),
               Some(OperationError::Transport("connection reset".into())));
    assert_eq!(handle.wait(), Err(ContractViolation::Disposed));
}

/// Callbacks still run when the configured executor was shut down
#[test]
fn executor_fallback() {
    init_logging();
    let pool = Arc::new(
        ThreadPoolExecutor::new(ThreadPoolConfig::default().with_workers(1)).unwrap()
    );
    pool.shutdown();

    let called = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let c_called = called.clone();
    let (completer, _) = AsyncOp::<u32>::builder()
        .callback(move |_| {
            c_called.store(true, Ordering::SeqCst);
            tx.send(()).unwrap();
        })
        .executor(pool)
        .build()
        .split();

    completer.complete(1, false).unwrap();
    assert!(rx.recv_timeout(PATIENCE).is_ok());
    assert!(called.load(Ordering::SeqCst));
}
