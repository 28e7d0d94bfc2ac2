//! Async runtime used to drive network tasks in the background.
//!
//! Tasks started without an explicit executor run on a process-wide Tokio
//! runtime owned by this module. Completion callbacks run on the runtime's
//! worker threads; hop to your own thread inside the callback if you need
//! thread affinity.
//!
//! # Example: Spawning an Async Job
//!
//! ```no_run
//! use netask_core::async_runtime::AsyncRuntime;
//!
//! # async fn fetch_data() -> String { "data".to_string() }
//!
//! let runtime = AsyncRuntime::global();
//! let handle = runtime.spawn(async { fetch_data().await });
//!
//! // Wait for the result (blocking)
//! let result = handle.blocking_wait();
//! ```
//!
//! # Example: Completion Callback
//!
//! ```no_run
//! use netask_core::async_runtime::AsyncRuntime;
//!
//! # async fn expensive_computation() -> i32 { 42 }
//!
//! AsyncRuntime::global().spawn_with_callback(
//!     async { expensive_computation().await },
//!     |result| println!("Got result: {}", result),
//! );
//! ```
//!
//! # Runtime Types
//!
//! - **Multi-threaded** (default): Tokio's multi-threaded scheduler.
//! - **Single-threaded**: A current-thread runtime on one dedicated thread,
//!   useful when deterministic ordering of completions is wanted.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;

use crate::logging::targets;

/// Global async runtime instance.
static GLOBAL_RUNTIME: OnceLock<AsyncRuntime> = OnceLock::new();

/// Counter for unique job IDs.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// The type of async runtime to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeType {
    /// Multi-threaded runtime using Tokio's default scheduler.
    #[default]
    MultiThreaded,

    /// Single-threaded runtime on a dedicated thread.
    SingleThreaded,
}

/// Configuration for the async runtime.
#[derive(Debug, Clone)]
pub struct AsyncRuntimeConfig {
    /// The type of runtime to create.
    pub runtime_type: RuntimeType,
    /// Number of worker threads for multi-threaded runtime.
    /// Defaults to the number of CPU cores.
    pub worker_threads: Option<usize>,
    /// Name prefix for runtime threads.
    pub thread_name: String,
}

impl Default for AsyncRuntimeConfig {
    fn default() -> Self {
        Self {
            runtime_type: RuntimeType::MultiThreaded,
            worker_threads: None,
            thread_name: "netask-worker".to_string(),
        }
    }
}

impl AsyncRuntimeConfig {
    /// Create a configuration for a multi-threaded runtime.
    pub fn multi_threaded() -> Self {
        Self {
            runtime_type: RuntimeType::MultiThreaded,
            ..Default::default()
        }
    }

    /// Create a configuration for a single-threaded runtime.
    pub fn single_threaded() -> Self {
        Self {
            runtime_type: RuntimeType::SingleThreaded,
            ..Default::default()
        }
    }

    /// Set the number of worker threads (multi-threaded runtime only).
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// A handle to a spawned async job.
#[derive(Debug)]
pub struct AsyncTaskHandle<T> {
    id: u64,
    receiver: oneshot::Receiver<T>,
}

impl<T> AsyncTaskHandle<T> {
    /// Get the unique job ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the job to complete, blocking the current thread.
    ///
    /// Returns `None` if the job panicked or the runtime shut down first.
    ///
    /// # Warning
    ///
    /// Do not call this from within an async context; it blocks the thread.
    pub fn blocking_wait(self) -> Option<T> {
        self.receiver.blocking_recv().ok()
    }

    /// Try to get the result without blocking.
    ///
    /// Gives the handle back if the job has not completed yet.
    pub fn try_get(mut self) -> Result<T, Self> {
        match self.receiver.try_recv() {
            Ok(value) => Ok(value),
            Err(_) => Err(self),
        }
    }

    /// Await the result from an async context.
    pub async fn wait(self) -> Option<T> {
        self.receiver.await.ok()
    }
}

/// Internal state for the single-threaded runtime.
struct SingleThreadedState {
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: oneshot::Sender<()>,
}

/// The async runtime manager.
pub struct AsyncRuntime {
    /// Kept alive so the multi-threaded runtime does not shut down.
    #[allow(dead_code)]
    runtime: Option<Runtime>,
    handle: Handle,
    single_threaded: Option<SingleThreadedState>,
    runtime_type: RuntimeType,
    active_jobs: Arc<AtomicU64>,
}

impl AsyncRuntime {
    /// Get the global async runtime.
    ///
    /// The global runtime is lazily initialized with default settings
    /// (multi-threaded with automatic worker thread count).
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to create the runtime threads.
    pub fn global() -> &'static AsyncRuntime {
        GLOBAL_RUNTIME.get_or_init(|| {
            AsyncRuntime::new(AsyncRuntimeConfig::default())
                .expect("Failed to create global async runtime")
        })
    }

    /// Initialize the global async runtime with custom configuration.
    ///
    /// Must be called before the first task starts. Returns an error if the
    /// global runtime already exists.
    pub fn init_global(
        config: AsyncRuntimeConfig,
    ) -> Result<&'static AsyncRuntime, AsyncRuntimeError> {
        let runtime = AsyncRuntime::new(config)?;
        GLOBAL_RUNTIME
            .set(runtime)
            .map_err(|_| AsyncRuntimeError::AlreadyInitialized)?;
        GLOBAL_RUNTIME
            .get()
            .ok_or(AsyncRuntimeError::AlreadyInitialized)
    }

    /// Create a new async runtime with the given configuration.
    pub fn new(config: AsyncRuntimeConfig) -> Result<Self, AsyncRuntimeError> {
        tracing::debug!(
            target: targets::RUNTIME,
            runtime_type = ?config.runtime_type,
            worker_threads = ?config.worker_threads,
            "creating async runtime"
        );
        match config.runtime_type {
            RuntimeType::MultiThreaded => Self::new_multi_threaded(config),
            RuntimeType::SingleThreaded => Self::new_single_threaded(config),
        }
    }

    fn new_multi_threaded(config: AsyncRuntimeConfig) -> Result<Self, AsyncRuntimeError> {
        let mut builder = Builder::new_multi_thread();
        builder.thread_name(&config.thread_name).enable_all();

        if let Some(workers) = config.worker_threads {
            builder.worker_threads(workers);
        }

        let runtime = builder
            .build()
            .map_err(|e| AsyncRuntimeError::CreationFailed(e.to_string()))?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Some(runtime),
            handle,
            single_threaded: None,
            runtime_type: RuntimeType::MultiThreaded,
            active_jobs: Arc::new(AtomicU64::new(0)),
        })
    }

    fn new_single_threaded(config: AsyncRuntimeConfig) -> Result<Self, AsyncRuntimeError> {
        let (handle_tx, handle_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread_handle = std::thread::Builder::new()
            .name(format!("{}-main", config.thread_name))
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = handle_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = handle_tx.send(Ok(runtime.handle().clone()));

                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|e| AsyncRuntimeError::CreationFailed(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| AsyncRuntimeError::CreationFailed("runtime thread exited".to_string()))?
            .map_err(AsyncRuntimeError::CreationFailed)?;

        Ok(Self {
            runtime: None,
            handle,
            single_threaded: Some(SingleThreadedState {
                thread_handle: Mutex::new(Some(thread_handle)),
                shutdown_tx,
            }),
            runtime_type: RuntimeType::SingleThreaded,
            active_jobs: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get the runtime type.
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Get the number of jobs currently running.
    pub fn active_jobs(&self) -> u64 {
        self.active_jobs.load(Ordering::Acquire)
    }

    /// Get a handle to the Tokio runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn an async job on the runtime.
    ///
    /// Returns a handle that can be used to wait for the result.
    pub fn spawn<F, T>(&self, future: F) -> AsyncTaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        let active = ActiveJob::enter(&self.active_jobs);
        tracing::trace!(target: targets::RUNTIME, id, "spawning job");

        self.handle.spawn(async move {
            let _active = active;
            let result = future.await;
            let _ = sender.send(result);
        });

        AsyncTaskHandle { id, receiver }
    }

    /// Spawn an async job and hand its result to `callback`.
    ///
    /// The callback runs exactly once, on a runtime worker thread, after the
    /// job completes.
    pub fn spawn_with_callback<F, T, C>(&self, future: F, callback: C)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let active = ActiveJob::enter(&self.active_jobs);

        self.handle.spawn(async move {
            let _active = active;
            let result = future.await;
            callback(result);
        });
    }

    /// Block on a future, running it to completion.
    ///
    /// # Warning
    ///
    /// This blocks the current thread. Calling it from within an async
    /// context panics.
    pub fn block_on<F, T>(&self, future: F) -> T
    where
        F: Future<Output = T>,
    {
        self.handle.block_on(future)
    }

    /// Shutdown the runtime.
    ///
    /// For single-threaded runtimes this stops and joins the runtime thread;
    /// a multi-threaded runtime shuts down when dropped.
    pub fn shutdown(mut self) {
        if let Some(state) = self.single_threaded.take() {
            let _ = state.shutdown_tx.send(());
            if let Some(handle) = state.thread_handle.lock().take() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for AsyncRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRuntime")
            .field("runtime_type", &self.runtime_type)
            .field("active_jobs", &self.active_jobs())
            .finish()
    }
}

/// Counts one job as active until dropped, including when the job panics.
struct ActiveJob(Arc<AtomicU64>);

impl ActiveJob {
    fn enter(counter: &Arc<AtomicU64>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter.clone())
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Errors that can occur with the async runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncRuntimeError {
    /// The global runtime has already been initialized.
    AlreadyInitialized,
    /// Failed to create the runtime.
    CreationFailed(String),
}

impl std::fmt::Display for AsyncRuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "Async runtime already initialized"),
            Self::CreationFailed(msg) => write!(f, "Failed to create async runtime: {}", msg),
        }
    }
}

impl std::error::Error for AsyncRuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::time::Duration;

    #[test]
    fn test_spawn_and_wait() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        let handle = runtime.spawn(async { 42 });
        assert_eq!(handle.blocking_wait(), Some(42));
    }

    #[test]
    fn test_multiple_jobs() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        let counter = Arc::new(AtomicI32::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let counter = counter.clone();
                runtime.spawn(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.blocking_wait();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_spawn_with_callback_runs_once() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        runtime.spawn_with_callback(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                7
            },
            move |value| {
                tx.send(value).unwrap();
            },
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_panicking_job_yields_none() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        let handle = runtime.spawn(async {
            if true {
                panic!("job failed");
            }
            1
        });
        assert_eq!(handle.blocking_wait(), None);
    }

    #[test]
    fn test_panicking_jobs_leave_active_count() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        let handle = runtime.spawn(async {
            if true {
                panic!("job failed");
            }
        });
        assert_eq!(handle.blocking_wait(), None);

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        runtime.spawn_with_callback(
            async move {
                let _tx = tx;
                if true {
                    panic!("job failed");
                }
            },
            |()| {},
        );
        // The sender is dropped while the panicking job unwinds.
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(runtime.active_jobs(), 0);
    }

    #[test]
    fn test_single_threaded_runtime() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::single_threaded()).unwrap();
        assert_eq!(runtime.runtime_type(), RuntimeType::SingleThreaded);

        let handle = runtime.spawn(async { 42 });
        assert_eq!(handle.blocking_wait(), Some(42));
        runtime.shutdown();
    }

    #[test]
    fn test_block_on_and_wait() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();
        assert_eq!(runtime.block_on(async { 42 }), 42);

        let handle = runtime.spawn(async { "done" });
        assert_eq!(runtime.block_on(handle.wait()), Some("done"));
    }

    #[test]
    fn test_active_job_count() {
        let runtime = AsyncRuntime::new(AsyncRuntimeConfig::multi_threaded()).unwrap();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                runtime.spawn(async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                })
            })
            .collect();

        std::thread::sleep(Duration::from_millis(10));
        let active = runtime.active_jobs();
        assert!(active > 0 && active <= 3);

        for handle in handles {
            handle.blocking_wait();
        }

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(runtime.active_jobs(), 0);
    }
}
