//! Network tasks.
//!
//! A task is one discrete network operation built from a [`Request`]
//! descriptor. Every task runs the same pipeline:
//!
//! ```text
//! Created → CheckingPreconditions → BuildingRequest → InFlight
//!         → ValidatingResponse → ParsingResult → Succeeded
//! ```
//!
//! Any stage may end the task in `Failed` with the error of that stage.
//! Transport retries happen inside `InFlight` and are not visible as state
//! changes.
//!
//! Tasks are cheap handles: clones share the same execution, state and
//! progress. Each task runs at most once; starting it again fails with
//! [`TaskError::AlreadyStarted`].
//!
//! # Invocation styles
//!
//! ```no_run
//! use netask_net::{DataTask, Task};
//!
//! # async fn run() -> netask_net::Result<()> {
//! // Async
//! let body = DataTask::<String>::from_url("https://example.com/").execute().await?;
//!
//! // Callback on a background worker
//! DataTask::<String>::from_url("https://example.com/").start(|result| {
//!     println!("{:?}", result.map(|body| body.len()));
//! });
//! # Ok(())
//! # }
//!
//! // Blocking, from synchronous code
//! let body = DataTask::<String>::from_url("https://example.com/").wait();
//! ```
//!
//! [`Request`]: crate::Request

mod base;
mod batch;
mod data;
mod download;
mod multipart;
mod upload;

use std::fmt;
use std::future::Future;

use netask_core::logging::targets;
use netask_core::{AsyncRuntime, AsyncTaskHandle, Progress, Signal};
use tokio::runtime::Handle;

use crate::error::{Result, TaskError};

pub use batch::{await_all, await_all_results, wait_all, wait_all_results};
pub use data::DataTask;
pub use download::DownloadTask;
pub use multipart::MultipartUploadTask;
pub use upload::{UploadPayload, UploadTask};

/// Execution stage of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Constructed, not started.
    Created,
    /// Running preconditions.
    CheckingPreconditions,
    /// Resolving the URL and encoding the request.
    BuildingRequest,
    /// Transferring, including any retries.
    InFlight,
    /// Running response validators.
    ValidatingResponse,
    /// Decoding the result.
    ParsingResult,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl TaskState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::CheckingPreconditions => "checking preconditions",
            Self::BuildingRequest => "building request",
            Self::InFlight => "in flight",
            Self::ValidatingResponse => "validating response",
            Self::ParsingResult => "parsing result",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A network operation that produces a value.
pub trait Task: Clone + Send + Sync + 'static {
    /// The value produced on success.
    type Output: Send + 'static;

    /// Progress of the whole task, from 0.0 to 1.0.
    fn progress(&self) -> &Progress;

    /// Current execution stage.
    fn state(&self) -> TaskState;

    /// Signal emitted on every state transition.
    fn state_changed(&self) -> &Signal<TaskState>;

    /// Run the task to completion.
    fn execute(&self) -> impl Future<Output = Result<Self::Output>> + Send;

    /// Run the task on the background runtime and hand the outcome to
    /// `callback`, which runs once on a runtime worker thread.
    fn start<F>(&self, callback: F)
    where
        F: FnOnce(Result<Self::Output>) + Send + 'static,
    {
        let task = self.clone();
        AsyncRuntime::global().spawn_with_callback(async move { task.execute().await }, callback);
    }

    /// Run the task on the background runtime.
    fn spawn(&self) -> AsyncTaskHandle<Result<Self::Output>> {
        let task = self.clone();
        AsyncRuntime::global().spawn(async move { task.execute().await })
    }

    /// Run the task on the background runtime and block until it finishes.
    ///
    /// Called from a thread that drives an async runtime (including a
    /// [`start`](Task::start) callback), it fails with
    /// [`TaskError::BlockingInRuntime`] and leaves the task unstarted.
    fn wait(&self) -> Result<Self::Output> {
        if Handle::try_current().is_ok() {
            tracing::debug!(target: targets::TASK, "blocking wait refused inside a runtime");
            return Err(TaskError::BlockingInRuntime);
        }
        self.spawn().blocking_wait().unwrap_or(Err(TaskError::Unknown))
    }
}
