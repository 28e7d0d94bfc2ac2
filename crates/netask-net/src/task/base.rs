//! Shared execution state and pipeline stages for all task kinds.

use std::sync::atomic::{AtomicBool, Ordering};

use netask_core::logging::targets;
use netask_core::{Progress, Signal};
use parking_lot::Mutex;

use super::TaskState;
use crate::error::{Result, TaskError};
use crate::http::transport::Transport;
use crate::http::{HttpClient, OutgoingRequest, ResponseHead};
use crate::request::Request;
use crate::retry::RetryPolicy;

/// State owned by every task: the descriptor, the session, the progress
/// tree and the lifecycle.
pub(crate) struct BaseTask {
    request: Request,
    client: HttpClient,
    retry_policy: RetryPolicy,
    /// One unit of work, backed by the transfer progress once in flight.
    progress: Progress,
    transfer: Progress,
    started: AtomicBool,
    state: Mutex<TaskState>,
    state_changed: Signal<TaskState>,
}

impl BaseTask {
    pub(crate) fn new(request: Request, client: Option<HttpClient>) -> Self {
        let retry_policy = request.retry_policy();
        Self {
            request,
            client: client.unwrap_or_else(HttpClient::shared),
            retry_policy,
            progress: Progress::new(1),
            transfer: Progress::new(0),
            started: AtomicBool::new(false),
            state: Mutex::new(TaskState::Created),
            state_changed: Signal::new(),
        }
    }

    pub(crate) fn request(&self) -> &Request {
        &self.request
    }

    pub(crate) fn client(&self) -> &HttpClient {
        &self.client
    }

    pub(crate) fn progress(&self) -> &Progress {
        &self.progress
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.lock()
    }

    pub(crate) fn state_changed(&self) -> &Signal<TaskState> {
        &self.state_changed
    }

    /// Claim the single execution and run the preconditions.
    ///
    /// Leaves the task in `BuildingRequest` on success.
    pub(crate) fn begin(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: targets::TASK, url = %self.request.endpoint().url_string(), "task already started");
            return Err(TaskError::AlreadyStarted);
        }

        self.transition(TaskState::CheckingPreconditions);
        self.settle(
            self.request
                .run_preconditions()
                .map_err(TaskError::PreconditionFailed),
        )?;

        self.transition(TaskState::BuildingRequest);
        Ok(())
    }

    /// Enter `InFlight` and hand out the transport for this task.
    ///
    /// The transfer progress becomes the task's single unit of work here, so
    /// the task's progress stays at zero for failures before this point.
    pub(crate) fn transport(&self) -> Transport<'_> {
        self.progress.add_child(&self.transfer, 1);
        self.transition(TaskState::InFlight);
        Transport::new(&self.client, &self.retry_policy, &self.transfer)
    }

    /// Run the response validators, leaving the task in `ParsingResult`.
    pub(crate) fn validate_response(
        &self,
        request: Option<&OutgoingRequest>,
        response: &ResponseHead,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.transition(TaskState::ValidatingResponse);
        self.settle(
            self.request
                .run_response_validators(request, response, data)
                .map_err(TaskError::ResponseValidationFailed),
        )?;
        self.transition(TaskState::ParsingResult);
        Ok(())
    }

    /// Pass `result` through, moving to `Failed` if it is an error.
    pub(crate) fn settle<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ref error) = result {
            tracing::debug!(
                target: targets::TASK,
                url = %self.request.endpoint().url_string(),
                stage = %self.state(),
                %error,
                "task failed"
            );
            self.transition(TaskState::Failed);
        }
        result
    }

    /// Finish with a value.
    pub(crate) fn succeed<T>(&self, value: T) -> Result<T> {
        self.transition(TaskState::Succeeded);
        Ok(value)
    }

    fn transition(&self, next: TaskState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        tracing::debug!(target: targets::TASK, from = %previous, to = %next, "task state changed");
        self.state_changed.emit(next);
    }
}

impl std::fmt::Debug for BaseTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("request", &self.request)
            .field("state", &self.state())
            .field("progress", &self.progress)
            .finish()
    }
}
