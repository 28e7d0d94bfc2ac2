//! Tasks that fetch a response body into memory and parse it.

use std::marker::PhantomData;
use std::sync::Arc;

use netask_core::{Progress, Signal};

use super::base::BaseTask;
use super::{Task, TaskState};
use crate::error::Result;
use crate::http::HttpClient;
use crate::http::transport::Direction;
use crate::parsable::Parsable;
use crate::request::Request;

/// Fetches a response body and parses it into `T`.
///
/// # Example
///
/// ```no_run
/// use netask_net::{DataTask, Endpoint, JsonDictionary, Request, Task};
///
/// # async fn run() -> netask_net::Result<()> {
/// let request = Request::new(Endpoint::new("https://api.example.com", "/status"))
///     .header("Accept", "application/json")
///     .retry_count(1);
/// let status = DataTask::<JsonDictionary>::new(request).execute().await?;
/// println!("{:?}", status.get("version"));
/// # Ok(())
/// # }
/// ```
pub struct DataTask<T> {
    base: Arc<BaseTask>,
    _result: PhantomData<fn() -> T>,
}

impl<T> DataTask<T> {
    /// Create a task using the shared client.
    pub fn new(request: impl Into<Request>) -> Self {
        Self::from_base(BaseTask::new(request.into(), None))
    }

    /// Create a task using a specific client.
    pub fn with_client(request: impl Into<Request>, client: HttpClient) -> Self {
        Self::from_base(BaseTask::new(request.into(), Some(client)))
    }

    /// Create a GET task for a full URL string.
    pub fn from_url(url: &str) -> Self {
        Self::new(Request::from_url(url))
    }

    /// The request descriptor this task runs.
    pub fn request(&self) -> &Request {
        self.base.request()
    }

    fn from_base(base: BaseTask) -> Self {
        Self {
            base: Arc::new(base),
            _result: PhantomData,
        }
    }
}

impl<T> Clone for DataTask<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            _result: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for DataTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DataTask").field(&self.base).finish()
    }
}

impl<T> Task for DataTask<T>
where
    T: Parsable + Send + 'static,
{
    type Output = T;

    fn progress(&self) -> &Progress {
        self.base.progress()
    }

    fn state(&self) -> TaskState {
        self.base.state()
    }

    fn state_changed(&self) -> &Signal<TaskState> {
        self.base.state_changed()
    }

    async fn execute(&self) -> Result<T> {
        let base = &self.base;
        base.begin()?;

        let outgoing = base.settle(base.request().outgoing_request())?;
        let response = base.settle(
            base.transport()
                .fetch(|client, _| Ok(outgoing.to_reqwest(client)), Direction::Receive)
                .await
                .map_err(Into::into),
        )?;

        base.validate_response(Some(&outgoing), &response.head, Some(response.body.as_ref()))?;
        let value = base.settle(T::parse(&response.body).map_err(Into::into))?;
        base.succeed(value)
    }
}
