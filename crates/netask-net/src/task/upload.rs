//! Tasks that send a raw body and parse the response.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use netask_core::{Progress, Signal};

use super::base::BaseTask;
use super::{Task, TaskState};
use crate::endpoint::Endpoint;
use crate::error::{Result, TaskError};
use crate::http::transport::{Direction, tracked_body};
use crate::http::{HttpClient, HttpMethod};
use crate::parsable::Parsable;
use crate::request::Request;

/// The body of an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadPayload {
    /// Bytes held in memory.
    Data(Bytes),
    /// A file read when the request is built.
    File(PathBuf),
}

impl UploadPayload {
    /// Pick a payload from optional sources, preferring in-memory data.
    ///
    /// Fails with [`TaskError::MissingUploadPayload`] when neither is given.
    pub fn from_options(data: Option<Bytes>, file: Option<PathBuf>) -> Result<Self> {
        match (data, file) {
            (Some(data), _) => Ok(Self::Data(data)),
            (None, Some(file)) => Ok(Self::File(file)),
            (None, None) => Err(TaskError::MissingUploadPayload),
        }
    }

    async fn load(&self) -> Result<Bytes> {
        match self {
            Self::Data(data) => Ok(data.clone()),
            Self::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| TaskError::Transport(e.into())),
        }
    }
}

impl From<Bytes> for UploadPayload {
    fn from(data: Bytes) -> Self {
        Self::Data(data)
    }
}

impl From<Vec<u8>> for UploadPayload {
    fn from(data: Vec<u8>) -> Self {
        Self::Data(Bytes::from(data))
    }
}

impl From<PathBuf> for UploadPayload {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Sends a payload as the request body and parses the response into `T`.
///
/// Endpoint parameters are not encoded; the payload is the whole body.
/// Progress follows the bytes sent.
///
/// ```no_run
/// use netask_net::{Task, UploadTask};
///
/// # async fn run() -> netask_net::Result<()> {
/// let task = UploadTask::<String>::from_url("https://example.com/notes", b"hello".to_vec());
/// let reply = task.execute().await?;
/// # Ok(())
/// # }
/// ```
pub struct UploadTask<T> {
    base: Arc<BaseTask>,
    payload: UploadPayload,
    _result: PhantomData<fn() -> T>,
}

impl<T> UploadTask<T> {
    /// Create a task using the shared client.
    pub fn new(request: impl Into<Request>, payload: impl Into<UploadPayload>) -> Self {
        Self::from_base(BaseTask::new(request.into(), None), payload.into())
    }

    /// Create a task using a specific client.
    pub fn with_client(request: impl Into<Request>, payload: impl Into<UploadPayload>, client: HttpClient) -> Self {
        Self::from_base(BaseTask::new(request.into(), Some(client)), payload.into())
    }

    /// Create a POST task for a full URL string.
    pub fn from_url(url: &str, payload: impl Into<UploadPayload>) -> Self {
        let endpoint = Endpoint::from_url(url).with_method(HttpMethod::Post);
        Self::new(Request::new(endpoint), payload)
    }

    /// Create a task from optional payload sources.
    ///
    /// Fails with [`TaskError::MissingUploadPayload`] when neither is given.
    pub fn from_options(request: impl Into<Request>, data: Option<Bytes>, file: Option<PathBuf>) -> Result<Self> {
        Ok(Self::new(request, UploadPayload::from_options(data, file)?))
    }

    /// The request descriptor this task runs.
    pub fn request(&self) -> &Request {
        self.base.request()
    }

    /// The body this task sends.
    pub fn payload(&self) -> &UploadPayload {
        &self.payload
    }

    fn from_base(base: BaseTask, payload: UploadPayload) -> Self {
        Self {
            base: Arc::new(base),
            payload,
            _result: PhantomData,
        }
    }
}

impl<T> Clone for UploadTask<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            payload: self.payload.clone(),
            _result: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for UploadTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTask")
            .field("base", &self.base)
            .field("payload", &self.payload)
            .finish()
    }
}

impl<T> Task for UploadTask<T>
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

        let outgoing = base.settle(base.request().outgoing_request_without_parameters())?;
        let body = base.settle(self.payload.load().await)?;
        let length = body.len();

        let response = base.settle(
            base.transport()
                .fetch(
                    |client, progress| {
                        Ok(outgoing
                            .to_reqwest(client)
                            .header(CONTENT_LENGTH, length)
                            .body(tracked_body(body.clone(), progress)))
                    },
                    Direction::Send,
                )
                .await
                .map_err(Into::into),
        )?;

        base.validate_response(Some(&outgoing), &response.head, Some(response.body.as_ref()))?;
        let value = base.settle(T::parse(&response.body).map_err(Into::into))?;
        base.succeed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_options() {
        let data = Bytes::from_static(b"abc");
        let file = PathBuf::from("/tmp/upload.bin");

        assert_eq!(
            UploadPayload::from_options(Some(data.clone()), Some(file.clone())).unwrap(),
            UploadPayload::Data(data)
        );
        assert_eq!(
            UploadPayload::from_options(None, Some(file.clone())).unwrap(),
            UploadPayload::File(file)
        );
        assert!(matches!(
            UploadPayload::from_options(None, None),
            Err(TaskError::MissingUploadPayload)
        ));
    }

    #[tokio::test]
    async fn test_file_payload_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");
        std::fs::write(&path, b"from disk").unwrap();

        let loaded = UploadPayload::File(path).load().await.unwrap();
        assert_eq!(loaded.as_ref(), b"from disk");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let result = UploadPayload::File(PathBuf::from("/definitely/not/here.bin")).load().await;
        assert!(matches!(result, Err(TaskError::Transport(crate::error::TransportError::Io(_)))));
    }

    #[test]
    fn test_from_url_defaults_to_post() {
        let task = UploadTask::<()>::from_url("https://example.com/upload", Bytes::from_static(b"x"));
        assert_eq!(task.request().endpoint().method(), HttpMethod::Post);
    }
}
