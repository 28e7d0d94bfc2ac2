//! Tasks that send a multipart form and parse the response.

use std::marker::PhantomData;
use std::sync::Arc;

use netask_core::{Progress, Signal};
use reqwest::multipart::{Form, Part};

use super::base::BaseTask;
use super::{Task, TaskState};
use crate::encoding::text_value;
use crate::endpoint::Endpoint;
use crate::error::{Result, TaskError, TransportError};
use crate::http::transport::{Direction, tracked_body};
use crate::http::{HttpClient, HttpMethod};
use crate::parsable::Parsable;
use crate::request::{MultipartRequest, Request};

/// Sends a `multipart/form-data` body and parses the response into `T`.
///
/// Each endpoint parameter becomes a text field. The binary data becomes one
/// more part, sent as a file when the request carries a file name. Progress
/// follows the bytes of the binary part.
///
/// ```no_run
/// use netask_net::{MultipartRequest, MultipartUploadTask, Request, Task};
///
/// # async fn run() -> netask_net::Result<()> {
/// let request = MultipartRequest::new(
///     Request::from_url("https://example.com/avatars"),
///     std::fs::read("avatar.png").unwrap(),
///     "image/png",
///     "avatar",
/// )
/// .file_name("avatar.png");
/// MultipartUploadTask::<()>::new(request).execute().await?;
/// # Ok(())
/// # }
/// ```
pub struct MultipartUploadTask<T> {
    base: Arc<BaseTask>,
    multipart: Arc<MultipartRequest>,
    _result: PhantomData<fn() -> T>,
}

impl<T> MultipartUploadTask<T> {
    /// Create a task using the shared client.
    pub fn new(request: MultipartRequest) -> Self {
        Self::build(request, None)
    }

    /// Create a task using a specific client.
    pub fn with_client(request: MultipartRequest, client: HttpClient) -> Self {
        Self::build(request, Some(client))
    }

    /// Create a POST task for a full URL string.
    pub fn from_url(
        url: &str,
        data: impl Into<bytes::Bytes>,
        mime_type: impl Into<String>,
        part_name: impl Into<String>,
    ) -> Self {
        let endpoint = Endpoint::from_url(url).with_method(HttpMethod::Post);
        Self::new(MultipartRequest::new(Request::new(endpoint), data, mime_type, part_name))
    }

    /// The multipart descriptor this task runs.
    pub fn request(&self) -> &MultipartRequest {
        &self.multipart
    }

    fn build(request: MultipartRequest, client: Option<HttpClient>) -> Self {
        Self {
            base: Arc::new(BaseTask::new(request.request().clone(), client)),
            multipart: Arc::new(request),
            _result: PhantomData,
        }
    }
}

impl<T> Clone for MultipartUploadTask<T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            multipart: self.multipart.clone(),
            _result: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for MultipartUploadTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartUploadTask")
            .field("base", &self.base)
            .field("part_name", &self.multipart.part_name())
            .field("mime_type", &self.multipart.mime_type())
            .finish()
    }
}

impl<T> Task for MultipartUploadTask<T>
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
        base.settle(check_mime_type(self.multipart.mime_type()))?;
        let multipart = &*self.multipart;

        let response = base.settle(
            base.transport()
                .fetch(
                    |client, progress| {
                        let form = form(multipart, progress)?;
                        Ok(outgoing.to_reqwest(client).multipart(form))
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

fn check_mime_type(mime_type: &str) -> Result<()> {
    Part::bytes(Vec::new())
        .mime_str(mime_type)
        .map(drop)
        .map_err(|e| TaskError::Encoding(format!("mime type {mime_type:?}: {e}")))
}

/// Assemble the form for one attempt.
fn form(multipart: &MultipartRequest, progress: &Progress) -> std::result::Result<Form, TransportError> {
    let mut form = Form::new();
    for (name, value) in multipart.request().endpoint().parameters() {
        form = form.text(name.clone(), text_value(value));
    }

    let data = multipart.data().clone();
    let length = data.len() as u64;
    let mut part = Part::stream_with_length(tracked_body(data, progress), length);
    if let Some(file_name) = multipart.part_file_name() {
        part = part.file_name(file_name.to_string());
    }
    let part = part.mime_str(multipart.mime_type())?;

    Ok(form.part(multipart.part_name().to_string(), part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_is_checked() {
        assert!(check_mime_type("image/png").is_ok());
        assert!(matches!(check_mime_type("not a mime"), Err(TaskError::Encoding(_))));
    }

    #[test]
    fn test_form_has_boundary() {
        let request = MultipartRequest::new(
            Request::new(Endpoint::new("https://example.com", "/upload").with_parameter("kind", "avatar")),
            &b"png"[..],
            "image/png",
            "avatar",
        );
        let progress = Progress::new(0);
        let form = form(&request, &progress).unwrap();

        assert!(!form.boundary().is_empty());
        assert_eq!(progress.total_unit_count(), 3);
    }

    #[test]
    fn test_from_url_defaults_to_post() {
        let task = MultipartUploadTask::<()>::from_url("https://example.com/upload", &b"x"[..], "text/plain", "file");
        assert_eq!(task.request().request().endpoint().method(), HttpMethod::Post);
        assert_eq!(task.request().part_name(), "file");
    }
}
