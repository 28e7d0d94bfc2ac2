//! Tasks that stream a response body to disk.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use netask_core::logging::targets;
use netask_core::{Progress, Signal};

use super::base::BaseTask;
use super::{Task, TaskState};
use crate::error::{Result, TaskError};
use crate::http::HttpClient;
use crate::request::Request;

/// Downloads a response body to a file and resolves to its location.
///
/// The body is first written to a uniquely named file in the client's
/// scratch directory. With a destination, the file is then moved there,
/// replacing any existing file, and the task resolves to the destination.
/// Without one it resolves to the scratch file, which the caller owns.
///
/// # Example
///
/// ```no_run
/// use netask_net::{DownloadTask, Request, Task};
///
/// let task = DownloadTask::new(Request::from_url("https://example.com/archive.zip"))
///     .destination("/tmp/archive.zip");
/// let path = task.wait().unwrap();
/// assert_eq!(path, std::path::Path::new("/tmp/archive.zip"));
/// ```
#[derive(Clone, Debug)]
pub struct DownloadTask {
    base: Arc<BaseTask>,
    destination: Option<PathBuf>,
}

impl DownloadTask {
    /// Create a task using the shared client.
    pub fn new(request: impl Into<Request>) -> Self {
        Self {
            base: Arc::new(BaseTask::new(request.into(), None)),
            destination: None,
        }
    }

    /// Create a task using a specific client.
    pub fn with_client(request: impl Into<Request>, client: HttpClient) -> Self {
        Self {
            base: Arc::new(BaseTask::new(request.into(), Some(client))),
            destination: None,
        }
    }

    /// Create a GET task for a full URL string.
    pub fn from_url(url: &str) -> Self {
        Self::new(Request::from_url(url))
    }

    /// Move the downloaded file to `path` on completion.
    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// The requested destination, if any.
    pub fn destination_path(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// The request descriptor this task runs.
    pub fn request(&self) -> &Request {
        self.base.request()
    }
}

impl Task for DownloadTask {
    type Output = PathBuf;

    fn progress(&self) -> &Progress {
        self.base.progress()
    }

    fn state(&self) -> TaskState {
        self.base.state()
    }

    fn state_changed(&self) -> &Signal<TaskState> {
        self.base.state_changed()
    }

    async fn execute(&self) -> Result<PathBuf> {
        let base = &self.base;
        base.begin()?;

        let outgoing = base.settle(base.request().outgoing_request())?;
        let scratch = base.client().scratch_dir().to_path_buf();
        base.settle(
            tokio::fs::create_dir_all(&scratch)
                .await
                .map_err(|e| TaskError::Transport(e.into())),
        )?;
        let temp = scratch.join(uuid::Uuid::new_v4().to_string());

        let transferred = base
            .transport()
            .download(|client, _| Ok(outgoing.to_reqwest(client)), &temp)
            .await;
        let head = match transferred {
            Ok(head) => head,
            Err(error) => {
                discard(&temp).await;
                return base.settle(Err(error.into()));
            }
        };

        if let Some(destination) = &self.destination {
            if let Err(error) = move_file(&temp, destination).await {
                discard(&temp).await;
                return base.settle(Err(TaskError::Transport(error.into())));
            }
        }

        let payload = payload_for_validation(self.destination.as_deref(), Some(temp.as_path())).await;
        base.validate_response(Some(&outgoing), &head, payload.as_deref())?;

        let location = base.settle(resolved_location(self.destination.as_deref(), Some(temp.as_path())))?;
        tracing::debug!(target: targets::TASK, path = %location.display(), "download complete");
        base.succeed(location)
    }
}

/// Move `from` to `to`, creating parent directories and replacing any
/// existing file. Falls back to copy and remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::remove_file(to).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if tokio::fs::rename(from, to).await.is_err() {
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        if error.kind() != io::ErrorKind::NotFound {
            tracing::warn!(target: targets::TASK, path = %path.display(), %error, "failed to remove scratch file");
        }
    }
}

/// Bytes handed to response validators: the destination file if one is
/// set and readable, else the scratch file, else nothing.
async fn payload_for_validation(destination: Option<&Path>, temp: Option<&Path>) -> Option<Vec<u8>> {
    let path = match (destination, temp) {
        (Some(destination), _) if destination.exists() => destination,
        (_, Some(temp)) if temp.exists() => temp,
        _ => return None,
    };
    tokio::fs::read(path).await.ok()
}

/// Where the downloaded file ended up.
fn resolved_location(destination: Option<&Path>, temp: Option<&Path>) -> Result<PathBuf> {
    match (destination, temp) {
        (Some(destination), _) if destination.exists() => Ok(destination.to_path_buf()),
        (_, Some(temp)) if temp.exists() => Ok(temp.to_path_buf()),
        _ => Err(TaskError::Unknown),
    }
}
