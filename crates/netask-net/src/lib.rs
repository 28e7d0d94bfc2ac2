//! Networking task layer for netask.
//!
//! This crate models network operations as discrete, progress-reporting
//! tasks built from declarative request descriptors:
//!
//! - **Endpoints and requests**: where to send, which headers, how to encode
//!   parameters, whether to bypass caches and how often to retry
//! - **Validation hooks**: preconditions run before any I/O and response
//!   validators run before parsing
//! - **Tasks**: [`DataTask`], [`DownloadTask`], [`UploadTask`] and
//!   [`MultipartUploadTask`], all sharing one execution pipeline
//! - **Parsing**: result types implement [`Parsable`]; JSON types opt in with
//!   [`JsonParsable`]
//! - **Batches**: [`await_all`] and [`await_all_results`] run tasks
//!   concurrently
//!
//! # Example
//!
//! ```no_run
//! use netask_net::{DataTask, Endpoint, HttpMethod, JsonParsable, Request, Task, ValidationError};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Session {
//!     token: String,
//! }
//!
//! impl JsonParsable for Session {}
//!
//! # async fn run() -> netask_net::Result<()> {
//! let endpoint = Endpoint::new("https://api.example.com", "/login")
//!     .with_method(HttpMethod::Post)
//!     .with_parameter("user", "ada");
//!
//! let request = Request::new(endpoint)
//!     .retry_count(2)
//!     .response_validation(|_, response, _| {
//!         if response.content_type().is_some_and(|ct| ct.starts_with("application/json")) {
//!             Ok(())
//!         } else {
//!             Err(ValidationError::msg("expected JSON"))
//!         }
//!     });
//!
//! let task = DataTask::<Session>::new(request);
//! task.progress().on_changed().connect(|fraction| println!("{:.0}%", fraction * 100.0));
//! let session = task.execute().await?;
//! println!("token: {}", session.token);
//! # Ok(())
//! # }
//! ```
//!
//! # Sessions
//!
//! Tasks use [`HttpClient::shared`] unless given a client with
//! `with_client`. Build one with [`HttpClient::builder`] to change timeouts,
//! redirects, cookies, default headers or the download scratch directory.

pub mod encoding;
mod endpoint;
mod error;
pub mod http;
mod parsable;
mod request;
mod retry;
pub mod task;

pub use encoding::{ParameterEncoder, ParameterEncoding};
pub use endpoint::{Endpoint, Parameters};
pub use error::{BatchError, ParseError, Result, TaskError, TransportError, ValidationError};
pub use http::{HttpClient, HttpClientBuilder, HttpMethod, OutgoingRequest, ResponseHead};
pub use parsable::{JsonDictionary, JsonParsable, JsonValue, Parsable};
pub use request::{MultipartRequest, Precondition, Request, ResponseValidator};
pub use retry::{Retrier, RetryDecision, RetryPolicy};
pub use task::{
    DataTask, DownloadTask, MultipartUploadTask, Task, TaskState, UploadPayload, UploadTask, await_all,
    await_all_results, wait_all, wait_all_results,
};

pub use netask_core::{Progress, ProgressSnapshot};
