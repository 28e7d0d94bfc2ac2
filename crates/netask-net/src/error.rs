//! Error types for network tasks.

use std::fmt;
use std::sync::Arc;

/// Terminal failure of a network task.
///
/// Every pipeline stage maps its local failure into exactly one of these
/// variants; the variant tells which stage failed.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The endpoint did not resolve to an absolute `http`/`https` URL.
    #[error("Invalid URL: {0:?}")]
    InvalidUrl(String),
    /// A precondition rejected the request before any network I/O.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(ValidationError),
    /// A response validator rejected the received response.
    #[error("Response validation failed: {0}")]
    ResponseValidationFailed(ValidationError),
    /// The transfer failed after all permitted attempts.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// The response body could not be decoded into the result type.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// Parameters or headers could not be encoded into the request.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// An upload task was created without data or a file to send.
    #[error("Upload task requires a data or file payload")]
    MissingUploadPayload,
    /// The task was already started once.
    #[error("Task has already been started")]
    AlreadyStarted,
    /// A blocking wait was requested from a thread driving an async runtime.
    #[error("Cannot block on a task from inside an async runtime")]
    BlockingInRuntime,
    /// The outcome could not be determined.
    #[error("Unknown error")]
    Unknown,
}

impl TaskError {
    /// Whether the failure happened in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The HTTP status code, if the failure was a rejected status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(TransportError::HttpStatus { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Errors reported by the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Non-2xx status rejected by the baseline status check.
    #[error("HTTP {status}{}", status_suffix(.message))]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Response body text, if any.
        message: Option<String>,
    },
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Any other request failure.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Proxy configuration error.
    #[error("Proxy error: {0}")]
    Proxy(String),
}

fn status_suffix(message: &Option<String>) -> String {
    match message {
        Some(msg) if !msg.is_empty() => format!(": {msg}"),
        _ => String::new(),
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for TransportError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for TransportError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// Failure to decode a response body.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed JSON or JSON of the wrong shape.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
    /// The body is not valid UTF-8 text.
    #[error("Response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// Failure reported by a custom decoder.
    #[error("{0}")]
    Custom(String),
}

/// Error returned by precondition and response validators.
///
/// Wraps any error type, so validators can return their own errors and
/// callers can get them back with [`ValidationError::downcast_ref`].
#[derive(Clone)]
pub struct ValidationError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl ValidationError {
    /// Wrap an error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Get the wrapped error if it has type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Failure of one task inside a fail-fast batch.
#[derive(Debug, thiserror::Error)]
#[error("Task {index} failed: {source}")]
pub struct BatchError {
    /// Position of the failing task in the batch.
    pub index: usize,
    /// The task's own error.
    #[source]
    pub source: TaskError,
}

/// A specialized Result type for network tasks.
pub type Result<T> = std::result::Result<T, TaskError>;
