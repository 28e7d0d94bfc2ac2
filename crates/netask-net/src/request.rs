//! Request descriptors.
//!
//! A [`Request`] is the full, declarative configuration for one task
//! execution: the endpoint, headers, parameter encoding, cache and retry
//! policy, and the ordered precondition and response validator lists.
//!
//! # Example
//!
//! ```
//! use netask_net::{Endpoint, Request, ValidationError};
//!
//! let request = Request::new(Endpoint::new("https://api.example.com", "/me"))
//!     .header("Accept", "application/json")
//!     .retry_count(2)
//!     .ignore_local_cache(true)
//!     .precondition(|| Ok(()))
//!     .response_validation(|_request, response, _data| {
//!         if response.header("x-api-version") == Some("2") {
//!             Ok(())
//!         } else {
//!             Err(ValidationError::msg("unsupported API version"))
//!         }
//!     });
//!
//! let outgoing = request.outgoing_request().unwrap();
//! assert_eq!(outgoing.url.as_str(), "https://api.example.com/me");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};

use crate::encoding::ParameterEncoding;
use crate::endpoint::Endpoint;
use crate::error::{Result, TaskError, ValidationError};
use crate::http::{CachePolicy, OutgoingRequest, ResponseHead};
use crate::retry::RetryPolicy;

/// A check run before any network I/O.
pub type Precondition = Arc<dyn Fn() -> std::result::Result<(), ValidationError> + Send + Sync>;

/// A check run on the received response before the result is parsed.
///
/// Receives the outgoing request (when available), the response head and the
/// response payload (when available).
pub type ResponseValidator = Arc<
    dyn Fn(Option<&OutgoingRequest>, &ResponseHead, Option<&[u8]>) -> std::result::Result<(), ValidationError>
        + Send
        + Sync,
>;

/// Declarative configuration for one task execution.
#[derive(Clone)]
pub struct Request {
    endpoint: Endpoint,
    headers: BTreeMap<String, String>,
    encoding: Option<ParameterEncoding>,
    retry_count: u32,
    ignore_local_cache: bool,
    preconditions: Vec<Precondition>,
    response_validations: Vec<ResponseValidator>,
}

impl Request {
    /// Create a request for `endpoint` with default policies.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            headers: BTreeMap::new(),
            encoding: None,
            retry_count: 0,
            ignore_local_cache: false,
            preconditions: Vec::new(),
            response_validations: Vec::new(),
        }
    }

    /// Create a GET request for a full URL string.
    ///
    /// See [`Endpoint::from_url`] for how unparseable strings are handled.
    pub fn from_url(url: &str) -> Self {
        Self::new(Endpoint::from_url(url))
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add several headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Use a specific parameter encoding instead of the method-dependent default.
    pub fn encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Allow up to `count` automatic retries after the first failed attempt.
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Bypass local caches for this request.
    pub fn ignore_local_cache(mut self, ignore: bool) -> Self {
        self.ignore_local_cache = ignore;
        self
    }

    /// Append a precondition.
    pub fn precondition<F>(mut self, check: F) -> Self
    where
        F: Fn() -> std::result::Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.preconditions.push(Arc::new(check));
        self
    }

    /// Append a response validator.
    pub fn response_validation<F>(mut self, check: F) -> Self
    where
        F: Fn(Option<&OutgoingRequest>, &ResponseHead, Option<&[u8]>) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.response_validations.push(Arc::new(check));
        self
    }

    /// The target endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The configured headers.
    pub fn header_map(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The custom parameter encoding, if any.
    pub fn parameter_encoding(&self) -> Option<&ParameterEncoding> {
        self.encoding.as_ref()
    }

    /// Maximum number of retries.
    pub fn retries(&self) -> u32 {
        self.retry_count
    }

    /// Whether local caches are bypassed.
    pub fn ignores_local_cache(&self) -> bool {
        self.ignore_local_cache
    }

    /// The registered preconditions, in order.
    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    /// The registered response validators, in order.
    pub fn response_validations(&self) -> &[ResponseValidator] {
        &self.response_validations
    }

    /// The retry policy derived from the retry count.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count)
    }

    /// The cache policy derived from the cache flag.
    pub fn cache_policy(&self) -> CachePolicy {
        if self.ignore_local_cache {
            CachePolicy::ReloadIgnoringLocalCache
        } else {
            CachePolicy::UseProtocol
        }
    }

    /// Run every precondition in order, stopping at the first failure.
    pub fn run_preconditions(&self) -> std::result::Result<(), ValidationError> {
        self.preconditions.iter().try_for_each(|check| check())
    }

    /// Run every response validator in order, stopping at the first failure.
    pub fn run_response_validators(
        &self,
        request: Option<&OutgoingRequest>,
        response: &ResponseHead,
        data: Option<&[u8]>,
    ) -> std::result::Result<(), ValidationError> {
        self.response_validations
            .iter()
            .try_for_each(|check| check(request, response, data))
    }

    /// Build the outgoing request with parameters encoded.
    pub fn outgoing_request(&self) -> Result<OutgoingRequest> {
        let mut outgoing = self.outgoing_request_without_parameters()?;
        self.encoding
            .clone()
            .unwrap_or_default()
            .encode(&mut outgoing, self.endpoint.parameters())?;
        Ok(outgoing)
    }

    /// Build the outgoing request, leaving parameters out.
    ///
    /// Upload tasks use this: their payload is the body.
    pub fn outgoing_request_without_parameters(&self) -> Result<OutgoingRequest> {
        let url = self.endpoint.url()?;
        let mut outgoing = OutgoingRequest::new(self.endpoint.method(), url);
        outgoing.cache_policy = self.cache_policy();

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TaskError::Encoding(format!("header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| TaskError::Encoding(format!("header {name:?} value: {e}")))?;
            outgoing.headers.insert(header_name, header_value);
        }

        Ok(outgoing)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers)
            .field("encoding", &self.encoding)
            .field("retry_count", &self.retry_count)
            .field("ignore_local_cache", &self.ignore_local_cache)
            .field("preconditions", &self.preconditions.len())
            .field("response_validations", &self.response_validations.len())
            .finish()
    }
}

impl From<Endpoint> for Request {
    fn from(endpoint: Endpoint) -> Self {
        Self::new(endpoint)
    }
}

/// A request whose body is a multipart form.
///
/// The endpoint parameters become plain text fields and `data` becomes one
/// binary part named `part_name`. With a file name the part is sent as a
/// file; without one it is a plain value part.
#[derive(Clone, Debug)]
pub struct MultipartRequest {
    request: Request,
    data: Bytes,
    mime_type: String,
    part_name: String,
    file_name: Option<String>,
}

impl MultipartRequest {
    /// Create a multipart request.
    pub fn new(
        request: Request,
        data: impl Into<Bytes>,
        mime_type: impl Into<String>,
        part_name: impl Into<String>,
    ) -> Self {
        Self {
            request,
            data: data.into(),
            mime_type: mime_type.into(),
            part_name: part_name.into(),
            file_name: None,
        }
    }

    /// Send the binary part as a file with this name.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// The underlying request descriptor.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The binary part's contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The binary part's MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The binary part's field name.
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// The binary part's file name, if it is sent as a file.
    pub fn part_file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use http::HeaderMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_precondition(
        calls: &Arc<AtomicUsize>,
        fail_with: Option<&'static str>,
    ) -> impl Fn() -> std::result::Result<(), ValidationError> + Send + Sync + 'static {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            match fail_with {
                Some(message) => Err(ValidationError::msg(message)),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_defaults() {
        let request = Request::new(Endpoint::new("https://example.com", "/"));
        assert_eq!(request.retries(), 0);
        assert!(!request.ignores_local_cache());
        assert!(request.header_map().is_empty());
        assert!(request.preconditions().is_empty());
        assert!(request.response_validations().is_empty());
        assert_eq!(request.cache_policy(), CachePolicy::UseProtocol);
    }

    #[test]
    fn test_preconditions_stop_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let request = Request::new(Endpoint::new("https://example.com", "/"))
            .precondition(counting_precondition(&calls, None))
            .precondition(counting_precondition(&calls, Some("second")))
            .precondition(counting_precondition(&calls, Some("third")))
            .precondition(counting_precondition(&calls, None));

        let error = request.run_preconditions().unwrap_err();
        assert_eq!(error.to_string(), "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_all_preconditions_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut request = Request::new(Endpoint::new("https://example.com", "/"));
        for _ in 0..5 {
            request = request.precondition(counting_precondition(&calls, None));
        }
        assert!(request.run_preconditions().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_response_validators_receive_inputs_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let request = Request::new(Endpoint::new("https://example.com", "/"))
            .response_validation(move |request, response, data| {
                seen.fetch_add(1, Ordering::SeqCst);
                assert_eq!(request.map(|r| r.url.as_str()), Some("https://example.com/"));
                assert_eq!(response.status(), 418);
                assert_eq!(data, Some(&b"teapot"[..]));
                Err(ValidationError::msg("first"))
            })
            .response_validation(|_, _, _| Err(ValidationError::msg("second")));

        let outgoing = request.outgoing_request().unwrap();
        let head = ResponseHead::new(418, HeaderMap::new());
        let error = request
            .run_response_validators(Some(&outgoing), &head, Some(&b"teapot"[..]))
            .unwrap_err();

        assert_eq!(error.to_string(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outgoing_request_mirrors_descriptor() {
        let endpoint = Endpoint::new("https://api.example.com", "/v1/items")
            .with_method(HttpMethod::Delete)
            .with_parameter("id", 7);
        let request = Request::new(endpoint)
            .header("Accept", "application/json")
            .header("X-Trace", "abc")
            .ignore_local_cache(true);

        let outgoing = request.outgoing_request().unwrap();
        assert_eq!(outgoing.method, HttpMethod::Delete);
        assert_eq!(outgoing.url.as_str(), "https://api.example.com/v1/items?id=7");
        assert_eq!(outgoing.headers.len(), 2);
        assert_eq!(outgoing.headers["accept"], "application/json");
        assert_eq!(outgoing.headers["x-trace"], "abc");
        assert_eq!(outgoing.cache_policy, CachePolicy::ReloadIgnoringLocalCache);
        assert!(outgoing.body.is_none());
    }

    #[test]
    fn test_outgoing_request_without_parameters() {
        let endpoint = Endpoint::new("https://example.com", "/upload")
            .with_method(HttpMethod::Post)
            .with_parameter("kind", "avatar");
        let outgoing = Request::new(endpoint)
            .outgoing_request_without_parameters()
            .unwrap();
        assert!(outgoing.body.is_none());
        assert_eq!(outgoing.url.query(), None);
    }

    #[test]
    fn test_invalid_header_is_an_encoding_error() {
        let request = Request::new(Endpoint::new("https://example.com", "/")).header("bad header", "x");
        assert!(matches!(request.outgoing_request(), Err(TaskError::Encoding(_))));
    }

    #[test]
    fn test_invalid_url_wins_over_encoding() {
        let request = Request::from_url("");
        assert!(matches!(request.outgoing_request(), Err(TaskError::InvalidUrl(raw)) if raw.is_empty()));
    }

    #[test]
    fn test_multipart_request() {
        let multipart = MultipartRequest::new(
            Request::from_url("https://example.com/upload"),
            &b"hello"[..],
            "text/plain",
            "file",
        )
        .file_name("hello.txt");

        assert_eq!(multipart.data().as_ref(), b"hello");
        assert_eq!(multipart.mime_type(), "text/plain");
        assert_eq!(multipart.part_name(), "file");
        assert_eq!(multipart.part_file_name(), Some("hello.txt"));
        assert_eq!(multipart.request().endpoint().path(), "/upload");
    }
}
