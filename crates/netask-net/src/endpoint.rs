//! API endpoints and URL resolution.

use std::collections::BTreeMap;

use url::{Position, Url};

use crate::error::{Result, TaskError};
use crate::http::HttpMethod;

/// Request parameters, keyed by name.
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// A logical API target: base URL, path, method and parameters.
///
/// The target URL is `base_url` followed by `path`, verbatim. Parameters are
/// encoded when the request is built (see
/// [`ParameterEncoding`](crate::encoding::ParameterEncoding)).
///
/// # Example
///
/// ```
/// use netask_net::{Endpoint, HttpMethod};
///
/// let endpoint = Endpoint::new("https://api.example.com", "/v1/users")
///     .with_method(HttpMethod::Post)
///     .with_parameter("name", "Ada");
///
/// assert_eq!(endpoint.url().unwrap().as_str(), "https://api.example.com/v1/users");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Endpoint {
    base_url: String,
    path: String,
    method: HttpMethod,
    parameters: Parameters,
}

impl Endpoint {
    /// Create a GET endpoint without parameters.
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method: HttpMethod::Get,
            parameters: Parameters::new(),
        }
    }

    /// Split a full URL into base (scheme, authority) and path.
    ///
    /// The path keeps any query string. A string that does not parse as a
    /// URL with a host gives an endpoint with empty base and path, which
    /// fails with [`TaskError::InvalidUrl`] once the task resolves it.
    pub fn from_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) if parsed.has_host() => Self::new(
                &parsed[..Position::BeforePath],
                &parsed[Position::BeforePath..Position::AfterQuery],
            ),
            _ => Self::new("", ""),
        }
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Replace all parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Add a single parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// The base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The path appended to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The unresolved target, `base_url + path`.
    pub fn url_string(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    /// Resolve the target into an absolute `http`/`https` URL.
    pub fn url(&self) -> Result<Url> {
        let raw = self.url_string();
        match Url::parse(&raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(url),
            _ => Err(TaskError::InvalidUrl(raw)),
        }
    }
}
