//! Outgoing HTTP request types.

use bytes::Bytes;
use http::HeaderMap;
use http::header::{CACHE_CONTROL, HeaderValue, PRAGMA};
use url::Url;

use super::client::HttpClient;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP OPTIONS method.
    Options,
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP HEAD method.
    Head,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP PATCH method.
    Patch,
    /// HTTP DELETE method.
    Delete,
    /// HTTP TRACE method.
    Trace,
    /// HTTP CONNECT method.
    Connect,
}

impl HttpMethod {
    /// Every method, in declaration order.
    pub const ALL: [HttpMethod; 9] = [
        Self::Options,
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Trace,
        Self::Connect,
    ];

    /// The method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }

    /// Whether default parameter encoding puts parameters in the query string.
    ///
    /// True for GET, HEAD and DELETE; every other method sends parameters in
    /// a form-urlencoded body.
    pub fn encodes_parameters_in_url(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete)
    }

    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Options => reqwest::Method::OPTIONS,
            Self::Get => reqwest::Method::GET,
            Self::Head => reqwest::Method::HEAD,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Trace => reqwest::Method::TRACE,
            Self::Connect => reqwest::Method::CONNECT,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the transport treats locally cached responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Follow the protocol's caching rules.
    #[default]
    UseProtocol,
    /// Always fetch from the origin, bypassing local caches.
    ReloadIgnoringLocalCache,
}

/// A fully built request, as handed to the transport.
///
/// Response validators receive this snapshot so they can inspect exactly
/// what was sent.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The resolved target URL, including encoded query parameters.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Cache handling for this request.
    pub cache_policy: CachePolicy,
    /// Encoded request body, if parameters were encoded into one.
    pub body: Option<Bytes>,
}

impl OutgoingRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            cache_policy: CachePolicy::UseProtocol,
            body: None,
        }
    }

    /// Start a reqwest builder for one attempt of this request.
    pub(crate) fn to_reqwest(&self, client: &HttpClient) -> reqwest::RequestBuilder {
        let mut builder = client
            .reqwest_client()
            .request(self.method.to_reqwest(), self.url.clone())
            .headers(self.headers.clone());

        if self.cache_policy == CachePolicy::ReloadIgnoringLocalCache {
            builder = builder
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .header(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        let names: Vec<_> = HttpMethod::ALL.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            names,
            ["OPTIONS", "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "TRACE", "CONNECT"]
        );
        for method in HttpMethod::ALL {
            assert_eq!(method.to_reqwest().as_str(), method.as_str());
        }
    }

    #[test]
    fn test_parameter_placement() {
        assert!(HttpMethod::Get.encodes_parameters_in_url());
        assert!(HttpMethod::Head.encodes_parameters_in_url());
        assert!(HttpMethod::Delete.encodes_parameters_in_url());
        assert!(!HttpMethod::Post.encodes_parameters_in_url());
        assert!(!HttpMethod::Put.encodes_parameters_in_url());
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn test_cache_bypass_headers() {
        let client = HttpClient::new();
        let url = Url::parse("https://example.com/items").unwrap();

        let mut outgoing = OutgoingRequest::new(HttpMethod::Get, url);
        let plain = outgoing.to_reqwest(&client).build().unwrap();
        assert!(plain.headers().get(CACHE_CONTROL).is_none());

        outgoing.cache_policy = CachePolicy::ReloadIgnoringLocalCache;
        let bypass = outgoing.to_reqwest(&client).build().unwrap();
        assert_eq!(bypass.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(bypass.headers()[PRAGMA], "no-cache");
    }
}
