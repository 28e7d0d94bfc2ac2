//! HTTP response types.

use bytes::Bytes;
use http::HeaderMap;
use url::Url;

use crate::error::TransportError;

/// Status line and headers of a received response.
///
/// This is what response validators see; the body is passed alongside it.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    status: u16,
    headers: HeaderMap,
    url: Option<Url>,
}

impl ResponseHead {
    /// Create a response head, e.g. for exercising validators directly.
    pub fn new(status: u16, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            url: None,
        }
    }

    /// Create from a reqwest response.
    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            url: Some(response.url().clone()),
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response is a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the Content-Length header value.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.parse().ok()
    }

    /// Get the final URL after redirects, when known.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Baseline status check applied to every transfer.
    ///
    /// Only 2xx passes; anything else fails with the body text as message.
    pub fn error_for_status(&self, body: &[u8]) -> Result<(), TransportError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.status_error(body))
        }
    }

    /// The error describing this response's status.
    pub(crate) fn status_error(&self, body: &[u8]) -> TransportError {
        let message = (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned());
        TransportError::HttpStatus {
            status: self.status,
            message,
        }
    }
}

/// A response whose body was read into memory.
#[derive(Clone, Debug)]
pub struct ReceivedResponse {
    /// Status line and headers.
    pub head: ResponseHead,
    /// The complete body.
    pub body: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};

    #[test]
    fn test_status_classes() {
        let ok = ResponseHead::new(204, HeaderMap::new());
        assert!(ok.is_success());
        assert!(ok.error_for_status(b"").is_ok());

        let missing = ResponseHead::new(404, HeaderMap::new());
        assert!(missing.is_client_error());
        assert_eq!(
            missing.error_for_status(b""),
            Err(TransportError::HttpStatus {
                status: 404,
                message: None
            })
        );

        let broken = ResponseHead::new(503, HeaderMap::new());
        assert!(broken.is_server_error());
        assert_eq!(
            broken.error_for_status(b"maintenance"),
            Err(TransportError::HttpStatus {
                status: 503,
                message: Some("maintenance".to_string())
            })
        );

        let redirect = ResponseHead::new(304, HeaderMap::new());
        assert!(redirect.error_for_status(b"").is_err());
    }

    #[test]
    fn test_header_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));

        let head = ResponseHead::new(200, headers);
        assert_eq!(head.content_type(), Some("application/json"));
        assert_eq!(head.content_length(), Some(42));
        assert_eq!(head.header("x-missing"), None);
        assert!(head.url().is_none());
    }
}
