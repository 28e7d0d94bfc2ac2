//! Parameter encodings.
//!
//! An endpoint's parameters are written into the outgoing request either as
//! a query string, a form-urlencoded body, a JSON body or by a custom
//! [`ParameterEncoder`]. Nested values are flattened using the bracket
//! convention:
//!
//! | value                         | pairs                          |
//! |-------------------------------|--------------------------------|
//! | `{"ids": [1, 2]}`             | `ids[]=1`, `ids[]=2`           |
//! | `{"user": {"name": "Ada"}}`   | `user[name]=Ada`               |
//! | `{"active": true}`            | `active=true`                  |
//! | `{"cursor": null}`            | `cursor=`                      |

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;

use crate::endpoint::Parameters;
use crate::error::{Result, TaskError};
use crate::http::OutgoingRequest;

/// Boxed error returned by custom encoders.
pub type EncoderError = Box<dyn std::error::Error + Send + Sync>;

/// A custom strategy for writing parameters into a request.
pub trait ParameterEncoder: Send + Sync {
    /// Write `parameters` into `request`.
    fn encode(&self, request: &mut OutgoingRequest, parameters: &Parameters) -> std::result::Result<(), EncoderError>;
}

/// How endpoint parameters are written into the outgoing request.
#[derive(Clone, Default)]
pub enum ParameterEncoding {
    /// Query string for GET, HEAD and DELETE; form body otherwise.
    #[default]
    MethodDependent,
    /// Always append to the query string.
    QueryString,
    /// Always send as an `application/x-www-form-urlencoded` body.
    FormBody,
    /// Send the parameter map as an `application/json` body.
    Json,
    /// Delegate to a custom encoder.
    Custom(Arc<dyn ParameterEncoder>),
}

impl ParameterEncoding {
    /// Wrap a custom encoder.
    pub fn custom(encoder: impl ParameterEncoder + 'static) -> Self {
        Self::Custom(Arc::new(encoder))
    }

    /// Write `parameters` into `request`.
    ///
    /// Built-in encodings leave the request untouched when there are no
    /// parameters. A `Content-Type` header already present is kept.
    pub fn encode(&self, request: &mut OutgoingRequest, parameters: &Parameters) -> Result<()> {
        if let Self::Custom(encoder) = self {
            return encoder
                .encode(request, parameters)
                .map_err(|e| TaskError::Encoding(e.to_string()));
        }
        if parameters.is_empty() {
            return Ok(());
        }

        match self {
            Self::MethodDependent if request.method.encodes_parameters_in_url() => {
                encode_query(request, parameters);
            }
            Self::QueryString => encode_query(request, parameters),
            Self::MethodDependent | Self::FormBody => {
                let body = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(query_pairs(parameters))
                    .finish();
                set_body(
                    request,
                    Bytes::from(body),
                    "application/x-www-form-urlencoded; charset=utf-8",
                );
            }
            Self::Json => {
                let body = serde_json::to_vec(parameters).map_err(|e| TaskError::Encoding(e.to_string()))?;
                set_body(request, Bytes::from(body), "application/json");
            }
            Self::Custom(_) => {}
        }
        Ok(())
    }
}

impl fmt::Debug for ParameterEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MethodDependent => f.write_str("MethodDependent"),
            Self::QueryString => f.write_str("QueryString"),
            Self::FormBody => f.write_str("FormBody"),
            Self::Json => f.write_str("Json"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Flatten parameters into key/value pairs.
pub fn query_pairs(parameters: &Parameters) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        flatten(key, value, &mut pairs);
    }
    pairs
}

/// Render a single parameter value as plain text.
///
/// Strings are used as-is, nulls become empty and nested values become
/// JSON text.
pub fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn flatten(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Array(items) => {
            let nested = format!("{key}[]");
            for item in items {
                flatten(&nested, item, pairs);
            }
        }
        Value::Object(map) => {
            for (sub_key, item) in map {
                flatten(&format!("{key}[{sub_key}]"), item, pairs);
            }
        }
        scalar => pairs.push((key.to_string(), text_value(scalar))),
    }
}

fn encode_query(request: &mut OutgoingRequest, parameters: &Parameters) {
    request.url.query_pairs_mut().extend_pairs(query_pairs(parameters));
}

fn set_body(request: &mut OutgoingRequest, body: Bytes, content_type: &'static str) {
    request
        .headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static(content_type));
    request.body = Some(body);
}
