//! Decoding response bodies into result types.
//!
//! A task's result type implements [`Parsable`]. Raw [`Bytes`] and UTF-8
//! [`String`] are supported directly; anything deserializable from JSON opts
//! in by implementing the [`JsonParsable`] marker:
//!
//! ```
//! use netask_net::{JsonParsable, Parsable};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl JsonParsable for User {}
//!
//! let users = Vec::<User>::parse(br#"[{"id": 1, "name": "Ada"}]"#).unwrap();
//! assert_eq!(users[0].name, "Ada");
//! ```
//!
//! Responses with loosely typed objects can be read as a [`JsonDictionary`].

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A type that can build itself from a raw response body.
pub trait Parsable: Sized {
    /// Decode `data`, failing on malformed input.
    fn parse(data: &[u8]) -> Result<Self, ParseError>;
}

/// Marker for types decoded from a JSON body.
pub trait JsonParsable: DeserializeOwned {}

impl<T: JsonParsable> Parsable for T {
    fn parse(data: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(data)?)
    }
}

impl Parsable for Bytes {
    fn parse(data: &[u8]) -> Result<Self, ParseError> {
        Ok(Bytes::copy_from_slice(data))
    }
}

impl Parsable for String {
    fn parse(data: &[u8]) -> Result<Self, ParseError> {
        Ok(String::from_utf8(data.to_vec())?)
    }
}

impl Parsable for () {
    fn parse(_data: &[u8]) -> Result<Self, ParseError> {
        Ok(())
    }
}

impl<T: JsonParsable> JsonParsable for Vec<T> {}
impl<T: JsonParsable> JsonParsable for Option<T> {}
impl<T: JsonParsable> JsonParsable for BTreeMap<String, T> {}
impl<T: JsonParsable> JsonParsable for HashMap<String, T> {}
impl JsonParsable for serde_json::Value {}
impl JsonParsable for JsonValue {}
impl JsonParsable for i64 {}
impl JsonParsable for f64 {}
impl JsonParsable for bool {}

/// A JSON object with heterogeneous values, addressable by key.
pub type JsonDictionary = BTreeMap<String, JsonValue>;

/// A leaf or nested value inside a [`JsonDictionary`].
///
/// Integral numbers that fit in an `i64` decode as [`JsonValue::Int`];
/// every other number decodes as [`JsonValue::Double`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonValue {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Any other number.
    Double(f64),
    /// JSON string.
    String(String),
    /// Nested array.
    Array(Vec<JsonValue>),
    /// Nested object.
    Object(JsonDictionary),
}

impl JsonValue {
    /// Whether this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, if this is an integral number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The numeric value as a float, for either number variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The entries, if this is an object.
    pub fn as_object(&self) -> Option<&JsonDictionary> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up `key` if this is an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object()?.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        label: String,
    }

    impl JsonParsable for Item {}

    #[test]
    fn test_bytes_passthrough() {
        let data = [0u8, 159, 146, 150];
        assert_eq!(Bytes::parse(&data).unwrap().as_ref(), &data);
    }

    #[test]
    fn test_string_requires_utf8() {
        assert_eq!(String::parse(b"hello").unwrap(), "hello");
        assert!(matches!(String::parse(&[0xff, 0xfe]), Err(ParseError::Utf8(_))));
    }

    #[test]
    fn test_object_and_array() {
        let item = Item::parse(br#"{"id": 3, "label": "three"}"#).unwrap();
        assert_eq!(item, Item { id: 3, label: "three".into() });

        let items = Vec::<Item>::parse(br#"[{"id": 1, "label": "a"}, {"id": 2, "label": "b"}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].label, "b");
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Item::parse(b"{\"id\": "), Err(ParseError::Json(_))));
        assert!(matches!(Item::parse(br#"{"id": "x", "label": "y"}"#), Err(ParseError::Json(_))));
        assert!(matches!(Vec::<Item>::parse(br#"{"id": 1}"#), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_heterogeneous_dictionary() {
        let dict = JsonDictionary::parse(
            br#"{
                "count": 3,
                "ratio": 0.5,
                "name": "netask",
                "enabled": true,
                "missing": null,
                "tags": ["a", 1],
                "owner": {"id": 9}
            }"#,
        )
        .unwrap();

        assert_eq!(dict["count"], JsonValue::Int(3));
        assert_eq!(dict["ratio"].as_f64(), Some(0.5));
        assert_eq!(dict["name"].as_str(), Some("netask"));
        assert_eq!(dict["enabled"].as_bool(), Some(true));
        assert!(dict["missing"].is_null());
        assert_eq!(
            dict["tags"].as_array(),
            Some(&[JsonValue::String("a".into()), JsonValue::Int(1)][..])
        );
        assert_eq!(dict["owner"].get("id").and_then(JsonValue::as_i64), Some(9));
    }

    #[test]
    fn test_large_numbers_fall_back_to_double() {
        let value = JsonValue::parse(b"18446744073709551615").unwrap();
        assert!(matches!(value, JsonValue::Double(_)));
    }
}
