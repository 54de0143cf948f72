//! Plain-data HTTP vocabulary shared by the resolver, executor and transport.
//!
//! # Design
//! These are value types only: no I/O, no callbacks. Everything is owned
//! (`String`, `Bytes`) so a value can be handed to a transport running on
//! another task without lifetime concerns.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
    ];

    /// Lower-case name, as used for the per-method header tier.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Patch => "patch",
        }
    }

    /// Upper-case name, as sent on the wire and used in registry keys.
    pub fn as_upper(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// GET, HEAD, OPTIONS and DELETE put their parameters in the query string.
    pub fn carries_query(self) -> bool {
        matches!(
            self,
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Options | HttpMethod::Delete
        )
    }

    /// POST, PUT, PATCH and DELETE may send a body.
    pub fn carries_body(self) -> bool {
        matches!(
            self,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// A transport-ready request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(s) => s.len(),
            Payload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Text(s) => Bytes::from(s),
            Payload::Binary(b) => b,
        }
    }
}

/// Hint for how the response payload should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseType {
    #[default]
    #[serde(rename = "")]
    Default,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "arraybuffer")]
    ArrayBuffer,
    #[serde(rename = "blob")]
    Blob,
    #[serde(rename = "document")]
    Document,
}

/// Upload or download progress of a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn length_computable(&self) -> bool {
        self.total.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Patch.as_str(), "patch");
        assert_eq!(HttpMethod::Patch.as_upper(), "PATCH");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!("Options".parse::<HttpMethod>().unwrap(), HttpMethod::Options);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn delete_is_both_query_and_body_bearing() {
        assert!(HttpMethod::Delete.carries_query());
        assert!(HttpMethod::Delete.carries_body());
        assert!(HttpMethod::Get.carries_query() && !HttpMethod::Get.carries_body());
        assert!(HttpMethod::Post.carries_body() && !HttpMethod::Post.carries_query());
    }

    #[test]
    fn response_type_wire_names() {
        let parsed: ResponseType = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(parsed, ResponseType::Default);
        let parsed: ResponseType = serde_json::from_str(r#""arraybuffer""#).unwrap();
        assert_eq!(parsed, ResponseType::ArrayBuffer);
    }

    #[test]
    fn payload_bytes() {
        assert_eq!(Payload::Text("abc".into()).len(), 3);
        assert_eq!(Payload::Binary(Bytes::from_static(b"\x00\x01")).into_bytes().len(), 2);
        assert!(Payload::Text(String::new()).is_empty());
    }
}
