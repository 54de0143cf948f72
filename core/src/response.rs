//! Successful response values.

use bytes::Bytes;
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::headers::{find_header, HeaderValue, ResponseHeaders};
use crate::registry::Handle;

/// Response payload as surfaced by the executor and response transform.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseData {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Binary(Bytes),
    /// Markup text from an html/xml response under the `document` hint.
    Document(String),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) | ResponseData::Document(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ResponseData::Empty
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub data: ResponseData,
    pub headers: ResponseHeaders,
    pub status: u16,
    pub status_text: String,
    /// The exchange that produced this response.
    pub request: Handle,
    /// Set by `Client::ajax` once the response transform has run.
    pub config: Option<Box<ResolvedConfig>>,
}

impl Response {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        find_header(&self.headers, name)
    }
}
