//! The seam between the executor and the network.
//!
//! # Design
//! A [`Transport`] performs one exchange and reports exactly one
//! [`TransportEvent`]. It does not validate statuses, parse headers or
//! interpret the body; the executor does all of that. Raw headers come back
//! as a single `name: value` blob, one per line.
//!
//! The executor also races the transport against the cancellation token, so
//! a transport that ignores `cancel` is still aborted promptly. Honouring it
//! lets the transport tear the connection down early.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::config::ProgressCallback;
use crate::headers::Headers;
use crate::http::{HttpMethod, Payload, ResponseType};

#[derive(Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Only non-empty values.
    pub headers: Headers,
    pub body: Option<Payload>,
    pub timeout: Option<Duration>,
    pub response_type: ResponseType,
    pub with_credentials: bool,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub raw_headers: String,
    pub body: Bytes,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Load(RawResponse),
    /// Network-level failure with a human-readable diagnostic.
    Error(String),
    Timeout,
    Abort,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest, cancel: CancellationToken) -> TransportEvent;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest, cancel: CancellationToken) -> TransportEvent {
        (**self).send(request, cancel).await
    }
}
