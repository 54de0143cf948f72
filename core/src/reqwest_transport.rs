//! [`Transport`] over `reqwest`.
//!
//! Two clients are kept: a plain one and one with a cookie store, chosen per
//! request by `with_credentials`. Bodies are streamed chunk by chunk so
//! download progress can be reported as it arrives.

use async_trait::async_trait;
use bytes::BytesMut;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpMethod, ProgressEvent};
use crate::transport::{RawResponse, Transport, TransportEvent, TransportRequest};

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    plain: reqwest::Client,
    credentialed: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            plain: reqwest::Client::builder().build()?,
            credentialed: reqwest::Client::builder().cookie_store(true).build()?,
        })
    }

    pub fn from_clients(plain: reqwest::Client, credentialed: reqwest::Client) -> Self {
        Self { plain, credentialed }
    }

    async fn exchange(&self, request: TransportRequest) -> Result<RawResponse, reqwest::Error> {
        let client = if request.with_credentials {
            &self.credentialed
        } else {
            &self.plain
        };

        let mut builder = client
            .request(method(request.method), &request.url)
            .headers(header_map(&request));
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let upload_len = request.body.as_ref().map(|body| body.len() as u64);
        if let Some(body) = request.body {
            builder = builder.body(body.into_bytes());
        }

        let mut response = builder.send().await?;
        if let (Some(progress), Some(len)) = (&request.on_upload_progress, upload_len) {
            progress(ProgressEvent {
                loaded: len,
                total: Some(len),
            });
        }

        let status = response.status();
        let raw_headers = raw_headers(response.headers());
        let total = response.content_length();
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if let Some(progress) = &request.on_download_progress {
                progress(ProgressEvent {
                    loaded: body.len() as u64,
                    total,
                });
            }
        }

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            raw_headers,
            body: body.freeze(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest, cancel: CancellationToken) -> TransportEvent {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => TransportEvent::Abort,
            result = self.exchange(request) => match result {
                Ok(raw) => TransportEvent::Load(raw),
                Err(e) if e.is_timeout() => TransportEvent::Timeout,
                Err(e) => TransportEvent::Error(diagnostics(&e)),
            },
        }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Patch => Method::PATCH,
    }
}

fn header_map(request: &TransportRequest) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in &request.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!("dropping unsendable header {name:?}"),
        }
    }
    map
}

/// Render a `HeaderMap` back into `name: value` lines.
fn raw_headers(headers: &HeaderMap) -> String {
    let mut raw = String::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            raw.push_str(name.as_str());
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
    }
    raw
}

/// The error and its source chain, joined with `: `.
fn diagnostics(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
