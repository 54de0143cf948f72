//! Error types for the ajax client.
//!
//! # Design
//! [`RequestError`] is the failure of an exchange itself and always carries
//! one of four [`Reason`]s. Only `InvalidStatus` has a response attached;
//! the others never reached one. Every error points back at the request
//! handle, and errors that went through `Client::ajax` also carry the
//! resolved config.
//!
//! [`AjaxError`] adds the failures that happen before an exchange starts or
//! after it completes: a request/response interceptor or a transform
//! callback returning an error. Those are passed through verbatim.

use std::fmt;

use crate::config::ResolvedConfig;
use crate::registry::Handle;
use crate::response::Response;
use crate::util::BoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// A response arrived but `validate_status` rejected it.
    InvalidStatus,
    /// Aborted through its handle, a cancel call, or preemption.
    RequestAborted,
    /// The transport failed to complete the exchange.
    NetworkError,
    /// The configured timeout elapsed.
    RequestTimeout,
}

impl Reason {
    pub fn code(self) -> &'static str {
        match self {
            Reason::InvalidStatus => "INVALID_STATUS",
            Reason::RequestAborted => "REQUEST_ABORTED",
            Reason::NetworkError => "NETWORK_ERROR",
            Reason::RequestTimeout => "REQUEST_TIMEOUT",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    reason: Reason,
    request: Handle,
    response: Option<Box<Response>>,
    config: Option<Box<ResolvedConfig>>,
}

impl RequestError {
    fn new(message: String, reason: Reason, request: Handle) -> Self {
        Self {
            message,
            reason,
            request,
            response: None,
            config: None,
        }
    }

    pub(crate) fn invalid_status(response: Response) -> Self {
        let mut error = Self::new(
            format!("request failed with status code {}", response.status),
            Reason::InvalidStatus,
            response.request.clone(),
        );
        error.response = Some(Box::new(response));
        error
    }

    pub(crate) fn aborted(request: Handle) -> Self {
        Self::new("request aborted".to_string(), Reason::RequestAborted, request)
    }

    pub(crate) fn network(request: Handle, diagnostics: &str) -> Self {
        Self::new(format!("network error: {diagnostics}"), Reason::NetworkError, request)
    }

    pub(crate) fn timeout(request: Handle, seconds: f64) -> Self {
        Self::new(format!("timeout of {seconds}s exceeded"), Reason::RequestTimeout, request)
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    pub fn is_cancel(&self) -> bool {
        self.reason == Reason::RequestAborted
    }

    pub fn request(&self) -> &Handle {
        &self.request
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_deref_mut()
    }

    pub fn config(&self) -> Option<&ResolvedConfig> {
        self.config.as_deref()
    }

    pub(crate) fn attach_config(&mut self, config: ResolvedConfig) {
        self.config = Some(Box::new(config));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AjaxError {
    #[error(transparent)]
    Request(#[from] RequestError),
    /// A request or response interceptor failed.
    #[error("interceptor failed: {0}")]
    Interceptor(#[source] BoxError),
    /// A query, body or response transform failed.
    #[error("transform failed: {0}")]
    Transform(#[source] BoxError),
}

impl AjaxError {
    pub fn is_cancel(&self) -> bool {
        matches!(self, AjaxError::Request(e) if e.is_cancel())
    }

    pub fn reason(&self) -> Option<Reason> {
        self.as_request().map(RequestError::reason)
    }

    pub fn as_request(&self) -> Option<&RequestError> {
        match self {
            AjaxError::Request(e) => Some(e),
            _ => None,
        }
    }
}
