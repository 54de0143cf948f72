//! Runs one exchange against a [`Transport`] and settles it.
//!
//! # Design
//! An exchange walks a small state machine:
//!
//! ```text
//! Idle -> Opened -> Sent -> Loaded | Aborted | NetworkFailed | TimedOut
//! ```
//!
//! `Opened` is entered when the registry hands out a handle, `Sent` when the
//! transport is called. The send future is raced against the handle's
//! cancellation token with a biased `select!`, so an abort that lands at the
//! same time as a response wins. Whatever the outcome, the registry slot is
//! released when the exchange is dropped, including when the caller drops
//! the future mid-flight.

use log::{trace, warn};

use crate::config::ValidateStatus;
use crate::error::RequestError;
use crate::headers::{find_header, parse_response_headers, ResponseHeaders};
use crate::http::ResponseType;
use crate::registry::{Handle, Registry, RequestKey};
use crate::response::{Response, ResponseData};
use crate::transport::{RawResponse, Transport, TransportEvent, TransportRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Opened,
    Sent,
    Loaded,
    Aborted,
    NetworkFailed,
    TimedOut,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::Loaded
                | ExchangeState::Aborted
                | ExchangeState::NetworkFailed
                | ExchangeState::TimedOut
        )
    }

    fn can_move_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Idle, Opened) | (Opened, Sent) | (Sent, Loaded | Aborted | NetworkFailed | TimedOut)
        )
    }
}

/// Everything the executor needs besides the transport and registry.
pub(crate) struct Dispatch {
    pub signal: String,
    /// Configured timeout in seconds, for the error message.
    pub timeout_secs: f64,
    pub validate_status: ValidateStatus,
    pub request: TransportRequest,
}

struct Exchange<'a> {
    registry: &'a Registry,
    handle: Handle,
    state: ExchangeState,
}

impl<'a> Exchange<'a> {
    fn open(registry: &'a Registry, key: RequestKey) -> Self {
        let mut exchange = Self {
            registry,
            handle: registry.acquire(key),
            state: ExchangeState::Idle,
        };
        exchange.advance(ExchangeState::Opened);
        exchange
    }

    fn advance(&mut self, next: ExchangeState) {
        debug_assert!(
            self.state.can_move_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        trace!("{}: {:?} -> {next:?}", self.handle.key(), self.state);
        self.state = next;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.handle);
    }
}

pub(crate) async fn execute(
    transport: &dyn Transport,
    registry: &Registry,
    dispatch: Dispatch,
) -> Result<Response, RequestError> {
    let Dispatch {
        signal,
        timeout_secs,
        validate_status,
        mut request,
    } = dispatch;

    let key = RequestKey::new(&signal, request.method, &request.url);
    let mut exchange = Exchange::open(registry, key);
    let handle = exchange.handle.clone();

    request.headers.retain(|_, value| !value.is_empty());
    let response_type = request.response_type;

    exchange.advance(ExchangeState::Sent);
    let event = tokio::select! {
        biased;
        _ = handle.cancelled() => TransportEvent::Abort,
        event = transport.send(request, handle.token()) => event,
    };

    match event {
        TransportEvent::Load(raw) => {
            exchange.advance(ExchangeState::Loaded);
            let response = build_response(raw, response_type, handle);
            if validate_status(response.status) {
                Ok(response)
            } else {
                Err(RequestError::invalid_status(response))
            }
        }
        TransportEvent::Abort => {
            exchange.advance(ExchangeState::Aborted);
            Err(RequestError::aborted(handle))
        }
        TransportEvent::Error(diagnostics) => {
            warn!("{}: {diagnostics}", handle.key());
            exchange.advance(ExchangeState::NetworkFailed);
            Err(RequestError::network(handle, &diagnostics))
        }
        TransportEvent::Timeout => {
            exchange.advance(ExchangeState::TimedOut);
            Err(RequestError::timeout(handle, timeout_secs))
        }
    }
}

fn build_response(raw: RawResponse, hint: ResponseType, request: Handle) -> Response {
    let headers = parse_response_headers(&raw.raw_headers);
    let data = extract_data(raw.body, hint, &headers);
    Response {
        data,
        headers,
        status: raw.status,
        status_text: raw.status_text,
        request,
        config: None,
    }
}

fn extract_data(body: bytes::Bytes, hint: ResponseType, headers: &ResponseHeaders) -> ResponseData {
    match hint {
        ResponseType::Default | ResponseType::Text => {
            ResponseData::Text(String::from_utf8_lossy(&body).into_owned())
        }
        ResponseType::Json => serde_json::from_slice(&body)
            .map(ResponseData::Json)
            .unwrap_or_default(),
        ResponseType::ArrayBuffer | ResponseType::Blob => ResponseData::Binary(body),
        ResponseType::Document => {
            let markup = find_header(headers, "content-type")
                .is_some_and(|v| v.first().contains("html") || v.first().contains("xml"));
            if markup && !body.is_empty() {
                ResponseData::Document(String::from_utf8_lossy(&body).into_owned())
            } else {
                ResponseData::Empty
            }
        }
    }
}
