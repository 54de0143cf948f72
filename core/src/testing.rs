//! Scripted transport for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::transport::{RawResponse, Transport, TransportEvent, TransportRequest};

type Respond = Box<dyn Fn(&TransportRequest) -> Option<TransportEvent> + Send + Sync>;

/// Answers each request from a closure. `None` means "hang until cancelled".
/// Every sent URL is also pushed onto a channel so tests can wait for the
/// exchange to be in flight.
pub(crate) struct FakeTransport {
    respond: Respond,
    requests: Mutex<Vec<TransportRequest>>,
    started: mpsc::UnboundedSender<String>,
}

impl FakeTransport {
    pub(crate) fn new<F>(respond: F) -> (Arc<Self>, mpsc::UnboundedReceiver<String>)
    where
        F: Fn(&TransportRequest) -> Option<TransportEvent> + Send + Sync + 'static,
    {
        let (started, rx) = mpsc::unbounded_channel();
        let transport = Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            started,
        };
        (Arc::new(transport), rx)
    }

    pub(crate) fn replying(status: u16, raw_headers: &'static str, body: &'static str) -> Arc<Self> {
        Self::new(move |_| Some(load(status, raw_headers, body))).0
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest, cancel: CancellationToken) -> TransportEvent {
        let reply = (self.respond)(&request);
        let url = request.url.clone();
        self.requests.lock().push(request);
        let _ = self.started.send(url);
        match reply {
            Some(event) => event,
            None => {
                cancel.cancelled().await;
                TransportEvent::Abort
            }
        }
    }
}

pub(crate) fn load(status: u16, raw_headers: &str, body: &str) -> TransportEvent {
    TransportEvent::Load(RawResponse {
        status,
        status_text: String::new(),
        raw_headers: raw_headers.to_string(),
        body: Bytes::copy_from_slice(body.as_bytes()),
    })
}
