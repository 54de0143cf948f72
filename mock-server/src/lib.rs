//! Scriptable HTTP server for exercising the ajax client end to end.
//!
//! Routes are registered as `(ServerInit, ServerReply)` pairs keyed by
//! `METHOD:path?query`. A JSON reply echoes what the server received
//! (`{url, method, headers, data, body}`); a text reply returns `data` as
//! the raw body. Anything unregistered is a 404.

use std::{collections::BTreeMap, collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock, task::JoinHandle};

/// Which request a route answers, and how the server behaves around it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerInit {
    /// Path with optional query, or a full `http://host:port/...` URL.
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Reply delay in seconds.
    #[serde(default)]
    pub timeout: f64,
    /// `false` suppresses `Access-Control-Allow-Origin`.
    #[serde(default)]
    pub cors: Option<bool>,
    /// Names become `Access-Control-Allow-Headers`.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub methods: Option<String>,
    #[serde(default)]
    pub credentials: Option<bool>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ServerInit {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_ascii_uppercase(),
            timeout: 0.0,
            cors: None,
            headers: None,
            methods: None,
            credentials: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    pub fn delay(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyKind {
    /// Echo the received request as JSON.
    #[default]
    #[serde(alias = "")]
    Json,
    /// Send `data` as the raw body.
    #[serde(alias = "formData", alias = "blob", alias = "arrayBuffer", alias = "document")]
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerReply {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub data: Value,
    #[serde(rename = "type", default)]
    pub kind: ReplyKind,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_status() -> u16 {
    200
}

impl Default for ServerReply {
    fn default() -> Self {
        Self {
            status: 200,
            data: Value::Null,
            kind: ReplyKind::Json,
            headers: BTreeMap::new(),
        }
    }
}

impl ServerReply {
    pub fn json(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn text(data: &str) -> Self {
        Self {
            data: Value::String(data.to_string()),
            kind: ReplyKind::Text,
            ..Self::default()
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Deserialize)]
pub struct Registration {
    pub init: ServerInit,
    #[serde(default)]
    pub reply: ServerReply,
}

pub type Routes = Arc<RwLock<HashMap<String, (ServerInit, ServerReply)>>>;

pub fn app(routes: Routes) -> Router {
    Router::new()
        .route("/__mock/routes", post(register_route))
        .fallback(dispatch)
        .with_state(routes)
}

pub async fn run(listener: TcpListener, routes: Routes) -> Result<(), std::io::Error> {
    axum::serve(listener, app(routes)).await
}

/// Register `reply` for `init`. A route whose `methods` list mentions
/// `OPTIONS` also answers preflight requests.
pub async fn register(routes: &Routes, init: ServerInit, reply: ServerReply) {
    let path = local_path(&init.url);
    let mut table = routes.write().await;
    if init.methods.as_deref().is_some_and(|m| m.contains("OPTIONS")) {
        table.insert(route_key("OPTIONS", &path), (init.clone(), reply.clone()));
    }
    table.insert(route_key(&init.method, &path), (init, reply));
}

async fn register_route(State(routes): State<Routes>, Json(input): Json<Registration>) -> StatusCode {
    log::info!("registering {} {}", input.init.method, input.init.url);
    register(&routes, input.init, input.reply).await;
    StatusCode::NO_CONTENT
}

async fn dispatch(State(routes): State<Routes>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let method = parts.method.as_str().to_string();

    let route = routes.read().await.get(&route_key(&method, &url)).cloned();
    let Some((init, reply)) = route else {
        log::debug!("no route for {method} {url}");
        return (StatusCode::NOT_FOUND, [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]).into_response();
    };

    let raw = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    if let Ok(delay) = Duration::try_from_secs_f64(init.timeout) {
        tokio::time::sleep(delay).await;
    }

    let mut headers = HeaderMap::new();
    if init.cors != Some(false) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    if let Some(allowed) = &init.headers {
        let names = allowed.keys().cloned().collect::<Vec<_>>().join(",");
        insert(&mut headers, "access-control-allow-headers", &names);
    }
    if let Some(methods) = &init.methods {
        insert(&mut headers, "access-control-allow-methods", methods);
    }
    if let Some(credentials) = init.credentials {
        insert(&mut headers, "access-control-allow-credentials", &credentials.to_string());
    }
    for (name, value) in &reply.headers {
        insert(&mut headers, name, value);
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    let body = match reply.kind {
        ReplyKind::Text => match &reply.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
        ReplyKind::Json => {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            json!({
                "url": url,
                "method": method,
                "headers": echo_headers(&parts.headers),
                "data": reply.data,
                "body": raw,
            })
            .to_string()
        }
    };
    (status, headers, Body::from(body)).into_response()
}

fn route_key(method: &str, url: &str) -> String {
    format!("{}:{url}", method.to_ascii_uppercase())
}

/// Strip `http://host:port` so full URLs and paths share one key space.
fn local_path(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => match rest.find('/') {
            Some(slash) => rest[slash..].to_string(),
            None => "/".to_string(),
        },
        None => url.to_string(),
    }
}

fn insert(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        headers.insert(name, value);
    }
}

fn echo_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut echoed = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            echoed
                .entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }
    echoed
}

/// A server bound to a random local port, shut down on drop.
pub struct MockServer {
    addr: SocketAddr,
    routes: Routes,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let routes = Routes::default();
        let serving = routes.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = run(listener, serving).await {
                log::error!("mock server stopped: {e}");
            }
        });
        Ok(Self { addr, routes, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn on(&self, init: ServerInit, reply: ServerReply) -> &Self {
        register(&self.routes, init, reply).await;
        self
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_defaults_to_get() {
        let init: ServerInit = serde_json::from_str(r#"{"url":"/x"}"#).unwrap();
        assert_eq!(init.method, "GET");
        assert_eq!(init.timeout, 0.0);
    }

    #[test]
    fn reply_defaults() {
        let reply: ServerReply = serde_json::from_str(r#"{"type":""}"#).unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.kind, ReplyKind::Json);
        assert!(reply.data.is_null());

        let reply: ServerReply = serde_json::from_str(r#"{"type":"arrayBuffer","data":"x"}"#).unwrap();
        assert_eq!(reply.kind, ReplyKind::Text);
    }

    #[test]
    fn full_urls_share_keys_with_paths() {
        assert_eq!(local_path("http://127.0.0.1:9/a/b?c=1"), "/a/b?c=1");
        assert_eq!(local_path("http://localhost:9"), "/");
        assert_eq!(local_path("/a"), "/a");
        assert_eq!(route_key("post", "/a"), "POST:/a");
    }
}
