//! Request descriptions at each stage of resolution.
//!
//! # Design
//! A call moves through three shapes:
//!
//! - [`Options`]: what the caller wrote. Every field is optional; `None`
//!   means "absent, use the default".
//! - [`Config`]: a complete description. A client's defaults are a `Config`,
//!   and [`Options::merge_over`] produces one by filling every absent field
//!   from the defaults, recursing into headers and structured values.
//! - [`ResolvedConfig`]: flat headers, final URL, transport-ready body. This
//!   is what gets executed and what responses and errors point back to.
//!
//! [`RequestConfig`] is the low-level shape accepted by `Client::request`,
//! which skips interceptors and transforms entirely.
//!
//! `Options` deserializes from JSON (callbacks excluded), which is how a
//! deployment ships base URL, headers and timeouts as data.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

use crate::callbacks;
use crate::headers::{HeaderConfig, Headers, DEFAULT_ACCEPT};
use crate::http::{HttpMethod, Payload, ProgressEvent, ResponseType};
use crate::response::ResponseData;
use crate::util::{merge_option, BoxError, Merge};

pub type TransformQuery =
    Arc<dyn Fn(&Query, &mut Headers) -> Result<Transformed<String>, BoxError> + Send + Sync>;
pub type TransformBody = Arc<
    dyn Fn(Option<Body>, &mut Headers) -> Result<Transformed<Option<Payload>>, BoxError>
        + Send
        + Sync,
>;
pub type TransformResponse =
    Arc<dyn Fn(ResponseData) -> Result<ResponseData, BoxError> + Send + Sync>;
pub type ValidateStatus = Arc<dyn Fn(u16) -> bool + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Query parameters: a ready string or a structured value to serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Text(String),
    Structured(Value),
}

impl Query {
    /// `true` for an empty string or a `null` value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Query::Text(s) if s.is_empty()) || matches!(self, Query::Structured(Value::Null))
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::Text(String::new())
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Query::Text(s.to_string())
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Query::Text(s)
    }
}

impl From<Value> for Query {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Query::Text(s),
            other => Query::Structured(other),
        }
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Query::from)
    }
}

impl Merge for Query {
    fn merge(self, defaults: &Self) -> Self {
        match (self, defaults) {
            (Query::Structured(own), Query::Structured(defaults)) => {
                Query::Structured(own.merge(defaults))
            }
            (own, _) => own,
        }
    }
}

/// Request body before transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Binary(Bytes),
    Structured(Value),
}

impl Body {
    /// Keep only shapes a transport can send as-is.
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Body::Text(s) if s.is_empty() => None,
            Body::Text(s) => Some(Payload::Text(s)),
            Body::Binary(b) => Some(Payload::Binary(b)),
            Body::Structured(_) => None,
        }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Binary(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Binary(Bytes::from(b))
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Body::Text(s),
            other => Body::Structured(other),
        }
    }
}

impl From<Payload> for Body {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(s) => Body::Text(s),
            Payload::Binary(b) => Body::Binary(b),
        }
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Body::from)
    }
}

impl Merge for Body {
    fn merge(self, defaults: &Self) -> Self {
        match (self, defaults) {
            (Body::Structured(own), Body::Structured(defaults)) => {
                Body::Structured(own.merge(defaults))
            }
            (own, _) => own,
        }
    }
}

/// Return value of a query/body transform: the value alone, or the value
/// plus a header map that replaces the current headers wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed<T> {
    Value(T),
    WithHeaders(T, Headers),
}

impl<T> Transformed<T> {
    pub fn into_parts(self) -> (T, Option<Headers>) {
        match self {
            Transformed::Value(value) => (value, None),
            Transformed::WithHeaders(value, headers) => (value, Some(headers)),
        }
    }
}

/// Input to `Client::ajax`: a bare URL or full options.
#[derive(Debug, Clone)]
pub enum Input {
    Url(String),
    Options(Options),
}

impl From<&str> for Input {
    fn from(url: &str) -> Self {
        Input::Url(url.to_string())
    }
}

impl From<String> for Input {
    fn from(url: String) -> Self {
        Input::Url(url)
    }
}

impl From<Options> for Input {
    fn from(options: Options) -> Self {
        Input::Options(options)
    }
}

/// Caller-supplied, partially specified request options.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    #[serde(rename = "baseURL")]
    pub base_url: Option<String>,
    pub params: Option<String>,
    pub query: Option<Query>,
    pub body: Option<Body>,
    pub headers: Option<HeaderConfig>,
    /// Seconds; `0` disables the timeout.
    pub timeout: Option<f64>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    /// Cancellation group.
    pub signal: Option<String>,
    #[serde(skip)]
    pub transform_query: Option<TransformQuery>,
    #[serde(skip)]
    pub transform_body: Option<TransformBody>,
    #[serde(skip)]
    pub transform_response: Option<TransformResponse>,
    #[serde(skip)]
    pub validate_status: Option<ValidateStatus>,
    #[serde(skip)]
    pub on_upload_progress: Option<ProgressCallback>,
    #[serde(skip)]
    pub on_download_progress: Option<ProgressCallback>,
}

impl Options {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn headers(mut self, headers: HeaderConfig) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    pub fn signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn transform_query<F>(mut self, f: F) -> Self
    where
        F: Fn(&Query, &mut Headers) -> Result<Transformed<String>, BoxError> + Send + Sync + 'static,
    {
        self.transform_query = Some(Arc::new(f));
        self
    }

    pub fn transform_body<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<Body>, &mut Headers) -> Result<Transformed<Option<Payload>>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.transform_body = Some(Arc::new(f));
        self
    }

    pub fn transform_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseData) -> Result<ResponseData, BoxError> + Send + Sync + 'static,
    {
        self.transform_response = Some(Arc::new(f));
        self
    }

    pub fn validate_status<F>(mut self, f: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(f));
        self
    }

    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    pub fn on_download_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(f));
        self
    }

    /// Fill every absent field from `defaults`. Present values always win;
    /// headers and structured query/body values are merged recursively.
    pub fn merge_over(self, defaults: &Config) -> Config {
        Config {
            url: self.url.unwrap_or_else(|| defaults.url.clone()),
            method: self.method.unwrap_or(defaults.method),
            base_url: self.base_url.unwrap_or_else(|| defaults.base_url.clone()),
            params: self.params.unwrap_or_else(|| defaults.params.clone()),
            query: merge_option(self.query, &defaults.query),
            body: match (self.body, &defaults.body) {
                (Some(own), Some(default)) => Some(own.merge(default)),
                (Some(own), None) => Some(own),
                (None, default) => default.clone(),
            },
            headers: merge_option(self.headers, &defaults.headers),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            response_type: self.response_type.unwrap_or(defaults.response_type),
            with_credentials: self.with_credentials.unwrap_or(defaults.with_credentials),
            signal: self.signal.unwrap_or_else(|| defaults.signal.clone()),
            transform_query: self
                .transform_query
                .unwrap_or_else(|| defaults.transform_query.clone()),
            transform_body: self
                .transform_body
                .unwrap_or_else(|| defaults.transform_body.clone()),
            transform_response: self
                .transform_response
                .unwrap_or_else(|| defaults.transform_response.clone()),
            validate_status: self
                .validate_status
                .unwrap_or_else(|| defaults.validate_status.clone()),
            on_upload_progress: self
                .on_upload_progress
                .or_else(|| defaults.on_upload_progress.clone()),
            on_download_progress: self
                .on_download_progress
                .or_else(|| defaults.on_download_progress.clone()),
        }
    }
}

/// A complete request description; also the shape of a client's defaults.
#[derive(Clone)]
pub struct Config {
    pub url: String,
    pub method: HttpMethod,
    pub base_url: String,
    pub params: String,
    pub query: Query,
    pub body: Option<Body>,
    pub headers: HeaderConfig,
    pub timeout: f64,
    pub response_type: ResponseType,
    pub with_credentials: bool,
    pub signal: String,
    pub transform_query: TransformQuery,
    pub transform_body: TransformBody,
    pub transform_response: TransformResponse,
    pub validate_status: ValidateStatus,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            base_url: String::new(),
            params: String::new(),
            query: Query::default(),
            body: None,
            headers: HeaderConfig::new().common("Accept", DEFAULT_ACCEPT),
            timeout: 0.0,
            response_type: ResponseType::Default,
            with_credentials: false,
            signal: String::new(),
            transform_query: Arc::new(callbacks::transform_query),
            transform_body: Arc::new(callbacks::transform_body),
            transform_response: Arc::new(callbacks::transform_response),
            validate_status: Arc::new(callbacks::validate_status),
            on_upload_progress: None,
            on_download_progress: None,
        }
    }
}

/// The fully resolved, transport-ready request description.
#[derive(Clone)]
pub struct ResolvedConfig {
    /// Final URL: base, path params and query folded in.
    pub url: String,
    pub method: HttpMethod,
    pub base_url: String,
    pub params: String,
    /// The query string that was folded into `url`.
    pub query: String,
    pub body: Option<Payload>,
    pub headers: Headers,
    pub timeout: f64,
    pub response_type: ResponseType,
    pub with_credentials: bool,
    pub signal: String,
    pub transform_response: TransformResponse,
    pub validate_status: ValidateStatus,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
}

/// Low-level request for `Client::request`. Absent fields come from the
/// client defaults; a structured body is dropped rather than serialized.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: Option<HttpMethod>,
    pub body: Option<Body>,
    pub headers: Option<Headers>,
    pub timeout: Option<f64>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    pub signal: Option<String>,
    pub validate_status: Option<ValidateStatus>,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }
}

/// Seconds to a transport timeout; zero, negative and non-finite mean none.
pub fn timeout_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

fn callback<T>(slot: &Option<T>) -> &'static str {
    if slot.is_some() {
        "Some(<fn>)"
    } else {
        "None"
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("signal", &self.signal)
            .field("transform_query", &callback(&self.transform_query))
            .field("transform_body", &callback(&self.transform_body))
            .field("transform_response", &callback(&self.transform_response))
            .field("validate_status", &callback(&self.validate_status))
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_options_take_every_default() {
        let config = Options::default().merge_over(&Config::default());
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.timeout, 0.0);
        assert_eq!(config.query, Query::Text(String::new()));
        assert!(config.body.is_none());
        assert_eq!(config.headers.common["Accept"], DEFAULT_ACCEPT);
        assert!((config.validate_status)(200));
    }

    #[test]
    fn present_options_win() {
        let config = Options::new("/x")
            .method(HttpMethod::Put)
            .timeout(2.5)
            .signal("grp")
            .validate_status(|s| s == 418)
            .merge_over(&Config::default());
        assert_eq!(config.url, "/x");
        assert_eq!(config.method, HttpMethod::Put);
        assert_eq!(config.timeout, 2.5);
        assert_eq!(config.signal, "grp");
        assert!((config.validate_status)(418));
        assert!(!(config.validate_status)(200));
    }

    #[test]
    fn nested_header_tiers_merge_recursively() {
        let config = Options::new("/x")
            .headers(HeaderConfig::new().common("X-Token", "t"))
            .merge_over(&Config::default());
        assert_eq!(config.headers.common["Accept"], DEFAULT_ACCEPT);
        assert_eq!(config.headers.common["X-Token"], "t");

        let overridden = Options::new("/x")
            .headers(HeaderConfig::new().common("Accept", "text/html"))
            .merge_over(&Config::default());
        assert_eq!(overridden.headers.common["Accept"], "text/html");
    }

    #[test]
    fn structured_query_merges_with_structured_default() {
        let defaults = Config {
            query: Query::Structured(json!({"lang": "en", "page": 1})),
            ..Config::default()
        };
        let config = Options::new("/x").query(json!({"page": 3})).merge_over(&defaults);
        assert_eq!(config.query, Query::Structured(json!({"page": 3, "lang": "en"})));

        let text = Options::new("/x").query("a=1").merge_over(&defaults);
        assert_eq!(text.query, Query::Text("a=1".into()));
    }

    #[test]
    fn options_load_from_json() {
        let options = Options::from_json(
            r#"{
                "baseURL": "http://api.local/v1/",
                "method": "post",
                "timeout": 1.5,
                "withCredentials": true,
                "responseType": "json",
                "query": {"a": [1, 2]},
                "headers": {"common": {"X-App": "demo"}, "post": {"Content-Type": "text/plain"}}
            }"#,
        )
        .unwrap();
        assert_eq!(options.base_url.as_deref(), Some("http://api.local/v1/"));
        assert_eq!(options.method, Some(HttpMethod::Post));
        assert_eq!(options.timeout, Some(1.5));
        assert_eq!(options.with_credentials, Some(true));
        assert_eq!(options.response_type, Some(ResponseType::Json));
        assert_eq!(options.query, Some(Query::Structured(json!({"a": [1, 2]}))));
        let headers = options.headers.unwrap();
        assert_eq!(headers.common["X-App"], "demo");
        assert_eq!(headers.methods[&HttpMethod::Post]["Content-Type"], "text/plain");
    }

    #[test]
    fn string_values_become_text() {
        assert_eq!(Query::from(json!("a=1")), Query::Text("a=1".into()));
        assert_eq!(Body::from(json!("raw")), Body::Text("raw".into()));
        assert_eq!(Body::from(json!({"k": 1})), Body::Structured(json!({"k": 1})));
    }

    #[test]
    fn only_sendable_bodies_become_payloads() {
        assert_eq!(Body::from("x").into_payload(), Some(Payload::Text("x".into())));
        assert_eq!(Body::from("").into_payload(), None);
        assert_eq!(Body::Structured(json!({"k": 1})).into_payload(), None);
        assert_eq!(
            Body::from(vec![1u8, 2]).into_payload(),
            Some(Payload::Binary(Bytes::from_static(&[1, 2])))
        );
    }

    #[test]
    fn timeouts() {
        assert_eq!(timeout_duration(0.0), None);
        assert_eq!(timeout_duration(-1.0), None);
        assert_eq!(timeout_duration(f64::NAN), None);
        assert_eq!(timeout_duration(0.5), Some(Duration::from_millis(500)));
        assert_eq!(timeout_duration(1e20), None);
    }

    #[test]
    fn transformed_parts() {
        let (value, headers) = Transformed::Value("q").into_parts();
        assert_eq!((value, headers), ("q", None));
        let patch = Headers::from([("X".to_string(), "1".to_string())]);
        let (_, headers) = Transformed::WithHeaders("q", patch.clone()).into_parts();
        assert_eq!(headers, Some(patch));
    }
}
