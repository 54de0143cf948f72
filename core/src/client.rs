//! The ajax client: defaults, interceptors, registry and transport in one
//! instance.
//!
//! # Design
//! `Client` owns everything that would otherwise be process-wide state. The
//! defaults and interceptor chains sit behind `RwLock`s and are snapshotted
//! at the start of every [`Client::ajax`] call, so changing them affects
//! later calls only.
//!
//! Resolution ([`Client::resolve`]) is pure and never touches the network.
//! Execution goes through the [`Transport`] the client was built with, which
//! keeps the pipeline testable with a scripted transport.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{timeout_duration, Body, Config, Input, Options, RequestConfig, ResolvedConfig};
use crate::error::{AjaxError, RequestError};
use crate::executor::{self, Dispatch};
use crate::interceptor::Interceptors;
use crate::registry::Registry;
use crate::resolver;
use crate::response::Response;
use crate::transport::{Transport, TransportRequest};

pub struct Client {
    transport: Arc<dyn Transport>,
    registry: Registry,
    defaults: RwLock<Config>,
    interceptors: RwLock<Interceptors>,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_defaults(transport, Config::default())
    }

    pub fn with_defaults(transport: impl Transport + 'static, defaults: Config) -> Self {
        Self {
            transport: Arc::new(transport),
            registry: Registry::new(),
            defaults: RwLock::new(defaults),
            interceptors: RwLock::new(Interceptors::new()),
        }
    }

    /// A client over [`ReqwestTransport`](crate::ReqwestTransport) with the
    /// system defaults.
    #[cfg(feature = "reqwest")]
    pub fn reqwest() -> Result<Self, reqwest::Error> {
        Ok(Self::new(crate::reqwest_transport::ReqwestTransport::new()?))
    }

    /// Snapshot of the current defaults.
    pub fn defaults(&self) -> Config {
        self.defaults.read().clone()
    }

    pub fn set_defaults(&self, defaults: Config) {
        *self.defaults.write() = defaults;
    }

    pub fn update_defaults(&self, f: impl FnOnce(&mut Config)) {
        f(&mut *self.defaults.write());
    }

    /// Merge `options` over the current defaults and keep the result.
    pub fn configure(&self, options: Options) {
        let mut defaults = self.defaults.write();
        *defaults = options.merge_over(&defaults);
    }

    /// Snapshot of the current interceptor chains.
    pub fn interceptors(&self) -> Interceptors {
        self.interceptors.read().clone()
    }

    pub fn update_interceptors(&self, f: impl FnOnce(&mut Interceptors)) {
        f(&mut *self.interceptors.write());
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run request interceptors and resolution without sending anything.
    pub fn resolve(&self, input: impl Into<Input>) -> Result<ResolvedConfig, AjaxError> {
        resolver::resolve(input.into(), &self.defaults(), &self.interceptors())
    }

    /// The full pipeline: request interceptors, merge, header/query/body
    /// resolution, execution, response transform, then response or error
    /// interceptors.
    pub async fn ajax(&self, input: impl Into<Input>) -> Result<Response, AjaxError> {
        let input = input.into();
        let defaults = self.defaults();
        let interceptors = self.interceptors();
        let resolved = resolver::resolve(input, &defaults, &interceptors)?;

        let outcome = executor::execute(&*self.transport, &self.registry, dispatch(&resolved)).await;
        match outcome {
            Ok(mut response) => {
                let data = std::mem::take(&mut response.data);
                response.data = (resolved.transform_response)(data).map_err(AjaxError::Transform)?;
                response.config = Some(Box::new(resolved));
                interceptors.run_response(response)
            }
            Err(error) => {
                let mut error = interceptors.run_error(error);
                error.attach_config(resolved);
                Err(error.into())
            }
        }
    }

    /// Execute a minimally resolved request. No interceptors, no transforms:
    /// the body is sent only if it is already text or binary.
    pub async fn request(&self, config: RequestConfig) -> Result<Response, RequestError> {
        let dispatch = self.dispatch_request(config);
        executor::execute(&*self.transport, &self.registry, dispatch).await
    }

    /// Abort in-flight calls in `signal`'s group, or all of them.
    pub fn cancel(&self, signal: Option<&str>) -> usize {
        self.registry.cancel(signal)
    }

    fn dispatch_request(&self, config: RequestConfig) -> Dispatch {
        let defaults = self.defaults.read();
        let timeout = config.timeout.unwrap_or(defaults.timeout);
        Dispatch {
            signal: config.signal.unwrap_or_else(|| defaults.signal.clone()),
            timeout_secs: timeout,
            validate_status: config
                .validate_status
                .unwrap_or_else(|| defaults.validate_status.clone()),
            request: TransportRequest {
                method: config.method.unwrap_or(defaults.method),
                url: config.url,
                headers: config.headers.unwrap_or_else(|| defaults.headers.root.clone()),
                body: config
                    .body
                    .or_else(|| defaults.body.clone())
                    .and_then(Body::into_payload),
                timeout: timeout_duration(timeout),
                response_type: config.response_type.unwrap_or(defaults.response_type),
                with_credentials: config.with_credentials.unwrap_or(defaults.with_credentials),
                on_upload_progress: config
                    .on_upload_progress
                    .or_else(|| defaults.on_upload_progress.clone()),
                on_download_progress: config
                    .on_download_progress
                    .or_else(|| defaults.on_download_progress.clone()),
            },
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("registry", &self.registry)
            .field("defaults", &*self.defaults.read())
            .field("interceptors", &*self.interceptors.read())
            .finish_non_exhaustive()
    }
}

fn dispatch(resolved: &ResolvedConfig) -> Dispatch {
    Dispatch {
        signal: resolved.signal.clone(),
        timeout_secs: resolved.timeout,
        validate_status: resolved.validate_status.clone(),
        request: TransportRequest {
            method: resolved.method,
            url: resolved.url.clone(),
            headers: resolved.headers.clone(),
            body: resolved.body.clone(),
            timeout: timeout_duration(resolved.timeout),
            response_type: resolved.response_type,
            with_credentials: resolved.with_credentials,
            on_upload_progress: resolved.on_upload_progress.clone(),
            on_download_progress: resolved.on_download_progress.clone(),
        },
    }
}
