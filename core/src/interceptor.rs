//! Request, response and error interceptor chains.
//!
//! Each chain runs in registration order. Request and response interceptors
//! may fail; the first failure stops the chain and surfaces unchanged as
//! [`AjaxError::Interceptor`]. Error interceptors are infallible and return
//! the (possibly replaced) error for the next one.

use std::fmt;
use std::sync::Arc;

use crate::config::Options;
use crate::error::{AjaxError, RequestError};
use crate::response::Response;
use crate::util::{pipe, BoxError, Hook};

pub type RequestInterceptor = Hook<Options>;
pub type ResponseInterceptor = Hook<Response>;
pub type ErrorInterceptor = Arc<dyn Fn(RequestError) -> RequestError + Send + Sync>;

#[derive(Clone, Default)]
pub struct Interceptors {
    request: Vec<RequestInterceptor>,
    response: Vec<ResponseInterceptor>,
    error: Vec<ErrorInterceptor>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Options) -> Result<Options, BoxError> + Send + Sync + 'static,
    {
        self.request.push(Arc::new(f));
        self
    }

    pub fn on_response<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Response) -> Result<Response, BoxError> + Send + Sync + 'static,
    {
        self.response.push(Arc::new(f));
        self
    }

    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(RequestError) -> RequestError + Send + Sync + 'static,
    {
        self.error.push(Arc::new(f));
        self
    }

    pub fn clear(&mut self) {
        self.request.clear();
        self.response.clear();
        self.error.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty() && self.error.is_empty()
    }

    pub(crate) fn run_request(&self, options: Options) -> Result<Options, AjaxError> {
        pipe(options, &self.request).map_err(AjaxError::Interceptor)
    }

    pub(crate) fn run_response(&self, response: Response) -> Result<Response, AjaxError> {
        pipe(response, &self.response).map_err(AjaxError::Interceptor)
    }

    pub(crate) fn run_error(&self, error: RequestError) -> RequestError {
        self.error.iter().fold(error, |error, f| f(error))
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .field("error", &self.error.len())
            .finish()
    }
}
