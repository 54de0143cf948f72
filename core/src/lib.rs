//! Configurable ajax client core.
//!
//! # Overview
//! A [`Client`] turns a URL or a set of [`Options`] into one HTTP exchange:
//! request interceptors run, the options are merged over the client's
//! defaults, headers are flattened for the method, the query or body is
//! serialized, and the final URL is built. The exchange then runs on a
//! pluggable [`Transport`] and settles into a [`Response`] or an error with
//! one of four [`Reason`] codes.
//!
//! # Design
//! - Resolution is pure: [`Client::resolve`] never touches the network.
//! - The network is behind the [`Transport`] trait. [`ReqwestTransport`]
//!   is the default implementation (feature `reqwest`).
//! - In-flight exchanges are tracked per `signal[METHOD](url)` key by a
//!   [`Registry`]. A second call with the same key aborts the first, and
//!   [`Client::cancel`] aborts a whole group.
//! - Callbacks and interceptors return `Result<_, BoxError>`; their
//!   failures surface unchanged through [`AjaxError`].

pub mod callbacks;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod headers;
pub mod http;
pub mod interceptor;
pub mod registry;
pub mod resolver;
pub mod response;
#[cfg(feature = "reqwest")]
pub mod reqwest_transport;
pub mod stringify;
pub mod transport;
pub mod url;
pub mod util;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{Body, Config, Input, Options, Query, RequestConfig, ResolvedConfig, Transformed};
pub use error::{AjaxError, Reason, RequestError};
pub use headers::{HeaderConfig, HeaderValue, Headers, ResponseHeaders};
pub use http::{HttpMethod, Payload, ProgressEvent, ResponseType};
pub use interceptor::Interceptors;
pub use registry::{Handle, Registry, RequestKey};
pub use response::{Response, ResponseData};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use stringify::{stringify, to_query_string, ArrayFormat};
pub use transport::{RawResponse, Transport, TransportEvent, TransportRequest};
pub use url::build_full_path;
pub use util::BoxError;
