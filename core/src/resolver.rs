//! Turns caller input into a [`ResolvedConfig`].
//!
//! # Design
//! Resolution is a fixed pipeline:
//!
//! 1. Normalize the input into [`Options`] (a bare URL becomes `{url}`).
//! 2. Run the request interceptors over the options.
//! 3. Merge the options over the defaults.
//! 4. Flatten the header tiers for the chosen method.
//! 5. Query methods drop their body (DELETE excepted) and run the query
//!    transform; body methods drop their query (DELETE excepted) and run the
//!    body transform. A transform that returns headers replaces them.
//! 6. Fold base URL, path params and query into the final URL.
//!
//! Steps 3 to 6 are also exposed alone as [`prepare`] for callers that
//! already hold a merged [`Config`].

use log::debug;

use crate::config::{Config, Input, Options, ResolvedConfig};
use crate::error::AjaxError;
use crate::headers::{resolve_headers, set_content_type, ContentTypeMode};
use crate::http::HttpMethod;
use crate::interceptor::Interceptors;
use crate::url::build_full_path;

pub fn resolve(
    input: Input,
    defaults: &Config,
    interceptors: &Interceptors,
) -> Result<ResolvedConfig, AjaxError> {
    let options = match input {
        Input::Url(url) => Options::new(url),
        Input::Options(options) => options,
    };
    let options = interceptors.run_request(options)?;
    prepare(options.merge_over(defaults))
}

pub fn prepare(config: Config) -> Result<ResolvedConfig, AjaxError> {
    let Config {
        url,
        method,
        base_url,
        params,
        query,
        mut body,
        headers,
        timeout,
        response_type,
        with_credentials,
        signal,
        transform_query,
        transform_body,
        transform_response,
        validate_status,
        on_upload_progress,
        on_download_progress,
    } = config;

    let mut headers = resolve_headers(&headers, method);
    let mut payload = None;
    let mut query_text = String::new();

    if method.carries_query() {
        if method != HttpMethod::Delete {
            body = None;
            set_content_type(&mut headers, "", ContentTypeMode::Override);
        }
        let (text, patch) = transform_query(&query, &mut headers)
            .map_err(AjaxError::Transform)?
            .into_parts();
        query_text = text;
        if let Some(patch) = patch {
            headers = patch;
        }
    }
    if method.carries_body() {
        if method != HttpMethod::Delete {
            query_text.clear();
        }
        let (sendable, patch) = transform_body(body, &mut headers)
            .map_err(AjaxError::Transform)?
            .into_parts();
        payload = sendable;
        if let Some(patch) = patch {
            headers = patch;
        }
    }

    let full_url = build_full_path(&url, &base_url, &params, &query_text);
    debug!("resolved {method} {full_url}");

    Ok(ResolvedConfig {
        url: full_url,
        method,
        base_url,
        params,
        query: query_text,
        body: payload,
        headers,
        timeout,
        response_type,
        with_credentials,
        signal,
        transform_response,
        validate_status,
        on_upload_progress,
        on_download_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Body, Transformed};
    use crate::headers::{HeaderConfig, Headers, CONTENT_TYPE, DEFAULT_ACCEPT, FORM_URLENCODED, JSON_UTF8};
    use crate::http::Payload;
    use serde_json::json;

    fn run(options: Options) -> ResolvedConfig {
        resolve(options.into(), &Config::default(), &Interceptors::new()).unwrap()
    }

    #[test]
    fn bare_url_uses_defaults() {
        let resolved =
            resolve("http://h/get".into(), &Config::default(), &Interceptors::new()).unwrap();
        assert_eq!(resolved.url, "http://h/get");
        assert_eq!(resolved.method, HttpMethod::Get);
        assert_eq!(resolved.headers["Accept"], DEFAULT_ACCEPT);
        assert!(resolved.body.is_none());
    }

    #[test]
    fn get_serializes_query_and_drops_body() {
        let resolved = run(Options::new("http://h/get/")
            .params("/3/4/")
            .query(json!({"id": 5}))
            .body(json!({"ignored": true}))
            .headers(HeaderConfig::new().header(CONTENT_TYPE, JSON_UTF8)));
        assert_eq!(resolved.url, "http://h/get/3/4?id=5");
        assert_eq!(resolved.query, "id=5");
        assert!(resolved.body.is_none());
        assert!(!resolved.headers.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn post_serializes_body_and_drops_query() {
        let resolved = run(Options::new("http://h/post")
            .method(HttpMethod::Post)
            .query("a=1")
            .body(json!({"a": 1})));
        assert_eq!(resolved.url, "http://h/post");
        assert_eq!(resolved.body, Some(Payload::Text(r#"{"a":1}"#.into())));
        assert_eq!(resolved.headers[CONTENT_TYPE], JSON_UTF8);
    }

    #[test]
    fn post_form_body() {
        let resolved = run(Options::new("/f")
            .method(HttpMethod::Post)
            .headers(HeaderConfig::new().for_method(HttpMethod::Post, "content-type", FORM_URLENCODED))
            .body(json!({"a": [1, 2]})));
        assert_eq!(resolved.body, Some(Payload::Text("a[]=1&a[]=2".into())));
        assert_eq!(resolved.headers[CONTENT_TYPE], FORM_URLENCODED);
    }

    #[test]
    fn delete_keeps_query_and_body() {
        let resolved = run(Options::new("http://h/d")
            .method(HttpMethod::Delete)
            .query(json!({"id": 1}))
            .body(json!({"force": true})));
        assert_eq!(resolved.url, "http://h/d?id=1");
        assert_eq!(resolved.body, Some(Payload::Text(r#"{"force":true}"#.into())));
    }

    #[test]
    fn transform_headers_replace_current_set() {
        let resolved = run(Options::new("/q").transform_query(|_, _| {
            Ok(Transformed::WithHeaders(
                "x=1".to_string(),
                Headers::from([("X-Only".to_string(), "1".to_string())]),
            ))
        }));
        assert_eq!(resolved.url, "/q?x=1");
        assert_eq!(resolved.headers.len(), 1);
        assert_eq!(resolved.headers["X-Only"], "1");
    }

    #[test]
    fn transform_failure_surfaces() {
        let error = resolve(
            Options::new("/p")
                .method(HttpMethod::Post)
                .body(Body::from("x"))
                .transform_body(|_, _| Err("bad body".into()))
                .into(),
            &Config::default(),
            &Interceptors::new(),
        )
        .unwrap_err();
        assert!(matches!(&error, AjaxError::Transform(e) if e.to_string() == "bad body"));
    }

    #[test]
    fn interceptors_see_normalized_options() {
        let mut interceptors = Interceptors::new();
        interceptors.on_request(|o| Ok(o.base_url("http://api/")));
        let resolved = resolve("users".into(), &Config::default(), &interceptors).unwrap();
        assert_eq!(resolved.url, "http://api/users");
    }

    #[test]
    fn base_url_from_defaults() {
        let defaults = Options::default()
            .base_url("http://h/v1/")
            .timeout(3.0)
            .merge_over(&Config::default());
        let resolved = resolve("/items".into(), &defaults, &Interceptors::new()).unwrap();
        assert_eq!(resolved.url, "http://h/v1/items");
        assert_eq!(resolved.timeout, 3.0);
    }
}
