//! Request header composition and response header parsing.
//!
//! # Design
//! Request headers are configured in three tiers: `common` (lowest
//! priority), one map per method, and the root map (highest priority).
//! [`resolve_headers`] flattens them into a single [`Headers`] map whose
//! names are canonicalized, so `content-type`, `CONTENT-TYPE` and
//! `Content-Type` all land on one key and the higher tier wins.
//!
//! Only non-empty string values survive. That is enforced at the type level
//! for hand-built configs and at deserialization time for loosely shaped
//! JSON, where nested objects in the wrong place are silently ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::http::HttpMethod;
use crate::util::Merge;

/// Flat request headers, keyed by canonical name.
pub type Headers = BTreeMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded;charset=utf-8";
pub const JSON_UTF8: &str = "application/json;charset=utf-8";
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Three-tier header configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderConfig {
    pub common: Headers,
    pub methods: BTreeMap<HttpMethod, Headers>,
    pub root: Headers,
}

impl HeaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn common(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.common.insert(name.into(), value.into());
        self
    }

    pub fn for_method(
        mut self,
        method: HttpMethod,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.methods.entry(method).or_default().insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.root.insert(name.into(), value.into());
        self
    }

    /// Build from the loose `{"common": {..}, "<method>": {..}, "Name": "value"}`
    /// shape. Anything that is not a string in the right place is dropped.
    pub fn from_loose(map: serde_json::Map<String, Value>) -> Self {
        let mut config = HeaderConfig::default();
        for (key, value) in map {
            if key == "common" {
                config.common = string_entries(&value);
            } else if let Some(method) = HttpMethod::ALL.into_iter().find(|m| m.as_str() == key) {
                config.methods.insert(method, string_entries(&value));
            } else if let Value::String(s) = value {
                if !s.is_empty() {
                    config.root.insert(key, s);
                }
            }
        }
        config
    }
}

fn string_entries(value: &Value) -> Headers {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) if !s.is_empty() => Some((k.clone(), s.clone())),
                _ => None,
            })
            .collect(),
        _ => Headers::new(),
    }
}

impl<'de> Deserialize<'de> for HeaderConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        Ok(HeaderConfig::from_loose(map))
    }
}

impl Merge for HeaderConfig {
    fn merge(mut self, defaults: &Self) -> Self {
        self.common = self.common.merge(&defaults.common);
        for (method, tier) in &defaults.methods {
            let merged = match self.methods.remove(method) {
                Some(own) => own.merge(tier),
                None => tier.clone(),
            };
            self.methods.insert(*method, merged);
        }
        self.root = self.root.merge(&defaults.root);
        self
    }
}

/// Flatten `config` for `method`: common, then the method tier, then root,
/// each later tier overriding the earlier ones after name canonicalization.
pub fn resolve_headers(config: &HeaderConfig, method: HttpMethod) -> Headers {
    let mut target = Headers::new();
    absorb(&mut target, &config.common);
    if let Some(tier) = config.methods.get(&method) {
        absorb(&mut target, tier);
    }
    absorb(&mut target, &config.root);
    target
}

fn absorb(target: &mut Headers, source: &Headers) {
    for (name, value) in source {
        if !value.is_empty() {
            target.insert(canonical_name(name), value.clone());
        }
    }
}

/// Canonicalize every name in `headers`. Idempotent.
pub fn normalize_headers(headers: Headers) -> Headers {
    headers
        .into_iter()
        .map(|(name, value)| (canonical_name(&name), value))
        .collect()
}

/// `Content-Type` in any casing becomes `Content-Type`; every other name
/// gets the first letter of each word upper-cased (`x-request-id` ->
/// `X-Request-Id`). Letters after the first are left untouched.
pub fn canonical_name(name: &str) -> String {
    if name.eq_ignore_ascii_case(CONTENT_TYPE) {
        return CONTENT_TYPE.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        let word = c.is_ascii_alphanumeric() || c == '_';
        out.push(if word && !in_word { c.to_ascii_uppercase() } else { c });
        in_word = word;
    }
    out
}

/// How [`set_content_type`] treats an existing `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTypeMode {
    /// Only set when no `Content-Type` is present.
    #[default]
    Reserve,
    /// Always replace; an empty value removes the header.
    Override,
}

pub fn set_content_type(headers: &mut Headers, value: &str, mode: ContentTypeMode) {
    let present = headers.get(CONTENT_TYPE).is_some_and(|v| !v.is_empty());
    if present {
        if mode == ContentTypeMode::Override {
            if value.is_empty() {
                headers.remove(CONTENT_TYPE);
            } else {
                headers.insert(CONTENT_TYPE.to_string(), value.to_string());
            }
        }
    } else if !value.is_empty() {
        headers.insert(CONTENT_TYPE.to_string(), value.to_string());
    }
}

/// A response header value; repeated names accumulate into a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(first) => {
                *self = HeaderValue::Multiple(vec![std::mem::take(first), value]);
            }
            HeaderValue::Multiple(values) => values.push(value),
        }
    }
}

/// Response headers keyed exactly as the transport reported them.
pub type ResponseHeaders = BTreeMap<String, HeaderValue>;

/// Parse a raw `name: value` header blob. Lines that do not look like a
/// header are skipped.
pub fn parse_response_headers(raw: &str) -> ResponseHeaders {
    let mut parsed = ResponseHeaders::new();
    for (name, value) in raw.split('\n').filter_map(parse_line) {
        match parsed.get_mut(name) {
            Some(existing) => existing.push(value.to_string()),
            None => {
                parsed.insert(name.to_string(), HeaderValue::Single(value.to_string()));
            }
        }
    }
    parsed
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let name = name.split_whitespace().last()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((name, value))
}

/// Case-insensitive lookup in parsed response headers.
pub fn find_header<'a>(headers: &'a ResponseHeaders, name: &str) -> Option<&'a HeaderValue> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}
