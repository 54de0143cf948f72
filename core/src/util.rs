//! Small building blocks shared by the resolver and the interceptor chains.
//!
//! # Design
//! Runtime shape probing (is-string, is-object, ...) has no place in a typed
//! client: the shapes are enums and are matched directly. What remains here
//! are the three helpers that are genuinely generic: the absolute-URL
//! predicate, the "first non-absent wins" deep merge, and the hook chain
//! that threads a value through zero or more fallible transforms.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// Boxed error returned by user-supplied callbacks and interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fallible `T -> T` transform, as registered in an interceptor chain.
pub type Hook<T> = Arc<dyn Fn(T) -> Result<T, BoxError> + Send + Sync>;

/// Thread `value` through `hooks` in order, each receiving the previous
/// output. The first error stops the chain and is returned unchanged.
pub fn pipe<T>(value: T, hooks: &[Hook<T>]) -> Result<T, BoxError> {
    hooks.iter().try_fold(value, |value, hook| hook(value))
}

/// `true` for `scheme://...` and protocol-relative `//...` URLs.
pub fn is_absolute_url(url: &str) -> bool {
    let rest = match url.find(':') {
        Some(colon) if is_scheme(&url[..colon]) => &url[colon + 1..],
        _ => url,
    };
    rest.starts_with("//")
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        _ => false,
    }
}

/// Recursive "first non-absent wins" merge.
///
/// `self` is the caller's value and always wins where present; `defaults`
/// only fills the gaps. Nested containers of the same kind are merged
/// recursively instead of being replaced wholesale.
pub trait Merge {
    fn merge(self, defaults: &Self) -> Self;
}

/// Merge an optional caller value over a default, cloning the default only
/// when the caller left the slot absent.
pub fn merge_option<T: Merge + Clone>(value: Option<T>, defaults: &T) -> T {
    match value {
        Some(value) => value.merge(defaults),
        None => defaults.clone(),
    }
}

impl Merge for Value {
    fn merge(self, defaults: &Self) -> Self {
        match (self, defaults) {
            (Value::Object(mut map), Value::Object(defaults)) => {
                for (key, default) in defaults {
                    match map.get_mut(key) {
                        Some(slot) => {
                            let current = std::mem::take(slot);
                            *slot = current.merge(default);
                        }
                        None => {
                            map.insert(key.clone(), default.clone());
                        }
                    }
                }
                Value::Object(map)
            }
            (Value::Array(mut items), Value::Array(defaults)) => {
                for (index, default) in defaults.iter().enumerate() {
                    match items.get_mut(index) {
                        Some(slot) => {
                            let current = std::mem::take(slot);
                            *slot = current.merge(default);
                        }
                        None => items.push(default.clone()),
                    }
                }
                Value::Array(items)
            }
            (value, _) => value,
        }
    }
}

impl Merge for BTreeMap<String, String> {
    fn merge(mut self, defaults: &Self) -> Self {
        for (key, value) in defaults {
            self.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }
}
