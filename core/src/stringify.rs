//! Default URL-encoded serializer for structured queries and form bodies.
//!
//! # Design
//! A deliberately small subset of the usual "qs" behaviour: a depth-first
//! walk over a `serde_json::Value` that emits `key=value` pairs in insertion
//! order. Nested object fields always become `parent[child]`; array elements
//! follow the selected [`ArrayFormat`]. Callers who need more (custom
//! delimiters, comma arrays, charset sentinels) plug their own serializer in
//! through the query/body transform callbacks.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Everything `encodeURIComponent` escapes.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How array elements are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `a[]=1&a[]=2`
    #[default]
    Brackets,
    /// `a=1&a=2`
    None,
    /// `a[0]=1&a[1]=2`
    Indices,
}

/// Serialize `value` into an `&`-joined, URL-encoded pair list.
///
/// `null` leaves are skipped, as are scalars at the top level (they have no
/// key). Spaces become `+` and brackets stay literal.
pub fn stringify(value: &Value, format: ArrayFormat) -> String {
    let mut pairs = Vec::new();
    walk(value, "", format, &mut pairs);
    pairs.join("&")
}

/// Serialize any `Serialize` type through [`stringify`].
pub fn to_query_string<T: Serialize + ?Sized>(
    value: &T,
    format: ArrayFormat,
) -> Result<String, serde_json::Error> {
    Ok(stringify(&serde_json::to_value(value)?, format))
}

fn walk(value: &Value, prefix: &str, format: ArrayFormat, pairs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                visit(child, format_key(key, prefix, false, format), format, pairs);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                visit(child, format_key(&index.to_string(), prefix, true, format), format, pairs);
            }
        }
        _ => {}
    }
}

fn visit(child: &Value, key: String, format: ArrayFormat, pairs: &mut Vec<String>) {
    match child {
        Value::Null => {}
        Value::Object(_) | Value::Array(_) => walk(child, &key, format, pairs),
        Value::String(s) => pairs.push(format!("{}={}", encode(&key), encode(s))),
        Value::Number(n) => pairs.push(format!("{}={}", encode(&key), encode(&number(n)))),
        leaf => pairs.push(format!("{}={}", encode(&key), encode(&leaf.to_string()))),
    }
}

/// Integral floats print without a trailing `.0`.
fn number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

fn format_key(key: &str, prefix: &str, from_array: bool, format: ArrayFormat) -> String {
    if prefix.is_empty() {
        return key.to_string();
    }
    if !from_array {
        return format!("{prefix}[{key}]");
    }
    match format {
        ArrayFormat::Brackets => format!("{prefix}[]"),
        ArrayFormat::None => prefix.to_string(),
        ArrayFormat::Indices => format!("{prefix}[{key}]"),
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT)
        .to_string()
        .replace("%20", "+")
        .replace("%5B", "[")
        .replace("%5D", "]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Value {
        json!({
            "a": ["12", {"b": true}],
            "c": {"d": "2020-01-02T03:04:05.000Z", "e": 34},
            "f": null
        })
    }

    #[test]
    fn flat_object() {
        assert_eq!(stringify(&json!({"a": 1, "b": 2}), ArrayFormat::Brackets), "a=1&b=2");
    }

    #[test]
    fn top_level_array_uses_bare_indices() {
        assert_eq!(stringify(&json!([1, 2]), ArrayFormat::Brackets), "0=1&1=2");
    }

    #[test]
    fn array_formats() {
        let value = json!({"a": [1, 2], "b": [3]});
        assert_eq!(stringify(&value, ArrayFormat::Brackets), "a[]=1&a[]=2&b[]=3");
        assert_eq!(stringify(&value, ArrayFormat::None), "a=1&a=2&b=3");
        assert_eq!(stringify(&value, ArrayFormat::Indices), "a[0]=1&a[1]=2&b[0]=3");
    }

    #[test]
    fn nested_brackets() {
        assert_eq!(
            stringify(&nested(), ArrayFormat::Brackets),
            "a[]=12&a[][b]=true&c[d]=2020-01-02T03%3A04%3A05.000Z&c[e]=34"
        );
    }

    #[test]
    fn nested_none() {
        assert_eq!(
            stringify(&nested(), ArrayFormat::None),
            "a=12&a[b]=true&c[d]=2020-01-02T03%3A04%3A05.000Z&c[e]=34"
        );
    }

    #[test]
    fn nested_indices() {
        assert_eq!(
            stringify(&nested(), ArrayFormat::Indices),
            "a[0]=12&a[1][b]=true&c[d]=2020-01-02T03%3A04%3A05.000Z&c[e]=34"
        );
    }

    #[test]
    fn encoding_fixups() {
        let value = json!({"full name": "Jacky Cheung", "mail": "a-aa@bb.cc", "cn": "小明"});
        assert_eq!(
            stringify(&value, ArrayFormat::Brackets),
            "full+name=Jacky+Cheung&mail=a-aa%40bb.cc&cn=%E5%B0%8F%E6%98%8E"
        );
    }

    #[test]
    fn literal_brackets_in_keys_survive() {
        assert_eq!(stringify(&json!({"k[x]": "v"}), ArrayFormat::Brackets), "k[x]=v");
    }

    #[test]
    fn empty_and_falsy_values_are_kept() {
        assert_eq!(
            stringify(&json!({"s": "", "b": false, "n": 0}), ArrayFormat::Brackets),
            "s=&b=false&n=0"
        );
    }

    #[test]
    fn integral_floats_drop_the_fraction() {
        assert_eq!(
            stringify(&json!({"a": 1.0, "b": [2.5, 3.0], "c": -4}), ArrayFormat::Brackets),
            "a=1&b[]=2.5&b[]=3&c=-4"
        );
    }

    #[test]
    fn scalars_have_no_pairs() {
        assert_eq!(stringify(&json!("text"), ArrayFormat::Brackets), "");
        assert_eq!(stringify(&Value::Null, ArrayFormat::Brackets), "");
    }

    #[test]
    fn serializable_structs() {
        #[derive(Serialize)]
        struct Filter {
            tags: Vec<&'static str>,
            page: u32,
            cursor: Option<String>,
        }
        let filter = Filter { tags: vec!["x", "y"], page: 2, cursor: None };
        assert_eq!(
            to_query_string(&filter, ArrayFormat::Brackets).unwrap(),
            "tags[]=x&tags[]=y&page=2"
        );
    }

    #[test]
    fn non_finite_floats_are_skipped() {
        let mut map = serde_json::Map::new();
        map.insert("nan".into(), serde_json::to_value(f64::NAN).unwrap());
        map.insert("ok".into(), json!(1.5));
        assert_eq!(stringify(&Value::Object(map), ArrayFormat::Brackets), "ok=1.5");
    }
}
