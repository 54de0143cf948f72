//! Default transform and validation callbacks installed in `Config::default()`.

use serde_json::Value;

use crate::config::{Body, Query, Transformed};
use crate::headers::{set_content_type, ContentTypeMode, Headers, CONTENT_TYPE, JSON_UTF8};
use crate::http::Payload;
use crate::response::ResponseData;
use crate::stringify::{stringify, ArrayFormat};
use crate::util::BoxError;

/// Structured queries are serialized with bracketed arrays; text passes through.
pub fn transform_query(query: &Query, _headers: &mut Headers) -> Result<Transformed<String>, BoxError> {
    let text = match query {
        Query::Text(text) => text.clone(),
        Query::Structured(Value::Null) => String::new(),
        Query::Structured(Value::String(text)) => text.clone(),
        Query::Structured(value) => stringify(value, ArrayFormat::Brackets),
    };
    Ok(Transformed::Value(text))
}

/// Objects and arrays become JSON, or a form string when the content type
/// already says `application/x-www-form-urlencoded`. Binary bodies go out
/// untouched and without a `Content-Type`. An empty body clears it too.
pub fn transform_body(
    body: Option<Body>,
    headers: &mut Headers,
) -> Result<Transformed<Option<Payload>>, BoxError> {
    let payload = match body {
        Some(Body::Binary(bytes)) => {
            clear_content_type(headers);
            Some(Payload::Binary(bytes))
        }
        Some(Body::Text(text)) if !text.is_empty() => Some(Payload::Text(text)),
        Some(Body::Structured(value)) if is_truthy(&value) => match value {
            Value::Object(_) | Value::Array(_) => {
                let form = headers
                    .get(CONTENT_TYPE)
                    .is_some_and(|v| v.contains("application/x-www-form-urlencoded"));
                if form {
                    Some(Payload::Text(stringify(&value, ArrayFormat::Brackets)))
                } else {
                    set_content_type(headers, JSON_UTF8, ContentTypeMode::Reserve);
                    Some(Payload::Text(serde_json::to_string(&value)?))
                }
            }
            Value::String(text) => Some(Payload::Text(text)),
            scalar => Some(Payload::Text(scalar.to_string())),
        },
        _ => {
            clear_content_type(headers);
            None
        }
    };
    Ok(Transformed::Value(payload))
}

/// Text that parses as JSON becomes [`ResponseData::Json`].
pub fn transform_response(data: ResponseData) -> Result<ResponseData, BoxError> {
    Ok(match data {
        ResponseData::Text(text) => match serde_json::from_str(&text) {
            Ok(value) => ResponseData::Json(value),
            Err(_) => ResponseData::Text(text),
        },
        other => other,
    })
}

/// 2xx passes.
pub fn validate_status(status: u16) -> bool {
    (200..300).contains(&status)
}

fn clear_content_type(headers: &mut Headers) {
    set_content_type(headers, "", ContentTypeMode::Override);
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
