//! Request body decoding and the `_method` override.
//!
//! Form bodies decode into nested JSON values: `a[]=1&a[]=2` yields a list, `a[b]=1`
//! a nested map, and a repeated plain key keeps its last value. Maps whose keys are
//! exactly `0..n` become lists.

use http::Method;
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::DispatchError;

/// Form field carrying the overriding method.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// True if the declared content type denotes JSON.
#[must_use]
pub fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("application/json"))
}

/// True if the declared content type denotes an urlencoded form.
#[must_use]
pub fn is_form(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"))
}

/// Resolve the method used for route matching.
///
/// A POST whose form fields carry `_method` is matched as the upper-cased override.
/// Any other request keeps its own method, upper-cased.
#[must_use]
pub fn effective_method(method: &str, form: &Value) -> String {
    if method.eq_ignore_ascii_case("POST") {
        if let Some(overridden) = form.get(METHOD_OVERRIDE_FIELD).and_then(Value::as_str) {
            return overridden.to_ascii_uppercase();
        }
    }
    method.to_ascii_uppercase()
}

/// Decode the body of a PUT or DELETE request.
///
/// * empty body - empty map
/// * JSON content type - parsed as JSON; invalid JSON is [`DispatchError::MalformedRequest`]
/// * anything else - decoded as an urlencoded form
///
/// `_method` is removed from the result when it is a map.
///
/// # Errors
///
/// [`DispatchError::MalformedRequest`] if a JSON body does not parse.
pub fn extract_body(
    method: &Method,
    content_type: Option<&str>,
    raw: &[u8],
) -> Result<Value, DispatchError> {
    if (*method != Method::PUT && *method != Method::DELETE) || raw.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let mut data = if is_json(content_type) {
        serde_json::from_slice::<Value>(raw)
            .map_err(|e| DispatchError::MalformedRequest(e.to_string()))?
    } else {
        parse_urlencoded(raw)
    };

    if let Value::Object(map) = &mut data {
        map.remove(METHOD_OVERRIDE_FIELD);
    }
    Ok(data)
}

/// Decode an urlencoded form into a JSON map.
#[must_use]
pub fn parse_urlencoded(input: &[u8]) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in form_urlencoded::parse(input) {
        let Some((base, segments)) = split_key(&key) else {
            continue;
        };
        let mut path = Vec::with_capacity(segments.len() + 1);
        path.push(base);
        path.extend(segments);
        assign(&mut root, &path, Value::String(value.into_owned()));
    }
    match root {
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, listify(v))).collect()),
        other => other,
    }
}

/// Split `a[b][]` into `("a", ["b", ""])`. Returns `None` for an empty base name.
///
/// Spaces and dots in the base name become underscores. A key with no closing bracket
/// is kept whole as the base name; after the first group, an unclosed group is dropped.
fn split_key(key: &str) -> Option<(String, Vec<String>)> {
    let (base, mut rest) = match key.find('[') {
        Some(idx) if idx > 0 && key[idx..].contains(']') => (&key[..idx], &key[idx..]),
        _ => (key, ""),
    };
    if base.is_empty() {
        return None;
    }
    let base = base.replace([' ', '.'], "_");

    let mut segments = Vec::new();
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    Some((base, segments))
}

fn assign(slot: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *slot = value;
        return;
    };
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let key = if head.is_empty() {
            next_index(map).to_string()
        } else {
            head.clone()
        };
        let child = map.entry(key).or_insert(Value::Null);
        assign(child, rest, value);
    }
}

fn next_index(map: &Map<String, Value>) -> u64 {
    map.keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |n| n + 1)
}

fn listify(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let len = map.len();
    let mut indexed: Vec<(usize, Value)> = Vec::with_capacity(len);
    let mut sequential = true;
    for (k, v) in &map {
        match k.parse::<usize>() {
            Ok(idx) if idx < len && idx.to_string() == *k => indexed.push((idx, v.clone())),
            _ => {
                sequential = false;
                break;
            }
        }
    }
    if sequential && len > 0 {
        indexed.sort_by_key(|(idx, _)| *idx);
        Value::Array(indexed.into_iter().map(|(_, v)| listify(v)).collect())
    } else {
        Value::Object(map.into_iter().map(|(k, v)| (k, listify(v))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body_is_empty_map() {
        let body = extract_body(&Method::PUT, Some("application/json"), b"").unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = extract_body(&Method::DELETE, Some("application/json; charset=utf-8"), b"{oops")
            .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedRequest(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_json_body_drops_method_field() {
        let body = extract_body(
            &Method::PUT,
            Some("application/json"),
            br#"{"name":"box","_method":"PUT","qty":2}"#,
        )
        .unwrap();
        assert_eq!(body, json!({"name": "box", "qty": 2}));
    }

    #[test]
    fn test_form_body_drops_method_field() {
        let body = extract_body(&Method::PUT, None, b"_method=PUT&name=box+lid&note=a%26b").unwrap();
        assert_eq!(body, json!({"name": "box lid", "note": "a&b"}));
    }

    #[test]
    fn test_get_and_post_bodies_are_not_extracted() {
        let body = extract_body(&Method::POST, Some("application/json"), b"{oops").unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn test_nested_form_keys() {
        let form = parse_urlencoded(b"tags[]=a&tags[]=b&user[name]=ann&user[roles][]=admin&x=1&x=2");
        assert_eq!(
            form,
            json!({
                "tags": ["a", "b"],
                "user": {"name": "ann", "roles": ["admin"]},
                "x": "2"
            })
        );
    }

    #[test]
    fn test_mixed_keys_stay_a_map() {
        let form = parse_urlencoded(b"a[]=1&a[k]=2");
        assert_eq!(form, json!({"a": {"0": "1", "k": "2"}}));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let form = parse_urlencoded(b"a[b=1&first.name=z");
        assert_eq!(form, json!({"a[b": "1", "first_name": "z"}));
    }

    #[test]
    fn test_effective_method() {
        let form = parse_urlencoded(b"_method=put");
        assert_eq!(effective_method("POST", &form), "PUT");
        assert_eq!(effective_method("post", &form), "PUT");
        assert_eq!(effective_method("GET", &form), "GET");
        assert_eq!(effective_method("POST", &json!({})), "POST");
    }
}
