use std::collections::BTreeSet;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// Parse a query string into key-value pairs.
pub fn parse_query_string(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(q) => form_urlencoded::parse(q.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// Group repeated keys, keeping first-seen order.
fn group(pairs: &[(String, String)]) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        match grouped.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.clone()),
            None => grouped.push((key.clone(), vec![value.clone()])),
        }
    }
    grouped
}

/// Convert multi-valued pairs into a JSON object.
///
/// A key with a single value is JSON-decoded when possible and kept as a
/// string otherwise; a repeated key becomes an array of strings.
pub fn parse_multi_dict(pairs: &[(String, String)]) -> Map<String, Value> {
    group(pairs)
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                let raw = values.remove(0);
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect()
}

/// Schema-guided variant of [`parse_multi_dict`].
///
/// Array properties always become lists, even with a single value, and
/// string-only properties are never JSON-decoded. Keys the schema does not
/// describe fall back to the plain multi-dict rules.
pub fn coerce_params(pairs: &[(String, String)], schema: &Value) -> Map<String, Value> {
    group(pairs)
        .into_iter()
        .map(|(key, values)| {
            let property = property_schema(schema, &key);
            let value = match property {
                Some(prop) => coerce_property(schema, prop, values),
                None => parse_multi_dict(
                    &values.into_iter().map(|v| (key.clone(), v)).collect::<Vec<_>>(),
                )
                .remove(&key)
                .unwrap_or(Value::Null),
            };
            (key, value)
        })
        .collect()
}

fn property_schema<'a>(schema: &'a Value, key: &str) -> Option<&'a Value> {
    schema.get("properties")?.get(key)
}

fn coerce_property(root: &Value, prop: &Value, mut values: Vec<String>) -> Value {
    let kinds = schema_kinds(root, prop);
    if kinds.contains("array") {
        let items = array_items(root, prop);
        let item_kinds = items.map(|items| schema_kinds(root, items)).unwrap_or_default();
        return Value::Array(
            values
                .into_iter()
                .map(|raw| coerce_scalar(&item_kinds, raw))
                .collect(),
        );
    }
    if values.len() == 1 {
        coerce_scalar(&kinds, values.remove(0))
    } else {
        Value::Array(values.into_iter().map(Value::String).collect())
    }
}

fn coerce_scalar(kinds: &BTreeSet<String>, raw: String) -> Value {
    let only_strings = !kinds.is_empty() && kinds.iter().all(|k| k == "string" || k == "null");
    if only_strings && kinds.contains("string") {
        return Value::String(raw);
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn resolve<'a>(root: &'a Value, schema: &'a Value) -> &'a Value {
    let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
        return schema;
    };
    let name = reference.rsplit('/').next().unwrap_or_default();
    ["$defs", "definitions"]
        .iter()
        .find_map(|section| root.get(*section).and_then(|defs| defs.get(name)))
        .unwrap_or(schema)
}

fn array_items<'a>(root: &'a Value, schema: &'a Value) -> Option<&'a Value> {
    let schema = resolve(root, schema);
    if let Some(items) = schema.get("items") {
        return Some(items);
    }
    ["anyOf", "oneOf", "allOf"]
        .iter()
        .filter_map(|key| schema.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(|branch| array_items(root, branch))
}

/// The JSON types a schema admits, following `$ref` and combinators.
fn schema_kinds(root: &Value, schema: &Value) -> BTreeSet<String> {
    let schema = resolve(root, schema);
    let mut kinds = BTreeSet::new();
    match schema.get("type") {
        Some(Value::String(kind)) => {
            kinds.insert(kind.clone());
        }
        Some(Value::Array(list)) => {
            kinds.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        _ => {}
    }
    if kinds.is_empty() {
        if let Some(members) = schema.get("enum").and_then(Value::as_array) {
            kinds.extend(members.iter().map(|m| json_kind(m).to_string()));
        }
        if let Some(constant) = schema.get("const") {
            kinds.insert(json_kind(constant).to_string());
        }
    }
    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(branches) = schema.get(key).and_then(Value::as_array) {
            for branch in branches {
                kinds.extend(schema_kinds(root, branch));
            }
        }
    }
    kinds
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request headers as pairs with lower-cased names.
pub fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Cookies from every `Cookie` header, as name-value pairs.
pub fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            Some((name.trim().to_string(), value.to_string()))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn query_string_pairs() {
        let parsed = parse_query_string(Some("name=james&name=bethany&order=1"));
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2], ("order".to_string(), "1".to_string()));
        assert!(parse_query_string(None).is_empty());
    }

    #[test]
    fn multi_dict_rules() {
        let map = parse_multi_dict(&pairs(&[
            ("order", "1"),
            ("name", "a"),
            ("name", "b"),
            ("text", "hello"),
            ("data", "{\"type\": \"foo\"}"),
        ]));
        assert_eq!(map["order"], json!(1));
        assert_eq!(map["name"], json!(["a", "b"]));
        assert_eq!(map["text"], json!("hello"));
        assert_eq!(map["data"], json!({ "type": "foo" }));
    }

    #[test]
    fn array_properties_are_always_lists() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": ["array", "null"], "items": { "type": "string" } }
            }
        });
        let map = coerce_params(&pairs(&[("name", "james")]), &schema);
        assert_eq!(map["name"], json!(["james"]));

        let map = coerce_params(&pairs(&[("name", "1"), ("name", "2")]), &schema);
        assert_eq!(map["name"], json!(["1", "2"]));
    }

    #[test]
    fn string_properties_are_not_decoded() {
        let schema = json!({
            "type": "object",
            "properties": {
                "uid": { "type": "string" },
                "limit": { "type": "integer" }
            }
        });
        let map = coerce_params(&pairs(&[("uid", "123"), ("limit", "5"), ("extra", "true")]), &schema);
        assert_eq!(map["uid"], json!("123"));
        assert_eq!(map["limit"], json!(5));
        assert_eq!(map["extra"], json!(true));
    }

    #[test]
    fn refs_to_defs_are_followed() {
        let schema = json!({
            "type": "object",
            "properties": {
                "order": { "anyOf": [{ "$ref": "#/$defs/Order" }, { "type": "null" }] },
                "lang": { "$ref": "#/$defs/Language" }
            },
            "$defs": {
                "Order": { "type": "integer", "enum": [0, 1] },
                "Language": { "type": "string", "enum": ["en-US", "zh-CN"] }
            }
        });
        let map = coerce_params(&pairs(&[("order", "1"), ("lang", "en-US")]), &schema);
        assert_eq!(map["order"], json!(1));
        assert_eq!(map["lang"], json!("en-US"));
    }

    #[test]
    fn headers_are_lowercased() {
        let mut headers = HeaderMap::new();
        headers.insert("Lang", HeaderValue::from_static("en-US"));
        assert_eq!(header_pairs(&headers), pairs(&[("lang", "en-US")]));
    }

    #[test]
    fn cookies_are_split() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("pub=abcdefg; session=\"x\""));
        assert_eq!(parse_cookies(&headers), pairs(&[("pub", "abcdefg"), ("session", "x")]));
    }
}
