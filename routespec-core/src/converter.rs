use std::collections::HashMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde_json::{json, Map, Value};

use crate::rule::{ArgValue, ConverterArgs, PathVariable};

/// A custom path converter.
///
/// The schema documents the path parameter; `accepts` decides whether a raw
/// segment matches (a rejected segment produces a 404).
pub trait PathConverter: Send + Sync {
    fn schema(&self, args: &ConverterArgs) -> Value;

    fn accepts(&self, _raw: &str, _args: &ConverterArgs) -> bool {
        true
    }
}

/// Converter restricted to the string members of an enum model.
#[derive(Debug, Clone)]
pub struct EnumConverter {
    values: Vec<Value>,
}

impl EnumConverter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(|v| Value::String(v.into())).collect(),
        }
    }

    /// Collect members from the JSON schema of `T` (`enum` or `oneOf` of `const`).
    pub fn of<T: JsonSchema>() -> Self {
        let schema = schemars::schema_for!(T).to_value();
        let mut values: Vec<Value> = schema
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if values.is_empty() {
            if let Some(variants) = schema.get("oneOf").and_then(Value::as_array) {
                for variant in variants {
                    if let Some(value) = variant.get("const") {
                        values.push(value.clone());
                    } else if let Some(members) = variant.get("enum").and_then(Value::as_array) {
                        values.extend(members.iter().cloned());
                    }
                }
            }
        }
        Self { values }
    }
}

impl PathConverter for EnumConverter {
    fn schema(&self, _args: &ConverterArgs) -> Value {
        json!({ "type": "string", "enum": self.values })
    }

    fn accepts(&self, raw: &str, _args: &ConverterArgs) -> bool {
        self.values.iter().any(|v| v.as_str() == Some(raw))
    }
}

/// Built-in and custom converters, looked up by name.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    custom: HashMap<String, Arc<dyn PathConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, converter: impl PathConverter + 'static) {
        self.custom.insert(name.into(), Arc::new(converter));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name) || is_builtin(name)
    }

    /// Schema documenting a path variable.
    pub fn schema(&self, var: &PathVariable) -> Value {
        let args = &var.args;
        match var.converter.as_str() {
            "any" => {
                let members: Vec<String> = args.positional.iter().map(ArgValue::as_text).collect();
                json!({ "type": "string", "enum": members })
            }
            "int" => {
                let mut schema = object(json!({ "type": "integer", "format": "int32" }));
                if let Some(max) = args.get("max") {
                    schema.insert("maximum".into(), max.to_json());
                }
                if let Some(min) = args.get("min") {
                    schema.insert("minimum".into(), min.to_json());
                }
                Value::Object(schema)
            }
            "float" => json!({ "type": "number", "format": "float" }),
            "uuid" => json!({ "type": "string", "format": "uuid" }),
            "path" => json!({ "type": "string", "format": "path" }),
            "string" => {
                let mut schema = object(json!({ "type": "string" }));
                if let Some(length) = args.get("length") {
                    schema.insert("length".into(), length.to_json());
                }
                if let Some(max) = args.get("maxlength") {
                    schema.insert("maxLength".into(), max.to_json());
                }
                if let Some(min) = args.get("minlength") {
                    schema.insert("minLength".into(), min.to_json());
                }
                Value::Object(schema)
            }
            "default" => json!({ "type": "string" }),
            name => match self.custom.get(name) {
                Some(converter) => converter.schema(args),
                None => {
                    tracing::warn!(converter = name, "unknown path converter, documenting as string");
                    json!({ "type": "string" })
                }
            },
        }
    }

    /// Whether a raw path segment is accepted by the variable's converter.
    pub fn accepts(&self, var: &PathVariable, raw: &str) -> bool {
        let args = &var.args;
        match var.converter.as_str() {
            "default" | "string" => accepts_string(raw, args),
            "int" => accepts_int(raw, args),
            "float" => accepts_float(raw, args),
            "uuid" => uuid::Uuid::parse_str(raw).is_ok(),
            "any" => args.positional.iter().any(|member| member.as_text() == raw),
            "path" => true,
            name => self
                .custom
                .get(name)
                .map_or(true, |converter| converter.accepts(raw, args)),
        }
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(name, "default" | "string" | "int" | "float" | "uuid" | "any" | "path")
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn accepts_string(raw: &str, args: &ConverterArgs) -> bool {
    if raw.is_empty() || raw.contains('/') {
        return false;
    }
    let len = raw.chars().count() as i64;
    if let Some(length) = args.get("length").and_then(ArgValue::as_i64) {
        return len == length;
    }
    let min = args.get("minlength").and_then(ArgValue::as_i64).unwrap_or(1);
    let max = args.get("maxlength").and_then(ArgValue::as_i64);
    len >= min && max.map_or(true, |max| len <= max)
}

fn accepts_int(raw: &str, args: &ConverterArgs) -> bool {
    let signed = args.get("signed").and_then(ArgValue::as_bool).unwrap_or(false);
    let digits = if signed { raw.strip_prefix('-').unwrap_or(raw) } else { raw };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if let Some(fixed) = args.get("fixed_digits").and_then(ArgValue::as_i64) {
        if digits.len() as i64 != fixed {
            return false;
        }
    }
    let Ok(value) = raw.parse::<i64>() else {
        return false;
    };
    let above_min = args.get("min").and_then(ArgValue::as_i64).map_or(true, |min| value >= min);
    let below_max = args.get("max").and_then(ArgValue::as_i64).map_or(true, |max| value <= max);
    above_min && below_max
}

fn accepts_float(raw: &str, args: &ConverterArgs) -> bool {
    let signed = args.get("signed").and_then(ArgValue::as_bool).unwrap_or(false);
    let unsigned = if signed { raw.strip_prefix('-').unwrap_or(raw) } else { raw };
    let Some((int_part, frac_part)) = unsigned.split_once('.') else {
        return false;
    };
    if int_part.is_empty()
        || frac_part.is_empty()
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }
    let Ok(value) = raw.parse::<f64>() else {
        return false;
    };
    let above_min = args.get("min").and_then(ArgValue::as_f64).map_or(true, |min| value >= min);
    let below_max = args.get("max").and_then(ArgValue::as_f64).map_or(true, |max| value <= max);
    above_min && below_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse_rule;
    use serde::Serialize;

    fn var(rule: &str) -> PathVariable {
        parse_rule(rule).unwrap().variables.remove(0)
    }

    #[derive(Serialize, JsonSchema)]
    #[serde(rename_all = "lowercase")]
    #[allow(dead_code)]
    enum Example {
        One,
        Two,
    }

    #[test]
    fn builtin_schemas() {
        let registry = ConverterRegistry::new();
        assert_eq!(
            registry.schema(&var("/c/<any(a, b, c):example>")),
            json!({ "type": "string", "enum": ["a", "b", "c"] })
        );
        assert_eq!(
            registry.schema(&var("/c/<int(min=1, max=5):example>")),
            json!({ "type": "integer", "format": "int32", "minimum": 1, "maximum": 5 })
        );
        assert_eq!(
            registry.schema(&var("/c/<uuid:example>")),
            json!({ "type": "string", "format": "uuid" })
        );
        assert_eq!(
            registry.schema(&var("/c/<float:example>")),
            json!({ "type": "number", "format": "float" })
        );
        assert_eq!(
            registry.schema(&var("/c/<path:example>")),
            json!({ "type": "string", "format": "path" })
        );
        assert_eq!(
            registry.schema(&var("/c/<string(length=5):example>")),
            json!({ "type": "string", "length": 5 })
        );
        assert_eq!(
            registry.schema(&var("/c/<string(maxlength=5):example>")),
            json!({ "type": "string", "maxLength": 5 })
        );
        assert_eq!(registry.schema(&var("/c/<unknown:example>")), json!({ "type": "string" }));
    }

    #[test]
    fn enum_converter_from_model() {
        let mut registry = ConverterRegistry::new();
        registry.register("example", EnumConverter::of::<Example>());
        let v = var("/c/<example:example>");
        assert_eq!(registry.schema(&v), json!({ "type": "string", "enum": ["one", "two"] }));
        assert!(registry.accepts(&v, "one"));
        assert!(!registry.accepts(&v, "three"));
    }

    #[test]
    fn int_acceptance() {
        let registry = ConverterRegistry::new();
        let v = var("/c/<int(min=1, max=5):id>");
        assert!(registry.accepts(&v, "3"));
        assert!(!registry.accepts(&v, "9"));
        assert!(!registry.accepts(&v, "abc"));
        assert!(!registry.accepts(&v, "-1"));
    }

    #[test]
    fn string_and_uuid_acceptance() {
        let registry = ConverterRegistry::new();
        let v = var("/c/<string(length=2):lang>");
        assert!(registry.accepts(&v, "zh"));
        assert!(!registry.accepts(&v, "zho"));
        let v = var("/c/<uuid:id>");
        assert!(registry.accepts(&v, "67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!registry.accepts(&v, "nope"));
    }

    #[test]
    fn float_acceptance() {
        let registry = ConverterRegistry::new();
        let v = var("/c/<float:x>");
        assert!(registry.accepts(&v, "1.5"));
        assert!(!registry.accepts(&v, "1"));
    }
}
