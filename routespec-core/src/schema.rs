use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::model::ModelRef;

/// Keywords a property schema may carry in the document.
const ALLOWED_PROPERTY_FIELDS: &[&str] = &[
    "title",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "maxProperties",
    "minProperties",
    "required",
    "enum",
    "const",
    "type",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "items",
    "properties",
    "additionalProperties",
    "description",
    "format",
    "default",
    "nullable",
    "discriminator",
    "readOnly",
    "writeOnly",
    "xml",
    "externalDocs",
    "example",
    "examples",
    "deprecated",
    "$ref",
];

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Reference to a component schema.
pub fn component_ref(name: &str) -> Value {
    serde_json::json!({ "$ref": format!("{COMPONENTS_PREFIX}{name}") })
}

/// Point every local `$ref` (`#/$defs/X`, `#/definitions/X`) at
/// `#/components/schemas/X`.
pub fn rewrite_refs(value: &mut Value) {
    if let Some(items) = value.as_array_mut() {
        items.iter_mut().for_each(rewrite_refs);
        return;
    }
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if let Some(Value::String(target)) = obj.get_mut("$ref") {
        let local = target
            .strip_prefix("#/$defs/")
            .or_else(|| target.strip_prefix("#/definitions/"))
            .map(str::to_owned);
        if let Some(name) = local {
            *target = format!("{COMPONENTS_PREFIX}{name}");
        }
    }
    obj.values_mut().for_each(rewrite_refs);
}

/// Keep only the allowed keywords on each property of `properties`.
pub fn filter_properties(properties: &Map<String, Value>) -> Map<String, Value> {
    properties
        .iter()
        .map(|(name, schema)| {
            let filtered = match schema {
                Value::Object(obj) => Value::Object(
                    obj.iter()
                        .filter(|(key, _)| ALLOWED_PROPERTY_FIELDS.contains(&key.as_str()))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
                other => other.clone(),
            };
            (name.clone(), filtered)
        })
        .collect()
}

/// Turn a model schema into a document-ready object schema.
///
/// `$schema` and `$defs` are dropped, properties are filtered and every
/// reference points into `components/schemas`.
pub fn openapi_schema(schema: &Value) -> Value {
    let Value::Object(obj) = schema else {
        return schema.clone();
    };
    let mut result = Map::new();
    for (key, value) in obj {
        match (key.as_str(), value) {
            ("$schema", _) | ("$defs", _) | ("definitions", _) => {}
            ("properties", Value::Object(props)) => {
                result.insert(key.clone(), Value::Object(filter_properties(props)));
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    let mut result = Value::Object(result);
    rewrite_refs(&mut result);
    result
}

/// The nested definitions of a root schema, cleaned for the document.
pub fn nested_definitions(schema: &Value) -> Vec<(String, Value)> {
    ["$defs", "definitions"]
        .iter()
        .filter_map(|key| schema.get(*key).and_then(Value::as_object))
        .flatten()
        .map(|(name, def)| (name.clone(), openapi_schema(def)))
        .collect()
}

/// Registry that collects component schemas for the document.
///
/// Each model registers under its schema name; its nested definitions are
/// promoted next to it, so models sharing a nested type share one component.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and its nested definitions.
    pub fn register_model(&mut self, model: &ModelRef) {
        self.register_root(model.name(), &model.schema());
    }

    /// Register a root schema (as produced by schemars) under `name`.
    pub fn register_root(&mut self, name: &str, root: &Value) {
        for (def_name, def_schema) in nested_definitions(root) {
            self.schemas.entry(def_name).or_insert(def_schema);
        }
        self.schemas.insert(name.to_string(), openapi_schema(root));
    }

    /// Register an already cleaned schema under the given name.
    pub fn register(&mut self, name: &str, schema: Value) {
        self.schemas.insert(name.to_string(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// All schemas, ordered by name.
    pub fn schemas(&self) -> &BTreeMap<String, Value> {
        &self.schemas
    }

    /// Consume the registry and return the `components/schemas` object.
    pub fn into_components(self) -> Map<String, Value> {
        self.schemas.into_iter().collect()
    }
}
