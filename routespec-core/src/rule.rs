//! Route rules with typed path variables.
//!
//! A rule is a path where each variable is written `<converter(args):name>`,
//! or just `<name>` for the default string converter:
//!
//! ```text
//! /api/user/<name>
//! /convert/<int(min=1, max=5):id>
//! /files/<path:rest>
//! ```

use serde_json::Value;

use crate::error::SpecError;

/// A literal in a converter argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl ArgValue {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.len() >= 2 {
            let bytes = raw.as_bytes();
            let (first, last) = (bytes[0], bytes[raw.len() - 1]);
            if (first == b'"' || first == b'\'') && first == last {
                return ArgValue::Str(raw[1..raw.len() - 1].to_string());
            }
        }
        match raw {
            "True" => return ArgValue::Bool(true),
            "False" => return ArgValue::Bool(false),
            "None" => return ArgValue::None,
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ArgValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return ArgValue::Float(f);
        }
        ArgValue::Str(raw.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Int(i) => Value::from(*i),
            ArgValue::Float(f) => Value::from(*f),
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::None => Value::Null,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Int(i) => Some(*i as f64),
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String form, used for `any(...)` members.
    pub fn as_text(&self) -> String {
        match self {
            ArgValue::Str(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// Positional and keyword arguments of a converter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterArgs {
    pub positional: Vec<ArgValue>,
    pub named: Vec<(String, ArgValue)>,
}

impl ConverterArgs {
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.named.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn parse(raw: &str) -> Self {
        let mut args = ConverterArgs::default();
        for piece in split_args(raw) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match piece.split_once('=') {
                Some((key, value)) if is_identifier(key.trim()) => {
                    args.named.push((key.trim().to_string(), ArgValue::parse(value)));
                }
                _ => args.positional.push(ArgValue::parse(piece)),
            }
        }
        args
    }
}

/// Split on commas that are not inside quotes.
fn split_args(raw: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, ',') => {
                pieces.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&raw[start..]);
    pieces
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One `<...>` variable of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PathVariable {
    pub name: String,
    /// Converter name, `default` when omitted.
    pub converter: String,
    pub args: ConverterArgs,
}

/// A parsed rule and its two renderings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRule {
    pub rule: String,
    /// Path as registered with axum (`{id}`, `{*rest}`).
    pub axum_path: String,
    /// Path as documented (`{id}`).
    pub openapi_path: String,
    pub variables: Vec<PathVariable>,
}

/// Parse a rule such as `/api/<int(min=1):id>/<name>`.
pub fn parse_rule(rule: &str) -> Result<ParsedRule, SpecError> {
    let invalid = |reason: &str| SpecError::InvalidRule {
        rule: rule.to_string(),
        reason: reason.to_string(),
    };

    let mut axum_path = String::new();
    let mut openapi_path = String::new();
    let mut variables: Vec<PathVariable> = Vec::new();
    let mut rest = rule;

    while !rest.is_empty() {
        let open = rest.find('<');
        let static_part = &rest[..open.unwrap_or(rest.len())];
        if static_part.contains('>') {
            return Err(invalid("unexpected '>'"));
        }
        axum_path.push_str(static_part);
        openapi_path.push_str(static_part);

        let Some(open) = open else {
            break;
        };
        let after = &rest[open + 1..];
        let close = after.find('>').ok_or_else(|| invalid("unterminated '<'"))?;
        let variable = parse_variable(&after[..close]).ok_or_else(|| invalid("bad variable"))?;

        if variables.iter().any(|v| v.name == variable.name) {
            return Err(SpecError::DuplicateVariable {
                rule: rule.to_string(),
                variable: variable.name,
            });
        }

        if variable.converter == "path" {
            if close + 1 != after.len() || !axum_path.ends_with('/') {
                return Err(invalid("a 'path' variable must be the whole last segment"));
            }
            axum_path.push_str(&format!("{{*{}}}", variable.name));
        } else {
            axum_path.push_str(&format!("{{{}}}", variable.name));
        }
        openapi_path.push_str(&format!("{{{}}}", variable.name));
        variables.push(variable);
        rest = &after[close + 1..];
    }

    Ok(ParsedRule {
        rule: rule.to_string(),
        axum_path,
        openapi_path,
        variables,
    })
}

fn parse_variable(inner: &str) -> Option<PathVariable> {
    let (converter, args, name) = match inner.find('(') {
        Some(paren) => {
            let close = inner.rfind(')')?;
            let name = inner[close + 1..].strip_prefix(':')?;
            (&inner[..paren], ConverterArgs::parse(&inner[paren + 1..close]), name)
        }
        None => match inner.split_once(':') {
            Some((converter, name)) => (converter, ConverterArgs::default(), name),
            None => ("default", ConverterArgs::default(), inner),
        },
    };

    let converter = converter.trim();
    let name = name.trim();
    if !is_identifier(converter) || !is_identifier(name) {
        return None;
    }
    Some(PathVariable {
        name: name.to_string(),
        converter: converter.to_string(),
        args,
    })
}
