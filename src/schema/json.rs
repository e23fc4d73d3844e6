//! JSON Schema adapter for the [`Schema`] capability.
//!
//! Works directly on the raw schema document. Path resolution walks
//! `properties` / `items`, following `$ref` fragments (including
//! percent-encoded JSON pointers) through the same document. Compiled
//! sub-schema validators are cached per path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::{Validator, validator_for};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::path::{self, Segment};

use super::{
    FieldContext, FieldKind, ModelErrors, PathErrors, Schema, SchemaError, ValidateOptions,
};

const MAX_REF_HOPS: usize = 32;

/// A compiled JSON Schema document usable as a form schema collaborator.
pub struct JsonSchema {
    raw: Value,
    root: Validator,
    compiled: Mutex<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchema").field("raw", &self.raw).finish()
    }
}

impl JsonSchema {
    /// Compiles a raw schema document.
    pub fn compile(raw: Value) -> Result<Self, SchemaError> {
        let root = validator_for(&raw).map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(Self {
            raw,
            root,
            compiled: Mutex::new(HashMap::new()),
        })
    }

    fn follow_reference(&self, reference: &str) -> Result<&Value, SchemaError> {
        let Some(fragment) = reference.strip_prefix('#') else {
            return Err(SchemaError::BadReference {
                reference: reference.to_string(),
                reason: "only same-document references are supported".to_string(),
            });
        };

        let decoded =
            percent_decode_str(fragment)
                .decode_utf8()
                .map_err(|_| SchemaError::BadReference {
                    reference: reference.to_string(),
                    reason: "invalid percent-encoding".to_string(),
                })?;
        let pointer = if decoded.is_empty() {
            String::new()
        } else if decoded.starts_with('/') {
            decoded.to_string()
        } else {
            format!("/{decoded}")
        };

        self.raw
            .pointer(&pointer)
            .ok_or_else(|| SchemaError::BadReference {
                reference: reference.to_string(),
                reason: "target not found".to_string(),
            })
    }

    fn resolve_refs<'a>(&'a self, mut node: &'a Value) -> Result<&'a Value, SchemaError> {
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
                return Ok(node);
            };
            node = self.follow_reference(reference)?;
        }
        Err(SchemaError::BadReference {
            reference: "$ref".to_string(),
            reason: "reference chain too deep".to_string(),
        })
    }

    fn node_at(&self, target: &str) -> Result<&Value, SchemaError> {
        let mut node = self.resolve_refs(&self.raw)?;
        for segment in path::split(target) {
            let next = match segment {
                Segment::Key(key) => node
                    .get("properties")
                    .and_then(|properties| properties.get(&key)),
                Segment::Index(_) => node.get("items"),
            };
            node = match next {
                Some(child) => self.resolve_refs(child)?,
                None => return Err(SchemaError::Unreachable(target.to_string())),
            };
        }
        Ok(node)
    }

    fn validator_at(&self, target: &str) -> Result<Arc<Validator>, SchemaError> {
        if let Some(validator) = self.compiled.lock().get(target) {
            return Ok(Arc::clone(validator));
        }

        let node = self.node_at(target)?;
        let mut document = node.clone();
        // Carry the root's definitions so nested $refs stay resolvable.
        if let Value::Object(object) = &mut document {
            for key in ["definitions", "$defs"] {
                if let Some(definitions) = self.raw.get(key) {
                    object
                        .entry(key.to_string())
                        .or_insert_with(|| definitions.clone());
                }
            }
        }

        let validator =
            validator_for(&document).map_err(|err| SchemaError::Compile(err.to_string()))?;
        let validator = Arc::new(validator);
        self.compiled
            .lock()
            .insert(target.to_string(), Arc::clone(&validator));
        Ok(validator)
    }
}

#[async_trait]
impl Schema for JsonSchema {
    fn reach(&self, target: &str) -> Result<FieldKind, SchemaError> {
        let node = self.node_at(target)?;
        Ok(detect_kind(node))
    }

    async fn validate_at(
        &self,
        target: &str,
        value: Option<&Value>,
        _context: &FieldContext,
        options: &ValidateOptions,
    ) -> Result<Vec<String>, SchemaError> {
        let validator = self.validator_at(target)?;
        let owned;
        let instance = match value {
            Some(value) => value,
            None => {
                owned = Value::Null;
                &owned
            }
        };

        let mut messages: Vec<String> = Vec::new();
        for error in validator.iter_errors(instance) {
            messages.push(error.to_string());
            if options.abort_early {
                break;
            }
        }
        Ok(messages)
    }

    async fn validate(
        &self,
        value: &Value,
        options: &ValidateOptions,
    ) -> Result<ModelErrors, SchemaError> {
        let mut grouped: indexmap::IndexMap<String, Vec<String>> = indexmap::IndexMap::new();
        for error in self.root.iter_errors(value) {
            let target = path::from_pointer(&error.instance_path.to_string());
            grouped.entry(target).or_default().push(error.to_string());
            if options.abort_early {
                break;
            }
        }
        Ok(ModelErrors {
            inner: grouped
                .into_iter()
                .map(|(target, errors)| PathErrors {
                    path: target,
                    errors,
                })
                .collect(),
        })
    }
}

fn detect_kind(node: &Value) -> FieldKind {
    if let Some(options) = node.get("enum").and_then(Value::as_array) {
        let choices = options
            .iter()
            .map(|choice| match choice {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        return FieldKind::Select(choices);
    }

    match read_type(node).as_deref() {
        Some("integer") => FieldKind::Integer,
        Some("number") => FieldKind::Number,
        Some("boolean") => FieldKind::Boolean,
        Some("array") => {
            let inner = node.get("items").map(detect_kind).unwrap_or(FieldKind::Text);
            FieldKind::List(Box::new(inner))
        }
        Some("object") => FieldKind::Group,
        Some(_) => FieldKind::Text,
        None if node.get("properties").is_some() => FieldKind::Group,
        None => FieldKind::Text,
    }
}

fn read_type(node: &Value) -> Option<String> {
    match node.get("type")? {
        Value::String(name) => Some(name.to_lowercase()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_lowercase)
            .find(|name| name != "null"),
        _ => None,
    }
}
