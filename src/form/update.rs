//! Applying widget edits to the model.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::path;

/// Reads the model value at a path. Overrides [`path::get`] when supplied.
pub type Getter = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// Produces a successor model with the leaf at a path replaced.
///
/// A custom setter must return a usable mapping object; violating that
/// contract trips a diagnostic-mode assertion.
pub type Setter = Arc<dyn Fn(&str, &Value, Value) -> Value + Send + Sync>;

/// Derives a leaf value from a raw widget payload.
pub type PayloadFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// How a widget payload becomes model leaf values.
#[derive(Clone, Default)]
pub enum ValueMapping {
    /// Store the payload at the edited path as-is.
    #[default]
    Direct,
    /// Pick a member out of the payload object.
    Key(String),
    /// Derive the leaf value from the payload.
    Map(PayloadFn),
    /// Fan one payload out across several paths, each `set` layered on the
    /// previous intermediate model.
    Spread(Vec<(String, FieldSource)>),
}

impl fmt::Debug for ValueMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMapping::Direct => f.write_str("Direct"),
            ValueMapping::Key(key) => write!(f, "Key({key})"),
            ValueMapping::Map(_) => f.write_str("Map(..)"),
            ValueMapping::Spread(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(target, source)| (target, source)))
                .finish(),
        }
    }
}

/// Where one spread entry takes its value from.
#[derive(Clone)]
pub enum FieldSource {
    /// Pick a member out of the payload object.
    Key(String),
    /// Compute the value from the whole payload.
    Map(PayloadFn),
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSource::Key(key) => write!(f, "Key({key})"),
            FieldSource::Map(_) => f.write_str("Map(..)"),
        }
    }
}

/// Applies one widget edit, returning the successor model and the paths
/// that were written.
pub fn apply_edit(
    model: &Value,
    edited_path: &str,
    payload: Value,
    mapping: &ValueMapping,
    setter: Option<&Setter>,
) -> (Value, Vec<String>) {
    match mapping {
        ValueMapping::Direct => {
            let next = write(model, edited_path, payload, setter);
            (next, vec![edited_path.to_string()])
        }
        ValueMapping::Key(key) => {
            let leaf = payload.get(key).cloned().unwrap_or(Value::Null);
            let next = write(model, edited_path, leaf, setter);
            (next, vec![edited_path.to_string()])
        }
        ValueMapping::Map(derive) => {
            let next = write(model, edited_path, derive(&payload), setter);
            (next, vec![edited_path.to_string()])
        }
        ValueMapping::Spread(entries) => {
            let mut next = model.clone();
            let mut written = Vec::with_capacity(entries.len());
            for (target, source) in entries {
                let leaf = match source {
                    FieldSource::Key(key) => payload.get(key).cloned().unwrap_or(Value::Null),
                    FieldSource::Map(derive) => derive(&payload),
                };
                next = write(&next, target, leaf, setter);
                written.push(target.clone());
            }
            (next, written)
        }
    }
}

fn write(model: &Value, target: &str, leaf: Value, setter: Option<&Setter>) -> Value {
    match setter {
        Some(custom) => {
            let next = custom(target, model, leaf);
            debug_assert!(
                next.is_object(),
                "custom setter must return the updated model object \
                 (path '{target}' produced {next:?})"
            );
            next
        }
        None => path::set(model, target, leaf),
    }
}

/// Reads the value at `target`, honouring a getter override.
pub fn read(model: &Value, target: &str, getter: Option<&Getter>) -> Option<Value> {
    match getter {
        Some(custom) => custom(target, model),
        None => path::get(model, target).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_mapping_stores_the_payload() {
        let (next, written) = apply_edit(&json!({}), "name", json!("jo"), &ValueMapping::Direct, None);
        assert_eq!(next, json!({"name": "jo"}));
        assert_eq!(written, vec!["name".to_string()]);
    }

    #[test]
    fn key_mapping_picks_a_payload_member() {
        let mapping = ValueMapping::Key("value".to_string());
        let (next, _) = apply_edit(&json!({}), "name", json!({"value": "john"}), &mapping, None);
        assert_eq!(next, json!({"name": "john"}));
    }

    #[test]
    fn function_mapping_derives_the_leaf() {
        let mapping = ValueMapping::Map(Arc::new(|payload| payload["value"].clone()));
        let (next, _) = apply_edit(&json!({}), "name", json!({"value": "john"}), &mapping, None);
        assert_eq!(next, json!({"name": "john"}));
    }

    #[test]
    fn spread_mapping_layers_sets_onto_intermediate_models() {
        let mapping = ValueMapping::Spread(vec![
            (
                "name".to_string(),
                FieldSource::Map(Arc::new(|payload| payload["value"].clone())),
            ),
            ("text".to_string(), FieldSource::Key("text".to_string())),
        ]);
        let (next, written) = apply_edit(
            &json!({}),
            "name",
            json!({"value": "john", "text": "hi"}),
            &mapping,
            None,
        );
        assert_eq!(next, json!({"name": "john", "text": "hi"}));
        assert_eq!(written, vec!["name".to_string(), "text".to_string()]);
    }

    #[test]
    fn custom_setter_replaces_the_default_write() {
        let setter: Setter = Arc::new(|target, model, leaf| path::set(model, target, leaf));
        let (next, _) = apply_edit(
            &json!({"age": 1}),
            "age",
            json!(2),
            &ValueMapping::Direct,
            Some(&setter),
        );
        assert_eq!(next, json!({"age": 2}));
    }

    #[test]
    #[should_panic(expected = "custom setter must return the updated model object")]
    fn setter_contract_violation_fails_loud_in_diagnostic_builds() {
        let broken: Setter = Arc::new(|_, _, leaf| leaf);
        apply_edit(
            &json!({}),
            "age",
            json!(2),
            &ValueMapping::Direct,
            Some(&broken),
        );
    }
}
