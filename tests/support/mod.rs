//! Shared test doubles for the form suites.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use pathform::{
    FieldContext, FieldKind, ModelErrors, PathErrors, Schema, SchemaError, ValidateOptions, path,
};

/// A schema stub that requires the configured paths to be non-empty and
/// counts how many per-path validations actually ran.
#[derive(Default)]
pub struct StubSchema {
    required: Vec<(String, String)>,
    pub calls: AtomicUsize,
}

impl StubSchema {
    pub fn require(mut self, target: &str, message: &str) -> Self {
        self.required.push((target.to_string(), message.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn messages_for(&self, target: &str, value: Option<&Value>) -> Vec<String> {
        let missing = match value {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.is_empty(),
            Some(_) => false,
        };
        self.required
            .iter()
            .filter(|(required, _)| required == target && missing)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl Schema for StubSchema {
    fn reach(&self, _target: &str) -> Result<FieldKind, SchemaError> {
        Ok(FieldKind::Text)
    }

    async fn validate_at(
        &self,
        target: &str,
        value: Option<&Value>,
        _context: &FieldContext,
        _options: &ValidateOptions,
    ) -> Result<Vec<String>, SchemaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.messages_for(target, value))
    }

    async fn validate(
        &self,
        value: &Value,
        _options: &ValidateOptions,
    ) -> Result<ModelErrors, SchemaError> {
        let mut inner = Vec::new();
        for (target, _) in &self.required {
            let current = path::get(value, target);
            let errors = self.messages_for(target, current);
            if !errors.is_empty() {
                inner.push(PathErrors {
                    path: target.clone(),
                    errors,
                });
            }
        }
        Ok(ModelErrors { inner })
    }
}

/// A schema collaborator that fails internally on every call.
#[allow(dead_code)]
pub struct BrokenSchema;

#[async_trait]
impl Schema for BrokenSchema {
    fn reach(&self, _target: &str) -> Result<FieldKind, SchemaError> {
        Ok(FieldKind::Text)
    }

    async fn validate_at(
        &self,
        _target: &str,
        _value: Option<&Value>,
        _context: &FieldContext,
        _options: &ValidateOptions,
    ) -> Result<Vec<String>, SchemaError> {
        Err(SchemaError::Compile("backend exploded".to_string()))
    }

    async fn validate(
        &self,
        _value: &Value,
        _options: &ValidateOptions,
    ) -> Result<ModelErrors, SchemaError> {
        Err(SchemaError::Compile("backend exploded".to_string()))
    }
}
