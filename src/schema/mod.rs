//! The schema collaborator capability surface.
//!
//! The form engine does not define a schema language. It requires a
//! collaborator that can resolve a sub-schema for a path, validate a single
//! value in its field context, and validate a whole model collecting every
//! failure. [`JsonSchema`] is the bundled JSON Schema adapter; custom
//! backends implement [`Schema`] directly.

mod json;

pub use json::JsonSchema;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Options forwarded to every schema validation call.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Disable loose type coercion in backends that support it.
    pub strict: bool,
    /// Stop at the first failure instead of collecting all of them.
    pub abort_early: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            strict: true,
            abort_early: true,
        }
    }
}

impl ValidateOptions {
    /// Layers per-request overrides on top of the ambient options.
    pub fn merge(&self, overrides: &ValidateOverrides) -> ValidateOptions {
        ValidateOptions {
            strict: overrides.strict.unwrap_or(self.strict),
            abort_early: overrides.abort_early.unwrap_or(self.abort_early),
        }
    }
}

/// Per-request option overrides supplied by the originating widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOverrides {
    pub strict: Option<bool>,
    pub abort_early: Option<bool>,
}

/// Context handed to path-scoped validation alongside the field value.
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Value of the field's parent, an empty object when absent.
    pub parent: Value,
    /// The field path being validated.
    pub path: String,
}

/// The widget-facing shape of a field, resolved once at registration.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
    /// A closed set of choices.
    Select(Vec<String>),
    /// A sequence of same-shaped elements.
    List(Box<FieldKind>),
    /// A nested object; addressed through its children.
    Group,
}

/// Failure of the schema collaborator itself.
///
/// These are never field validation failures: the engine escalates them
/// instead of storing them in the error store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no schema is reachable at path '{0}'")]
    Unreachable(String),
    #[error("schema reference '{reference}' cannot be resolved: {reason}")]
    BadReference { reference: String, reason: String },
    #[error("schema failed to compile: {0}")]
    Compile(String),
}

/// Grouped per-path failures from a whole-model validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelErrors {
    pub inner: Vec<PathErrors>,
}

impl ModelErrors {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// The failures recorded against one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathErrors {
    pub path: String,
    pub errors: Vec<String>,
}

/// Capability set the form engine requires from a schema collaborator.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Resolves the sub-schema addressed by `path`, returning its field
    /// shape. Fails when the path is not addressable in this schema.
    fn reach(&self, path: &str) -> Result<FieldKind, SchemaError>;

    /// Validates `value` against the sub-schema at `path`.
    ///
    /// Returns the failure messages for the field; an empty list means the
    /// value is valid. `Err` signals a collaborator failure, not a
    /// validation failure.
    async fn validate_at(
        &self,
        path: &str,
        value: Option<&Value>,
        context: &FieldContext,
        options: &ValidateOptions,
    ) -> Result<Vec<String>, SchemaError>;

    /// Validates the whole model.
    ///
    /// With `abort_early` unset the result carries every failing path.
    async fn validate(
        &self,
        value: &Value,
        options: &ValidateOptions,
    ) -> Result<ModelErrors, SchemaError>;
}
