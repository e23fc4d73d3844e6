#![deny(rust_2018_idioms)]

//! Path-addressed form state with debounced, schema-driven asynchronous
//! validation.
//!
//! A [`Form`] binds a nested `serde_json::Value` model to a tree of input
//! widgets. Widgets report edits by path; the form produces successor model
//! snapshots, coalesces validation requests per edit burst, runs them
//! against a [`Schema`] collaborator, and notifies listeners through a
//! [`FormEvent`] stream.

mod form;
pub mod path;
mod schema;

pub use form::{
    ErrorMap, FieldBinding, FieldMeta, FieldSource, Form, FormConfig, FormEvent, Getter, MatchMode,
    MessageSet, PayloadFn, Setter, Trigger, ValidationRequest, ValueMapping,
};
pub use schema::{
    FieldContext, FieldKind, JsonSchema, ModelErrors, PathErrors, Schema, SchemaError,
    ValidateOptions, ValidateOverrides,
};

pub mod prelude {
    pub use super::{
        Form, FormConfig, FormEvent, JsonSchema, MatchMode, Schema, Trigger, ValueMapping,
    };
}
