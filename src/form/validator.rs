//! Path-scoped validation engine.
//!
//! Owns the error store and runs validation for a set of paths through the
//! schema collaborator. Computing results and committing them are separate
//! steps so a torn-down form can drop a late result without touching state.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::path;
use crate::schema::{FieldContext, Schema, SchemaError, ValidateOptions};

use super::store::{ErrorMap, ErrorStore, MessageSet};
use super::update::{self, Getter};

/// One validated path together with its failure messages.
pub type PathResult = (String, Vec<String>);

#[derive(Debug, Default)]
pub struct ValidatorEngine {
    store: Mutex<ErrorStore>,
}

impl ValidatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the external-origin view of errors wholesale.
    pub fn sync(&self, external: &IndexMap<String, MessageSet>) {
        self.store.lock().sync(external);
    }

    /// The full current mapping of path to messages.
    pub fn errors(&self) -> ErrorMap {
        self.store.lock().snapshot()
    }

    /// Paths currently carrying at least one message.
    pub fn errored_paths(&self) -> Vec<String> {
        self.store.lock().paths()
    }

    /// Replaces the whole store with an authoritative mapping.
    pub fn replace(&self, entries: ErrorMap) {
        self.store.lock().replace(entries);
    }

    /// Validates each path against the schema collaborator.
    ///
    /// For every path this resolves the sub-schema, the field value, and
    /// the parent value, then runs the collaborator with the merged options
    /// and a `{parent, path}` context. Collaborator failures escalate as
    /// `Err`; they are never stored as field errors.
    pub async fn validate(
        &self,
        schema: &dyn Schema,
        model: &Value,
        paths: &[String],
        getter: Option<&Getter>,
        options: &ValidateOptions,
    ) -> Result<Vec<PathResult>, SchemaError> {
        let mut results = Vec::with_capacity(paths.len());
        for target in paths {
            schema.reach(target)?;
            let value = update::read(model, target, getter);
            let parent = update::read(model, &path::parent(target), getter).unwrap_or(json!({}));
            let context = FieldContext {
                parent,
                path: target.clone(),
            };
            let messages = schema
                .validate_at(target, value.as_ref(), &context, options)
                .await?;
            results.push((target.clone(), messages));
        }
        Ok(results)
    }

    /// Merges a completed validation pass into the store.
    ///
    /// Only the validated paths are touched.
    pub fn commit(&self, results: Vec<PathResult>) {
        let mut store = self.store.lock();
        for (target, messages) in results {
            store.merge_validated(&target, messages);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FirstNameRequired;

    #[async_trait]
    impl Schema for FirstNameRequired {
        fn reach(&self, _target: &str) -> Result<crate::schema::FieldKind, SchemaError> {
            Ok(crate::schema::FieldKind::Text)
        }

        async fn validate_at(
            &self,
            target: &str,
            value: Option<&Value>,
            context: &FieldContext,
            _options: &ValidateOptions,
        ) -> Result<Vec<String>, SchemaError> {
            assert_eq!(context.path, target);
            let empty = value.map(|v| v == &json!("")).unwrap_or(true);
            if target == "name.first" && empty {
                Ok(vec!["please enter a first name".to_string()])
            } else {
                Ok(vec![])
            }
        }

        async fn validate(
            &self,
            _value: &Value,
            _options: &ValidateOptions,
        ) -> Result<crate::schema::ModelErrors, SchemaError> {
            Ok(crate::schema::ModelErrors::default())
        }
    }

    #[tokio::test]
    async fn validate_then_commit_updates_only_validated_paths() {
        let engine = ValidatorEngine::new();
        engine.commit(vec![("other".to_string(), vec!["kept".to_string()])]);

        let model = json!({"name": {"first": ""}});
        let results = engine
            .validate(
                &FirstNameRequired,
                &model,
                &["name.first".to_string()],
                None,
                &ValidateOptions::default(),
            )
            .await
            .expect("collaborator succeeds");
        engine.commit(results);

        let errors = engine.errors();
        assert_eq!(
            errors["name.first"],
            vec!["please enter a first name".to_string()]
        );
        assert_eq!(errors["other"], vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn passing_validation_clears_the_path() {
        let engine = ValidatorEngine::new();
        engine.commit(vec![(
            "name.first".to_string(),
            vec!["please enter a first name".to_string()],
        )]);

        let model = json!({"name": {"first": "amy"}});
        let results = engine
            .validate(
                &FirstNameRequired,
                &model,
                &["name.first".to_string()],
                None,
                &ValidateOptions::default(),
            )
            .await
            .expect("collaborator succeeds");
        engine.commit(results);

        assert!(engine.errors().is_empty());
    }
}
