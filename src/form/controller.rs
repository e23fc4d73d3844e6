//! The form controller.
//!
//! Composes the update reducer, the validation scheduler, the validator
//! engine, and message reconciliation into one session object. Widgets feed
//! edits in through [`Form::handle_change`]; collaborators observe the form
//! through the [`FormEvent`] stream.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use crate::schema::{FieldKind, Schema, SchemaError, ValidateOptions};

use super::messages::{self, MatchMode};
use super::scheduler::{PendingQueue, TimerRegistry, Trigger, ValidationRequest};
use super::store::{ErrorMap, MessageSet};
use super::update::{self, Getter, Setter, ValueMapping};
use super::validator::ValidatorEngine;

/// Configuration surface of a form session.
#[derive(Clone)]
pub struct FormConfig {
    /// Debounce window for change-triggered validation.
    pub delay: Duration,
    /// Disable loose type coercion in the schema collaborator.
    pub strict: bool,
    /// Turn off validation entirely; value updates still apply.
    pub no_validate: bool,
    /// Override for reading model values.
    pub getter: Option<Getter>,
    /// Override for producing successor models.
    pub setter: Option<Setter>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
            strict: true,
            no_validate: false,
            getter: None,
            setter: None,
        }
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("delay", &self.delay)
            .field("strict", &self.strict)
            .field("no_validate", &self.no_validate)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Notifications emitted to form collaborators.
#[derive(Debug, Clone)]
pub enum FormEvent {
    /// The model changed; carries the successor value.
    ValueChanged(Value),
    /// A path was edited for the first time.
    Touched { path: String },
    /// A validation pass was requested; fires before it runs.
    Validating { paths: Vec<String>, trigger: Trigger },
    /// The error mapping changed; carries the full current mapping.
    ErrorsChanged(ErrorMap),
    /// Whole-model validation passed; carries the submitted value.
    Submitted(Value),
    /// A schema collaborator failure escalated out of a validation pass.
    Fault(SchemaError),
}

/// A field registration, resolved once at mount time.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub path: String,
    /// Widget shape resolved from the schema; no runtime duck-typing.
    pub kind: FieldKind,
    /// Triggers that request validation for this field.
    pub triggers: Vec<Trigger>,
}

/// Derived per-field view; recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub valid: bool,
    pub invalid: bool,
    pub touched: bool,
    /// Errors for the field and its descendants.
    pub errors: ErrorMap,
}

/// A form session: the explicit context object handed to field bindings.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

struct FormInner {
    config: FormConfig,
    schema: RwLock<Arc<dyn Schema>>,
    model: Mutex<Value>,
    engine: ValidatorEngine,
    queue: PendingQueue,
    timers: TimerRegistry,
    touched: Mutex<IndexSet<String>>,
    bindings: Mutex<IndexMap<String, FieldBinding>>,
    closed: AtomicBool,
    events: UnboundedSender<FormEvent>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("config", &self.inner.config)
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Form {
    /// Creates a form session over `schema` with an initial model value.
    ///
    /// Returns the session together with the receiving end of its event
    /// stream. Debounce timers are spawned on the ambient tokio runtime, so
    /// the session must be created and driven inside one.
    pub fn new(
        schema: Arc<dyn Schema>,
        initial: Value,
        config: FormConfig,
    ) -> (Self, UnboundedReceiver<FormEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let form = Self {
            inner: Arc::new(FormInner {
                config,
                schema: RwLock::new(schema),
                model: Mutex::new(initial),
                engine: ValidatorEngine::new(),
                queue: PendingQueue::default(),
                timers: TimerRegistry::default(),
                touched: Mutex::new(IndexSet::new()),
                bindings: Mutex::new(IndexMap::new()),
                closed: AtomicBool::new(false),
                events,
            }),
        };
        (form, receiver)
    }

    /// Snapshot of the current model.
    pub fn value(&self) -> Value {
        self.inner.model.lock().clone()
    }

    /// Reads the model value at `path`, honouring a getter override.
    pub fn get_value(&self, path: &str) -> Option<Value> {
        let model = self.inner.model.lock();
        update::read(&model, path, self.inner.config.getter.as_ref())
    }

    /// The full current error mapping.
    pub fn errors(&self) -> ErrorMap {
        self.inner.engine.errors()
    }

    /// Pushes a controlled model value. The caller is authoritative; no
    /// `ValueChanged` notification fires.
    pub fn set_value(&self, value: Value) {
        *self.inner.model.lock() = value;
    }

    /// Synchronizes externally supplied errors, replacing the store with
    /// the non-empty entries (scalars wrapped as lists).
    pub fn set_errors(&self, external: &IndexMap<String, MessageSet>) {
        self.inner.engine.sync(external);
    }

    /// Resolves the sub-schema shape at `path`.
    pub fn resolve_schema(&self, path: &str) -> Result<FieldKind, SchemaError> {
        self.inner.schema.read().reach(path)
    }

    /// Registers a field binding, resolving its widget shape once.
    ///
    /// An empty trigger list defaults to change-triggered validation.
    pub fn register(&self, path: &str, triggers: Vec<Trigger>) -> Result<FieldBinding, SchemaError> {
        let kind = self.resolve_schema(path)?;
        let binding = FieldBinding {
            path: path.to_string(),
            kind,
            triggers: if triggers.is_empty() {
                vec![Trigger::Change]
            } else {
                triggers
            },
        };
        self.inner
            .bindings
            .lock()
            .insert(path.to_string(), binding.clone());
        Ok(binding)
    }

    /// Applies a widget edit: reduces the payload into the model, notifies
    /// the value change, and queues change-triggered validation.
    pub fn handle_change(&self, path: &str, payload: Value, mapping: &ValueMapping) {
        if self.inner.is_closed() {
            return;
        }

        let written = {
            let mut model = self.inner.model.lock();
            let (next, written) = update::apply_edit(
                &model,
                path,
                payload,
                mapping,
                self.inner.config.setter.as_ref(),
            );
            *model = next.clone();
            drop(model);
            self.inner.notify(FormEvent::ValueChanged(next));
            written
        };

        if self.inner.touched.lock().insert(path.to_string()) {
            self.inner.notify(FormEvent::Touched {
                path: path.to_string(),
            });
        }

        if self.inner.config.no_validate || !self.inner.accepts_trigger(path, Trigger::Change) {
            return;
        }

        let request = ValidationRequest::new(written, Trigger::Change);
        self.inner.notify(FormEvent::Validating {
            paths: request.paths.clone(),
            trigger: request.trigger,
        });
        self.inner.queue.enqueue(request);
        self.flush_pending();
    }

    /// Requests validation outside the change flow (blur, explicit).
    ///
    /// Change-triggered requests are queued; every other trigger is
    /// processed immediately. Both routes debounce per path-set key.
    pub fn request_validation(&self, request: ValidationRequest) {
        if self.inner.is_closed() || self.inner.config.no_validate {
            return;
        }
        let paths: Vec<String> = request
            .paths
            .iter()
            .filter(|path| self.inner.accepts_trigger(path, request.trigger))
            .cloned()
            .collect();
        if paths.is_empty() {
            return;
        }
        let request = ValidationRequest {
            paths,
            ..request
        };
        self.inner.notify(FormEvent::Validating {
            paths: request.paths.clone(),
            trigger: request.trigger,
        });
        if request.trigger == Trigger::Change {
            self.inner.queue.enqueue(request);
            self.flush_pending();
        } else {
            Arc::clone(&self.inner).dispatch(request);
        }
    }

    /// Drains the pending queue in FIFO order, dispatching every request.
    pub fn flush_pending(&self) {
        for request in self.inner.queue.drain() {
            Arc::clone(&self.inner).dispatch(request);
        }
    }

    /// Swaps the schema collaborator and re-requests validation for every
    /// path currently carrying an error, plus anything still pending.
    pub fn set_schema(&self, schema: Arc<dyn Schema>) {
        *self.inner.schema.write() = schema;

        let mut paths = self.inner.queue.pending_paths();
        for path in self.inner.engine.errored_paths() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return;
        }
        self.inner
            .queue
            .enqueue(ValidationRequest::new(paths, Trigger::Explicit));
        self.flush_pending();
    }

    /// Validates the whole model, collecting every failure.
    ///
    /// Success notifies `Submitted`; failure replaces the displayed errors
    /// with the grouped per-path mapping. Never blocks future interaction.
    pub async fn submit(&self) {
        if self.inner.is_closed() {
            return;
        }
        let schema = self.inner.schema.read().clone();
        let model = self.inner.model.lock().clone();
        let options = ValidateOptions {
            strict: self.inner.config.strict,
            abort_early: false,
        };

        match schema.validate(&model, &options).await {
            Ok(report) if report.is_empty() => {
                self.inner.notify(FormEvent::Submitted(model));
            }
            Ok(report) => {
                let mut grouped = ErrorMap::new();
                for entry in report.inner {
                    grouped
                        .entry(entry.path)
                        .or_default()
                        .extend(entry.errors);
                }
                if self.inner.is_closed() {
                    return;
                }
                self.inner.engine.replace(grouped.clone());
                self.inner.notify(FormEvent::ErrorsChanged(grouped));
            }
            Err(fault) => self.inner.escalate(fault),
        }
    }

    /// Whether a message consumer subscribed to `paths` has an error.
    pub fn is_active(&self, paths: &[String], mode: MatchMode) -> bool {
        messages::is_active(paths, &self.inner.engine.errors(), mode)
    }

    /// Derived view for one field: validity, touched state, and the errors
    /// for the field and its descendants.
    pub fn meta(&self, path: &str) -> FieldMeta {
        let subscribed = vec![path.to_string()];
        let errors = messages::matching_errors(
            &subscribed,
            &self.inner.engine.errors(),
            MatchMode::Inclusive,
        );
        let valid = errors.is_empty();
        FieldMeta {
            valid,
            invalid: !valid,
            touched: self.inner.touched.lock().contains(path),
            errors,
        }
    }

    /// Applies a field-level error report: the field's entries are replaced
    /// by the supplied mapping, all other entries are preserved, and the
    /// complete resulting mapping is notified.
    pub fn report_field_errors(
        &self,
        field_paths: &[String],
        supplied: &IndexMap<String, MessageSet>,
    ) {
        let next = messages::apply_field_report(&self.inner.engine.errors(), field_paths, supplied);
        self.inner.engine.replace(next.clone());
        self.inner.notify(FormEvent::ErrorsChanged(next));
    }

    /// Paths that have been edited at least once.
    pub fn touched_paths(&self) -> Vec<String> {
        self.inner.touched.lock().iter().cloned().collect()
    }

    /// Tears the session down: cancels every pending debounce timer and
    /// prevents any later callback from touching state or notifying.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.timers.cancel_all();
    }
}

impl FormInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn notify(&self, event: FormEvent) {
        // Receiver gone means nobody is listening; that is fine.
        let _ = self.events.send(event);
    }

    fn escalate(&self, fault: SchemaError) {
        if self.is_closed() {
            return;
        }
        error!(%fault, "schema collaborator failed during validation");
        self.notify(FormEvent::Fault(fault));
    }

    fn accepts_trigger(&self, path: &str, trigger: Trigger) -> bool {
        match self.bindings.lock().get(path) {
            Some(binding) => binding.triggers.contains(&trigger),
            None => true,
        }
    }

    /// Schedules a request behind its debounce timer, superseding any
    /// pending timer for the same key.
    fn dispatch(self: Arc<Self>, request: ValidationRequest) {
        if self.is_closed() {
            return;
        }
        let paths = messages::reduce(&request.paths);
        let key = messages::debounce_key(&paths);
        let delay = self.config.delay;
        debug!(%key, ?delay, "debouncing validation request");

        let inner = Arc::clone(&self);
        let request = ValidationRequest { paths, ..request };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.run_validation(request).await;
        });
        self.timers.arm(key, handle);
    }

    async fn run_validation(self: Arc<Self>, request: ValidationRequest) {
        if self.is_closed() {
            return;
        }
        let schema = self.schema.read().clone();
        let model = self.model.lock().clone();
        let ambient = ValidateOptions {
            strict: self.config.strict,
            abort_early: true,
        };
        let options = ambient.merge(&request.overrides);

        let outcome = self
            .engine
            .validate(
                schema.as_ref(),
                &model,
                &request.paths,
                self.config.getter.as_ref(),
                &options,
            )
            .await;

        match outcome {
            Ok(results) => {
                if self.is_closed() {
                    return;
                }
                self.engine.commit(results);
                self.notify(FormEvent::ErrorsChanged(self.engine.errors()));
            }
            Err(fault) => self.escalate(fault),
        }
    }
}
