mod controller;
mod messages;
mod scheduler;
mod store;
mod update;
mod validator;

pub use controller::{FieldBinding, FieldMeta, Form, FormConfig, FormEvent};
pub use messages::MatchMode;
pub use scheduler::{Trigger, ValidationRequest};
pub use store::{ErrorMap, MessageSet};
pub use update::{FieldSource, Getter, PayloadFn, Setter, ValueMapping};
