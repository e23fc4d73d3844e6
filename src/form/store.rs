//! Path-keyed error storage.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Mapping from field path to its failure messages.
pub type ErrorMap = IndexMap<String, Vec<String>>;

/// One message or several, as supplied by external callers.
///
/// Scalar inputs are wrapped into a list when they enter the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageSet {
    One(String),
    Many(Vec<String>),
}

impl MessageSet {
    pub fn into_list(self) -> Vec<String> {
        match self {
            MessageSet::One(message) => vec![message],
            MessageSet::Many(messages) => messages,
        }
    }
}

impl From<&str> for MessageSet {
    fn from(message: &str) -> Self {
        MessageSet::One(message.to_string())
    }
}

/// The current error state of a form.
///
/// A path is present only while it has at least one message. The store is
/// written through two channels: a full external sync, and path-scoped
/// merges from completed validation passes.
#[derive(Debug, Default)]
pub struct ErrorStore {
    entries: ErrorMap,
}

impl ErrorStore {
    /// Replaces the whole store with the non-empty external entries.
    pub fn sync(&mut self, external: &IndexMap<String, MessageSet>) {
        self.entries.clear();
        for (path, messages) in external {
            let list = messages.clone().into_list();
            if !list.is_empty() {
                self.entries.insert(path.clone(), list);
            }
        }
    }

    /// Records the outcome of validating one path.
    ///
    /// An empty message list clears the entry; other paths are untouched.
    pub fn merge_validated(&mut self, path: &str, messages: Vec<String>) {
        if messages.is_empty() {
            self.entries.shift_remove(path);
        } else {
            self.entries.insert(path.to_string(), messages);
        }
    }

    /// Replaces the whole store with an already-grouped mapping.
    ///
    /// Used by submit, where the result is an authoritative full
    /// revalidation rather than a merge.
    pub fn replace(&mut self, entries: ErrorMap) {
        self.entries = entries
            .into_iter()
            .filter(|(_, messages)| !messages.is_empty())
            .collect();
    }

    /// A copy of the full current mapping.
    pub fn snapshot(&self) -> ErrorMap {
        self.entries.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
