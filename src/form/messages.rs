//! Active-field matching and field-level error reconciliation.
//!
//! Message consumers subscribe to one or more field paths and ask whether
//! they are "active", meaning the store holds an error they should show.
//! Inclusive matching counts descendant paths; exclusive matching counts
//! exact paths only.

use indexmap::IndexMap;

use crate::path;

use super::store::{ErrorMap, MessageSet};

/// How stored error paths are matched against a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The subscribed path itself or any strict descendant counts.
    #[default]
    Inclusive,
    /// Only exact path matches count.
    Exclusive,
}

/// Whether `candidate` sits strictly below `ancestor` by path segments.
pub fn is_descendant(ancestor: &str, candidate: &str) -> bool {
    let ancestor = path::split(ancestor);
    let candidate = path::split(candidate);
    candidate.len() > ancestor.len() && candidate[..ancestor.len()] == ancestor[..]
}

fn matches(subscribed: &str, stored: &str, mode: MatchMode) -> bool {
    if subscribed == stored {
        return true;
    }
    mode == MatchMode::Inclusive && is_descendant(subscribed, stored)
}

/// Whether any stored error path matches the subscription.
pub fn is_active(subscribed: &[String], store: &ErrorMap, mode: MatchMode) -> bool {
    store
        .keys()
        .any(|stored| subscribed.iter().any(|field| matches(field, stored, mode)))
}

/// The store entries matching a subscription.
pub fn matching_errors(subscribed: &[String], store: &ErrorMap, mode: MatchMode) -> ErrorMap {
    store
        .iter()
        .filter(|(stored, _)| subscribed.iter().any(|field| matches(field, stored, mode)))
        .map(|(stored, messages)| (stored.clone(), messages.clone()))
        .collect()
}

/// Reduces a path set to its covering ancestors.
///
/// A path already covered by another entry in the set (its strict
/// descendant) is dropped; duplicates collapse. First-seen order is kept.
pub fn reduce(paths: &[String]) -> Vec<String> {
    let mut reduced: Vec<String> = Vec::new();
    for candidate in paths {
        if reduced
            .iter()
            .any(|kept| kept == candidate || is_descendant(kept, candidate))
        {
            continue;
        }
        reduced.retain(|kept| !is_descendant(candidate, kept));
        reduced.push(candidate.clone());
    }
    reduced
}

/// The order-stable debounce key for a request's path set.
pub fn debounce_key(paths: &[String]) -> String {
    let mut reduced = reduce(paths);
    reduced.sort_unstable();
    reduced.join("-")
}

/// Applies a field-level error report against the full store.
///
/// Entries matching the reporting field (inclusively) are replaced by the
/// supplied mapping; everything else is preserved. An empty report simply
/// clears the field's entries.
pub fn apply_field_report(
    current: &ErrorMap,
    field_paths: &[String],
    supplied: &IndexMap<String, MessageSet>,
) -> ErrorMap {
    let mut next: ErrorMap = current
        .iter()
        .filter(|(stored, _)| {
            !field_paths
                .iter()
                .any(|field| matches(field, stored, MatchMode::Inclusive))
        })
        .map(|(stored, messages)| (stored.clone(), messages.clone()))
        .collect();

    for (stored, messages) in supplied {
        let list = messages.clone().into_list();
        if !list.is_empty() {
            next.insert(stored.clone(), list);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, &str)]) -> ErrorMap {
        entries
            .iter()
            .map(|(stored, message)| (stored.to_string(), vec![message.to_string()]))
            .collect()
    }

    #[test]
    fn inclusive_matching_counts_descendants() {
        let errors = store(&[("name.first", "required")]);
        let subscribed = vec!["name".to_string()];
        assert!(is_active(&subscribed, &errors, MatchMode::Inclusive));
        assert!(!is_active(&subscribed, &errors, MatchMode::Exclusive));
    }

    #[test]
    fn exclusive_matching_still_sees_exact_paths() {
        let errors = store(&[("name", "required")]);
        let subscribed = vec!["name".to_string()];
        assert!(is_active(&subscribed, &errors, MatchMode::Exclusive));
    }

    #[test]
    fn prefix_matching_is_by_segment_not_substring() {
        let errors = store(&[("names", "bad")]);
        let subscribed = vec!["name".to_string()];
        assert!(!is_active(&subscribed, &errors, MatchMode::Inclusive));
    }

    #[test]
    fn reduce_keeps_covering_ancestors_only() {
        let paths = vec![
            "name.first".to_string(),
            "name".to_string(),
            "age".to_string(),
            "name.last".to_string(),
            "age".to_string(),
        ];
        assert_eq!(reduce(&paths), vec!["name".to_string(), "age".to_string()]);
    }

    #[test]
    fn debounce_key_is_order_stable() {
        let forward = vec!["b".to_string(), "a".to_string()];
        let backward = vec!["a".to_string(), "b".to_string()];
        assert_eq!(debounce_key(&forward), debounce_key(&backward));
        assert_eq!(debounce_key(&forward), "a-b");
    }

    #[test]
    fn field_report_replaces_own_entries_and_keeps_the_rest() {
        let current = store(&[("name", "foo"), ("bar", "baz")]);
        let field = vec!["name".to_string()];

        // removal
        let next = apply_field_report(&current, &field, &IndexMap::new());
        assert_eq!(next, store(&[("bar", "baz")]));

        // replacement with a descendant path
        let mut supplied = IndexMap::new();
        supplied.insert("name.first".to_string(), MessageSet::from("baz"));
        let next = apply_field_report(&current, &field, &supplied);
        assert_eq!(next, store(&[("bar", "baz"), ("name.first", "baz")]));

        // update that re-supplies the field's own entry
        let mut supplied = IndexMap::new();
        supplied.insert("name".to_string(), MessageSet::from("foo"));
        supplied.insert("name.first".to_string(), MessageSet::from("baz"));
        let next = apply_field_report(&current, &field, &supplied);
        assert_eq!(
            next,
            store(&[("bar", "baz"), ("name", "foo"), ("name.first", "baz")])
        );
    }
}
