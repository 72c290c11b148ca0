//! Visitation cache for one top-level save or load call.

use std::collections::{HashMap, HashSet};

use crate::record::Node;

/// Nodes already processed within one recursive save or load.
///
/// Nodes are keyed by instance identity, which works before an entity has a
/// key, and by `(entity, key)` once persisted, so two instances of the same
/// row are processed once. A visited node is skipped whatever depth budget
/// remains, so cyclic graphs terminate.
///
/// Scoped to a single call: never share one between concurrent calls.
#[derive(Debug, Default)]
pub struct Visited {
    instances: HashMap<usize, i64>,
    rows: HashSet<(&'static str, i64)>,
}

impl Visited {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances visited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing was visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.rows.is_empty()
    }

    /// Whether `node` was visited.
    #[must_use]
    pub fn contains(&self, node: &dyn Node) -> bool {
        self.instances.contains_key(&node.identity())
    }

    pub(crate) fn contains_row(&self, entity: &'static str, key: i64) -> bool {
        key > 0 && self.rows.contains(&(entity, key))
    }

    /// Mark an instance visited, along with its row once it has a key.
    pub(crate) fn record(&mut self, identity: usize, entity: &'static str, key: i64) {
        self.instances.insert(identity, key);
        if key > 0 {
            self.rows.insert((entity, key));
        }
    }

    /// Mark a row visited. Returns `false` if it already was.
    pub(crate) fn visit_row(&mut self, entity: &'static str, key: i64) -> bool {
        key <= 0 || self.rows.insert((entity, key))
    }

    /// Key of `node`, taken from the cache when the node was visited. Locks
    /// `node` briefly otherwise; the caller must hold no entity lock.
    pub(crate) fn key_of(&self, node: &dyn Node) -> i64 {
        self.instances
            .get(&node.identity())
            .copied()
            .unwrap_or_else(|| node.lock().primary_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_need_a_key() {
        let mut visited = Visited::new();
        visited.record(1, "Author", 0);
        assert_eq!(visited.len(), 1);
        assert!(!visited.contains_row("Author", 0));

        visited.record(2, "Author", 5);
        assert!(visited.contains_row("Author", 5));
        assert!(!visited.contains_row("Post", 5));
    }

    #[test]
    fn visit_row_once() {
        let mut visited = Visited::new();
        assert!(visited.visit_row("Tag", 3));
        assert!(!visited.visit_row("Tag", 3));
        // unsaved rows cannot be told apart, so they are always visited
        assert!(visited.visit_row("Tag", 0));
        assert!(visited.visit_row("Tag", 0));
    }
}
