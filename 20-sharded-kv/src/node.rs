//! A single shard of the store.
//!
//! A [`Node`] is an isolated key-value map. It never references the store or
//! any other node; the store decides which node a key belongs to.

use std::collections::BTreeMap;

use crate::placement::NodeId;

/// One shard of the key-value store.
///
/// Backed by a `BTreeMap` so `STATUS` output and snapshots list keys in a
/// stable order. A node has no locking of its own; whoever owns it serializes
/// access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    data: BTreeMap<String, String>,
}

impl Node {
    /// Creates an empty node.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Retrieves the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Stores a key-value pair, overwriting any existing value.
    pub fn set(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    /// Removes `key` and returns its previous value.
    ///
    /// Removing a key that is not present is a no-op.
    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.data.remove(key)
    }

    /// Writes every pair into this node, overwriting on collision.
    ///
    /// Keys that exist here but not in `entries` are left untouched.
    pub fn merge<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.data.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over all pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy of all key-value pairs.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut node = Node::new(NodeId(0));

        node.set("name".to_string(), "John".to_string());
        assert_eq!(node.get("name"), Some("John"));

        assert_eq!(node.delete("name"), Some("John".to_string()));
        assert_eq!(node.get("name"), None);
    }

    #[test]
    fn test_set_overwrites() {
        let mut node = Node::new(NodeId(0));
        node.set("k".to_string(), "v1".to_string());
        node.set("k".to_string(), "v2".to_string());

        assert_eq!(node.get("k"), Some("v2"));
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let mut node = Node::new(NodeId(0));
        node.set("keep".to_string(), "me".to_string());
        let before = node.clone();

        assert_eq!(node.delete("missing"), None);
        assert_eq!(node, before);
    }

    #[test]
    fn test_merge_overwrites_but_never_removes() {
        let mut node = Node::new(NodeId(1));
        node.set("shared".to_string(), "old".to_string());
        node.set("local".to_string(), "stays".to_string());

        node.merge([
            ("shared".to_string(), "new".to_string()),
            ("extra".to_string(), "added".to_string()),
        ]);

        assert_eq!(node.get("shared"), Some("new"));
        assert_eq!(node.get("local"), Some("stays"));
        assert_eq!(node.get("extra"), Some("added"));
        assert_eq!(node.len(), 3);
    }

    #[test]
    fn test_entries_are_sorted() {
        let mut node = Node::new(NodeId(0));
        node.set("b".to_string(), "2".to_string());
        node.set("a".to_string(), "1".to_string());

        let keys: Vec<&str> = node.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
