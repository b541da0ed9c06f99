//! Single-owner sharded store.
//!
//! [`ShardedStore`] owns an ordered list of [`Node`]s and routes each key to
//! exactly one of them with [`shard_for`]. It is driven by one command loop,
//! so every mutation takes `&mut self` and no lock is involved. See
//! [`crate::shared::SharedStore`] for the variant that tolerates concurrent
//! callers.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::node::Node;
use crate::placement::{NodeId, ReplicationSource, shard_for, validate_node};

/// Outcome of a replication pass.
///
/// Only produced when the store had at least two nodes; with fewer the pass
/// is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Node whose entries were pushed.
    pub source: NodeId,
    /// Number of pairs read from the source.
    pub entries: usize,
    /// Number of nodes that received them.
    pub targets: usize,
}

impl ReplicationReport {
    /// Records a finished replication pass and logs it.
    pub fn new(source: NodeId, entries: usize, targets: usize) -> Self {
        info!(source = %source, entries, targets, "replicated");
        Self {
            source,
            entries,
            targets,
        }
    }
}

/// Point-in-time copy of a store's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    pub source: ReplicationSource,
    pub nodes: Vec<NodeSnapshot>,
}

/// Contents of a single node inside a [`StoreSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub entries: BTreeMap<String, String>,
}

/// In-memory key-value store partitioned across logical nodes.
#[derive(Debug, Default)]
pub struct ShardedStore {
    nodes: Vec<Node>,
    source: ReplicationSource,
}

impl ShardedStore {
    /// Creates a store with no nodes.
    ///
    /// Keyed operations fail with [`StoreError::NoNodes`] until
    /// [`add_node`](Self::add_node) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `count` empty nodes.
    pub fn with_nodes(count: usize) -> Self {
        let mut store = Self::new();
        for _ in 0..count {
            store.add_node();
        }
        store
    }

    /// Appends a new empty node and returns its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id));
        info!(node = %id, count = self.nodes.len(), "node added");
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Direct access to one node, bypassing routing.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Nodes in the order they were added.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the id of the node responsible for `key`.
    pub fn route_id(&self, key: &str) -> Result<NodeId, StoreError> {
        shard_for(key, self.nodes.len()).map(NodeId)
    }

    /// Returns the node responsible for `key`.
    pub fn route_key(&self, key: &str) -> Result<&Node, StoreError> {
        let index = shard_for(key, self.nodes.len())?;
        Ok(&self.nodes[index])
    }

    fn route_key_mut(&mut self, key: &str) -> Result<&mut Node, StoreError> {
        let index = shard_for(key, self.nodes.len())?;
        Ok(&mut self.nodes[index])
    }

    /// Stores a key-value pair on the node `key` routes to.
    pub fn put(&mut self, key: String, value: String) -> Result<(), StoreError> {
        let node = self.route_key_mut(&key)?;
        debug!(node = %node.id(), key = %key, "put");
        node.set(key, value);
        Ok(())
    }

    /// Looks `key` up on the node it routes to.
    ///
    /// Only that node is consulted, even if replication copied the key elsewhere.
    pub fn get(&self, key: &str) -> Result<Option<&str>, StoreError> {
        let node = self.route_key(key)?;
        debug!(node = %node.id(), key, "get");
        Ok(node.get(key))
    }

    /// Removes `key` from the node it routes to. Absent keys are ignored.
    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let node = self.route_key_mut(key)?;
        debug!(node = %node.id(), key, "delete");
        node.delete(key);
        Ok(())
    }

    pub fn replication_source(&self) -> ReplicationSource {
        self.source
    }

    /// Designates `id` as the replication source.
    pub fn pin_source(&mut self, id: NodeId) -> Result<(), StoreError> {
        validate_node(id, self.nodes.len())?;
        self.source = ReplicationSource::Pinned(id);
        info!(node = %id, "replication source pinned");
        Ok(())
    }

    /// Makes the most recently added node the replication source again.
    pub fn follow_newest(&mut self) {
        self.source = ReplicationSource::Newest;
        info!("replication source follows newest node");
    }

    /// Pushes every entry of the source node into all other nodes.
    ///
    /// Target keys with the same name are overwritten; target keys missing
    /// from the source are kept. Writes bypass routing, so afterwards a key
    /// may live on nodes `route_key` would never pick for it. Returns `None`
    /// when there are fewer than two nodes.
    pub fn replicate(&mut self) -> Result<Option<ReplicationReport>, StoreError> {
        if self.nodes.len() < 2 {
            debug!(count = self.nodes.len(), "replication skipped");
            return Ok(None);
        }

        let source = self.source.resolve(self.nodes.len())?;
        let entries = self.nodes[source.index()].snapshot();

        let mut targets = 0;
        for node in self.nodes.iter_mut().filter(|n| n.id() != source) {
            node.merge(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            targets += 1;
        }

        Ok(Some(ReplicationReport::new(source, entries.len(), targets)))
    }

    /// Copies the current contents of every node.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            source: self.source,
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSnapshot {
                    id: node.id(),
                    entries: node.snapshot(),
                })
                .collect(),
        }
    }
}
