//! Concurrent variant of the sharded store.
//!
//! [`SharedStore`] is a cloneable handle that many tasks may use at once.
//! Locks are always taken in the same order: the topology lock (which owns
//! the node list and the replication role) first, then node locks in
//! increasing index order. Replication never holds two node locks at the
//! same time.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::node::Node;
use crate::placement::{NodeId, ReplicationSource, shard_for, validate_node};
use crate::store::{NodeSnapshot, ReplicationReport, StoreSnapshot};

type NodeHandle = Arc<Mutex<Node>>;

#[derive(Default)]
struct Topology {
    nodes: Vec<NodeHandle>,
    source: ReplicationSource,
}

impl Topology {
    fn route(&self, key: &str) -> Result<&NodeHandle, StoreError> {
        let index = shard_for(key, self.nodes.len())?;
        Ok(&self.nodes[index])
    }
}

/// Thread-safe handle to a sharded store.
///
/// Cloning the handle shares the same nodes.
#[derive(Clone, Default)]
pub struct SharedStore {
    topology: Arc<RwLock<Topology>>,
}

impl SharedStore {
    /// Creates a store with no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `count` empty nodes.
    pub fn with_nodes(count: usize) -> Self {
        let nodes = (0..count)
            .map(|i| Arc::new(Mutex::new(Node::new(NodeId(i)))))
            .collect();
        Self {
            topology: Arc::new(RwLock::new(Topology {
                nodes,
                source: ReplicationSource::Newest,
            })),
        }
    }

    /// Appends a new empty node and returns its id.
    pub async fn add_node(&self) -> NodeId {
        let mut topology = self.topology.write().await;
        let id = NodeId(topology.nodes.len());
        topology.nodes.push(Arc::new(Mutex::new(Node::new(id))));
        info!(node = %id, count = topology.nodes.len(), "node added");
        id
    }

    pub async fn node_count(&self) -> usize {
        self.topology.read().await.nodes.len()
    }

    pub async fn route_id(&self, key: &str) -> Result<NodeId, StoreError> {
        let topology = self.topology.read().await;
        shard_for(key, topology.nodes.len()).map(NodeId)
    }

    pub async fn put(&self, key: String, value: String) -> Result<(), StoreError> {
        let topology = self.topology.read().await;
        let mut node = topology.route(&key)?.lock().await;
        debug!(node = %node.id(), key = %key, "put");
        node.set(key, value);
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let topology = self.topology.read().await;
        let node = topology.route(key)?.lock().await;
        debug!(node = %node.id(), key, "get");
        Ok(node.get(key).map(str::to_string))
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let topology = self.topology.read().await;
        let mut node = topology.route(key)?.lock().await;
        debug!(node = %node.id(), key, "delete");
        node.delete(key);
        Ok(())
    }

    pub async fn replication_source(&self) -> ReplicationSource {
        self.topology.read().await.source
    }

    /// Designates `id` as the replication source.
    pub async fn pin_source(&self, id: NodeId) -> Result<(), StoreError> {
        let mut topology = self.topology.write().await;
        validate_node(id, topology.nodes.len())?;
        topology.source = ReplicationSource::Pinned(id);
        info!(node = %id, "replication source pinned");
        Ok(())
    }

    /// Makes the most recently added node the replication source again.
    pub async fn follow_newest(&self) {
        self.topology.write().await.source = ReplicationSource::Newest;
        info!("replication source follows newest node");
    }

    /// Pushes every entry of the source node into all other nodes.
    ///
    /// Same merge semantics as [`ShardedStore::replicate`](crate::store::ShardedStore::replicate).
    /// The topology read lock is held for the whole pass so no node can be
    /// added halfway through. The source is snapshotted and released before
    /// any target is locked.
    pub async fn replicate(&self) -> Result<Option<ReplicationReport>, StoreError> {
        let topology = self.topology.read().await;
        if topology.nodes.len() < 2 {
            debug!(count = topology.nodes.len(), "replication skipped");
            return Ok(None);
        }

        let source = topology.source.resolve(topology.nodes.len())?;
        let entries = topology.nodes[source.index()].lock().await.snapshot();

        let mut targets = 0;
        for (index, handle) in topology.nodes.iter().enumerate() {
            if index == source.index() {
                continue;
            }
            let mut node = handle.lock().await;
            node.merge(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            targets += 1;
        }

        Ok(Some(ReplicationReport::new(source, entries.len(), targets)))
    }

    /// Copies the current contents of every node, locking them one at a time.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let topology = self.topology.read().await;
        let mut nodes = Vec::with_capacity(topology.nodes.len());
        for handle in &topology.nodes {
            let node = handle.lock().await;
            nodes.push(NodeSnapshot {
                id: node.id(),
                entries: node.snapshot(),
            });
        }
        StoreSnapshot {
            source: topology.source,
            nodes,
        }
    }
}
