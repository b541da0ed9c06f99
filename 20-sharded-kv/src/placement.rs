//! Key placement and the replication source role.
//!
//! Placement is length-based: a key lands on node `key.len() % node_count`.
//! Two keys of equal byte length always share a node, and so do keys whose
//! lengths differ by a multiple of the node count. Placement must stay
//! length-based; tests and callers depend on this co-location.

use std::fmt;

use serde::Serialize;

use crate::error::StoreError;

/// Index of a node within a store, assigned in the order nodes are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the index of the node responsible for `key`.
///
/// Uses the UTF-8 byte length of the key. Fails with [`StoreError::NoNodes`]
/// instead of dividing by zero when the store is empty.
pub fn shard_for(key: &str, node_count: usize) -> Result<usize, StoreError> {
    if node_count == 0 {
        return Err(StoreError::NoNodes);
    }
    Ok(key.len() % node_count)
}

/// Which node acts as the authoritative side of a replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationSource {
    /// The most recently added node. The source moves whenever a node is added.
    #[default]
    Newest,
    /// A designated node that keeps the role regardless of later additions.
    Pinned(NodeId),
}

impl ReplicationSource {
    /// Resolves the role to a concrete node for a store of `node_count` nodes.
    pub fn resolve(self, node_count: usize) -> Result<NodeId, StoreError> {
        match self {
            ReplicationSource::Newest => node_count
                .checked_sub(1)
                .map(NodeId)
                .ok_or(StoreError::NoNodes),
            ReplicationSource::Pinned(id) if id.0 < node_count => Ok(id),
            ReplicationSource::Pinned(id) => Err(StoreError::UnknownNode {
                id,
                count: node_count,
            }),
        }
    }
}

/// Checks that `id` names an existing node before it is pinned as the source.
pub(crate) fn validate_node(id: NodeId, node_count: usize) -> Result<(), StoreError> {
    if id.0 < node_count {
        Ok(())
    } else {
        Err(StoreError::UnknownNode {
            id,
            count: node_count,
        })
    }
}
