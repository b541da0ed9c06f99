//! Error types for store operations.

use crate::placement::NodeId;

/// Errors returned by [`ShardedStore`](crate::store::ShardedStore) and
/// [`SharedStore`](crate::shared::SharedStore).
///
/// Lookup misses are not errors: `get` yields `None` and deleting an absent
/// key succeeds silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A keyed operation was attempted before any node was added.
    #[error("no nodes available: add a node before using keys")]
    NoNodes,

    /// The node index does not exist in this store.
    #[error("unknown node {id}: store has {count} nodes")]
    UnknownNode {
        /// The index that was requested.
        id: NodeId,
        /// Number of nodes at the time of the request.
        count: usize,
    },
}
