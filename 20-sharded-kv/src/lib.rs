//! In-memory key-value store sharded across logical nodes.
//!
//! All nodes live in one process. Each key is placed on exactly one node by
//! a length-based placement function, and a replication pass can push one
//! node's entries into every other node.
//!
//! # Architecture
//!
//! - A single command loop reads a line, runs it against the store and writes
//!   the reply before reading the next line. The store is owned by that loop,
//!   so it needs no locks.
//! - Nodes never talk to each other or to the store. Routing and replication
//!   are the store's job.
//! - A lock-based variant ([`shared::SharedStore`]) offers the same operations
//!   to concurrent tasks.
//!
//! # Modules
//!
//! - [`placement`]: Key routing and the replication source role
//! - [`node`]: A single shard's key-value map
//! - [`store`]: Single-owner store: routing, CRUD, replication
//! - [`shared`]: Concurrent store handle with per-node locks
//! - [`protocol`]: REPL command parsing
//! - [`shell`]: Command execution, reply text and the line loop
//! - [`cli`]: Command-line flags for the binary
//! - [`error`]: Store error type

pub mod cli;
pub mod error;
pub mod node;
pub mod placement;
pub mod protocol;
pub mod shared;
pub mod shell;
pub mod store;

pub use error::StoreError;
pub use node::Node;
pub use placement::{NodeId, ReplicationSource};
pub use shared::SharedStore;
pub use store::{ReplicationReport, ShardedStore, StoreSnapshot};
