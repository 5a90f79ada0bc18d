//! Shard topology & connection fabric (§4.1-§4.4): the live map of
//! shards → nodes, a pooled async connection per node, the hash-based
//! shard router.

pub mod connection;
pub mod endpoint;
pub mod hash;
pub mod manager;
pub mod node;
pub mod node_map;
pub mod pool;
pub mod router;
pub mod shard;
pub mod tls;
pub mod topology;

pub use connection::Connection;
pub use endpoint::Endpoint;
pub use manager::{TopologyDiff, TopologyManager};
pub use node::{Node, NodeFlags, NodeId};
pub use node_map::NodeMap;
pub use pool::ConnectionPool;
pub use router::{CoordinationStrategy, SelectFilter, ShardRouter};
pub use shard::Shard;
pub use topology::{parse_topology, Topology};
