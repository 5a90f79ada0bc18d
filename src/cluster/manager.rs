//! Topology manager: diff-and-apply topology updates, plus periodic
//! refresh (§4.4).

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::node::NodeId;
use super::node_map::NodeMap;
use super::pool::ConnectionPool;
use super::topology::Topology;
use crate::error::{Error, Result};

/// Summary of what changed in an `UpdateTopology` call (SPEC_FULL §B).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyDiff {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
}

/// Default periodic refresh interval (§4.4).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
/// Default validation timeout; `0` disables the wait entirely (Open
/// Question #2, resolved in SPEC_FULL §D.2).
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_millis(30_000);

pub struct TopologyManager {
    topology: RwLock<Topology>,
    node_map: RwLock<NodeMap>,
    pool: RwLock<ConnectionPool>,
    self_node: RwLock<Option<NodeId>>,
    last_update: RwLock<Option<Instant>>,
    first_topology_at: RwLock<Option<Instant>>,
    validation_timeout: Duration,
}

impl TopologyManager {
    pub fn new(conns_per_node: usize, validation_timeout: Duration) -> Self {
        Self {
            topology: RwLock::new(Topology::default()),
            node_map: RwLock::new(NodeMap::new()),
            pool: RwLock::new(ConnectionPool::new(conns_per_node)),
            self_node: RwLock::new(None),
            last_update: RwLock::new(None),
            first_topology_at: RwLock::new(None),
            validation_timeout,
        }
    }

    pub fn current(&self) -> Topology {
        self.topology.read().clone()
    }

    /// Diff `new` against the current node set, upsert the connection pool
    /// and node map, disconnect stale nodes, and replace the topology
    /// atomically (§4.4).
    pub fn update_topology(&self, new: Topology) -> Result<TopologyDiff> {
        if !new.is_valid() {
            // Rejected topologies leave the prior one intact.
            return Err(Error::Generic("invalid topology".into()));
        }

        let mut old_ids: std::collections::HashSet<NodeId> =
            self.node_map.read().ids().cloned().collect();

        let mut node_map = NodeMap::new();
        let mut pool = self.pool.write();
        let mut added = 0;
        let mut kept = 0;
        let mut self_node = None;

        for shard in &new.shards {
            for node in &shard.nodes {
                let already_known = old_ids.remove(&node.id);
                if already_known {
                    kept += 1;
                } else {
                    added += 1;
                }
                pool.add(node.id.clone(), node.endpoint.clone(), true);
                node_map.insert(node.clone());
                if node.is_self() {
                    self_node = Some(node.id.clone());
                }
            }
        }

        let removed = old_ids.len();
        for id in &old_ids {
            pool.disconnect(id);
        }

        *self.node_map.write() = node_map;
        *self.self_node.write() = self_node;

        let mut topology = new;
        topology.last_update_seq = self.topology.read().last_update_seq + 1;
        *self.topology.write() = topology;
        *self.last_update.write() = Some(Instant::now());
        if self.first_topology_at.read().is_none() {
            *self.first_topology_at.write() = Some(Instant::now());
        }

        info!(added, removed, kept, "topology updated");
        Ok(TopologyDiff {
            added,
            removed,
            kept,
        })
    }

    pub fn node_map(&self) -> NodeMap {
        self.node_map.read().clone()
    }

    pub fn self_host(&self) -> Option<String> {
        let id = self.self_node.read().clone()?;
        self.node_map.read().get(&id).map(|n| n.endpoint.host.clone())
    }

    /// Whether a query submitted now should wait for a topology-consistent
    /// state, or be served against the current (possibly partial) one.
    ///
    /// `validation_timeout == 0` means "wait forever" (disabled) per
    /// SPEC_FULL §D.2; otherwise, once `validation_timeout` has elapsed
    /// since the first topology was received, queries are served
    /// immediately even if updates are still pending.
    pub fn should_wait_for_topology(&self) -> bool {
        if self.validation_timeout.is_zero() {
            return self.node_map.read().is_empty();
        }
        match *self.first_topology_at.read() {
            None => true,
            Some(first) => first.elapsed() < self.validation_timeout,
        }
    }
}

/// Spawn the periodic topology-refresh task (§4.4). `poll` fetches the raw
/// topology text from the host; if it differs from the current one
/// (checked at the text level by the caller, before parsing), `manager`
/// applies it.
pub async fn run_periodic_refresh<F, Fut>(
    manager: Arc<TopologyManager>,
    interval: Duration,
    poll: F,
) where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Topology>>,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match poll().await {
            Ok(topology) => {
                if let Err(e) = manager.update_topology(topology) {
                    tracing::warn!(error = %e, "topology refresh rejected");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "topology refresh failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{
        endpoint::Endpoint,
        hash::HashFunction,
        node::{Node, NodeFlags, NodeId},
        shard::Shard,
    };

    fn topology_with(ids: &[&str]) -> Topology {
        let shards = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let n = Node::new(
                    NodeId::from(*id),
                    Endpoint::new("h", 7000 + i as u16),
                    NodeFlags::MASTER,
                );
                Shard::new(i as u32 * 100, (i as u32 + 1) * 100 - 1, vec![n])
            })
            .collect();
        Topology {
            my_id: None,
            num_slots: (ids.len() as u32) * 100,
            hash_function: HashFunction::Crc16,
            shards,
            last_update_seq: 0,
        }
    }

    #[test]
    fn update_topology_diffs_added_removed_kept() {
        let mgr = TopologyManager::new(1, Duration::from_millis(0));
        let d1 = mgr.update_topology(topology_with(&["a", "b"])).unwrap();
        assert_eq!(d1, TopologyDiff { added: 2, removed: 0, kept: 0 });

        let d2 = mgr.update_topology(topology_with(&["b", "c"])).unwrap();
        assert_eq!(d2, TopologyDiff { added: 1, removed: 1, kept: 1 });
    }

    #[test]
    fn repeated_update_is_idempotent_beyond_seq_bump() {
        let mgr = TopologyManager::new(1, Duration::from_millis(0));
        mgr.update_topology(topology_with(&["a"])).unwrap();
        let seq1 = mgr.current().last_update_seq;
        mgr.update_topology(topology_with(&["a"])).unwrap();
        let seq2 = mgr.current().last_update_seq;
        assert_eq!(seq2, seq1 + 1);
        assert_eq!(mgr.current().num_shards(), 1);
    }

    #[test]
    fn invalid_topology_is_rejected_and_prior_kept() {
        let mgr = TopologyManager::new(1, Duration::from_millis(0));
        mgr.update_topology(topology_with(&["a"])).unwrap();
        let mut bad = topology_with(&["b"]);
        bad.num_slots = 0;
        assert!(mgr.update_topology(bad).is_err());
        assert_eq!(mgr.current().shards[0].nodes[0].id.0, "a");
    }

    #[test]
    fn validation_timeout_zero_waits_until_any_topology_seen() {
        let mgr = TopologyManager::new(1, Duration::from_millis(0));
        assert!(mgr.should_wait_for_topology());
        mgr.update_topology(topology_with(&["a"])).unwrap();
        assert!(!mgr.should_wait_for_topology());
    }
}
