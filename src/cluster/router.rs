//! Shard router: hash key → slot → shard → node (§4.3).

use rand::seq::IteratorRandom;

use super::node::Node;
use super::node_map::NodeMap;
use super::shard::Shard;
use super::topology::Topology;
use crate::error::{Error, Result};
use crate::multiplex::command::Command;

/// Routing preference among shard replicas (glossary: "Coordination
/// strategy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationStrategy {
    /// Prefer the node sharing the host with `Self`.
    Local,
    /// Prefer any node on a different host than `Self`.
    Remote,
    /// Pick a uniformly random node.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectFilter {
    pub masters_only: bool,
}

pub struct ShardRouter<'a> {
    topology: &'a Topology,
    self_host: Option<&'a str>,
}

impl<'a> ShardRouter<'a> {
    pub fn new(topology: &'a Topology, self_host: Option<&'a str>) -> Self {
        Self { topology, self_host }
    }

    /// Compute the target slot for `cmd` (§4.3 step 1-3).
    pub fn target_slot(&self, cmd: &Command) -> Result<u32> {
        if let Some(slot) = cmd.target_slot {
            return Ok(slot);
        }
        let key_arg = cmd
            .sharding_key_arg()
            .ok_or_else(|| Error::Generic("command has no sharding-key argument".into()))?;
        let key = super::hash::sharding_key(key_arg);
        Ok(super::hash::slot_for_key(
            self.topology.hash_function,
            key,
            self.topology.num_slots,
        ))
    }

    pub fn find_shard(&self, slot: u32) -> Option<&'a Shard> {
        self.topology.find_shard(slot)
    }

    /// Pick a node within `shard` per `strategy`/`filter`; `None` if no node
    /// matches (e.g. an empty shard, Open Question #3).
    pub fn select_node(
        &self,
        shard: &'a Shard,
        strategy: CoordinationStrategy,
        filter: SelectFilter,
    ) -> Option<&'a Node> {
        let candidates: Vec<&Node> = shard
            .nodes
            .iter()
            .filter(|n| !filter.masters_only || n.is_master())
            .collect();

        if candidates.is_empty() {
            return None;
        }

        match strategy {
            CoordinationStrategy::Local => {
                let host = self.self_host?;
                candidates
                    .iter()
                    .find(|n| n.endpoint.host.eq_ignore_ascii_case(host))
                    .copied()
                    .or_else(|| candidates.first().copied())
            }
            CoordinationStrategy::Remote => {
                let host = self.self_host;
                candidates
                    .iter()
                    .find(|n| host.map(|h| !n.endpoint.host.eq_ignore_ascii_case(h)).unwrap_or(true))
                    .copied()
                    .or_else(|| candidates.first().copied())
            }
            CoordinationStrategy::Flat => {
                if filter.masters_only {
                    candidates.first().copied()
                } else {
                    let mut rng = rand::rng();
                    candidates.into_iter().choose(&mut rng)
                }
            }
        }
    }

    /// Route + select in one step, as `SendCommand` composes before
    /// dispatch.
    pub fn route(
        &self,
        cmd: &Command,
        strategy: CoordinationStrategy,
        filter: SelectFilter,
    ) -> Result<&'a Node> {
        let slot = self.target_slot(cmd)?;
        let shard = self.find_shard(slot).ok_or(Error::NoRoute)?;
        self.select_node(shard, strategy, filter).ok_or(Error::NoNode)
    }

    /// The node-map iterator `FanoutCommand` draws from for `strategy`:
    /// `Local` fans out only to the node map's local-host slice, every
    /// other strategy fans out to all nodes (§4.3).
    pub fn fanout_targets<'b>(
        &self,
        node_map: &'b NodeMap,
        strategy: CoordinationStrategy,
    ) -> Vec<&'b Node> {
        match strategy {
            CoordinationStrategy::Local => match self.self_host {
                Some(host) => node_map.iterate_host(host).collect(),
                None => Vec::new(),
            },
            _ => node_map.iterate_all().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{
        endpoint::Endpoint,
        hash::HashFunction,
        node::{NodeFlags, NodeId},
    };
    use crate::multiplex::command::Command;

    fn sample_topology() -> Topology {
        let n0 = Node::new(NodeId::from("n0"), Endpoint::new("host-a", 7000), NodeFlags::MASTER);
        let n1 = Node::new(NodeId::from("n1"), Endpoint::new("host-b", 7000), NodeFlags::empty());
        Topology {
            my_id: Some(NodeId::from("n0")),
            num_slots: 16384,
            hash_function: HashFunction::Crc16,
            shards: vec![
                Shard::new(0, 8191, vec![n0]),
                Shard::new(8192, 16383, vec![n1]),
            ],
            last_update_seq: 0,
        }
    }

    #[test]
    fn select_node_local_prefers_self_host() {
        let topo = sample_topology();
        let router = ShardRouter::new(&topo, Some("host-a"));
        let n0 = Node::new(NodeId::from("n0"), Endpoint::new("host-a", 1), NodeFlags::empty());
        let n1 = Node::new(NodeId::from("n1"), Endpoint::new("host-b", 1), NodeFlags::empty());
        let shard = Shard::new(0, 100, vec![n0, n1]);
        let picked = router
            .select_node(&shard, CoordinationStrategy::Local, SelectFilter::default())
            .unwrap();
        assert_eq!(picked.endpoint.host, "host-a");
    }

    #[test]
    fn select_node_returns_none_for_empty_shard() {
        let topo = sample_topology();
        let router = ShardRouter::new(&topo, Some("host-a"));
        let shard = Shard::new(0, 100, vec![]);
        assert!(router
            .select_node(&shard, CoordinationStrategy::Flat, SelectFilter::default())
            .is_none());
    }

    #[test]
    fn route_end_to_end() {
        let topo = sample_topology();
        let router = ShardRouter::new(&topo, Some("host-a"));
        let cmd = Command::new(vec!["SET".into(), "foo{abc}".into(), "v".into()], 1);
        let node = router
            .route(&cmd, CoordinationStrategy::Flat, SelectFilter::default())
            .unwrap();
        assert!(node.id.0 == "n0" || node.id.0 == "n1");
    }

    #[test]
    fn route_with_pinned_slot_bypasses_hashing() {
        let topo = sample_topology();
        let router = ShardRouter::new(&topo, Some("host-a"));
        let mut cmd = Command::new(vec!["SET".into(), "x".into(), "v".into()], 1);
        cmd.target_slot = Some(9000);
        let node = router
            .route(&cmd, CoordinationStrategy::Flat, SelectFilter::default())
            .unwrap();
        assert_eq!(node.id.0, "n1");
    }
}
