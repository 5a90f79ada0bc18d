//! Command multiplexer: rewrite commands with shard tags, producing one
//! command per target partition (§4.5).

pub mod alias;
pub mod command;
pub mod generator;

use parking_lot::RwLock;

use crate::cluster::hash::HashFunction;
use crate::cluster::topology::Topology;

pub use alias::AliasRegistry;
pub use command::{Command, CommandFlags};
pub use generator::{CommandGenerator, GeneratorKind, PartitionTable};

/// Owns the cluster's partition count and precomputed slot table; shared
/// across every multiplex call.
#[derive(Default)]
pub struct Multiplexer {
    table: RwLock<Option<PartitionTable>>,
    aliases: AliasRegistry,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `EnsureSize`: initialize the partition count from the topology's
    /// shard count, recomputing the table only if it isn't set yet or the
    /// shard count changed (SPEC_FULL §B).
    pub fn ensure_size(&self, topology: &Topology, hash_fn: HashFunction) {
        let num_shards = topology.num_shards();
        let needs_rebuild = {
            let guard = self.table.read();
            match guard.as_ref() {
                Some(t) => t.num_partitions() != num_shards,
                None => true,
            }
        };
        if needs_rebuild {
            let table = PartitionTable::build(num_shards, topology.num_slots, hash_fn);
            *self.table.write() = Some(table);
        }
    }

    /// Produce the per-partition commands for `cmd` using `kind`.
    pub fn multiplex(&self, kind: GeneratorKind, cmd: Command) -> Vec<Command> {
        let guard = self.table.read();
        match guard.as_ref() {
            Some(table) => CommandGenerator::new(kind, cmd, table, Some(&self.aliases)).collect(),
            None => vec![cmd],
        }
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{
        endpoint::Endpoint,
        node::{Node, NodeFlags, NodeId},
        shard::Shard,
    };

    fn topology(num_shards: usize) -> Topology {
        let shards = (0..num_shards)
            .map(|i| {
                let width = 16384 / num_shards as u32;
                let n = Node::new(
                    NodeId::from(format!("n{i}").as_str()),
                    Endpoint::new("h", 7000),
                    NodeFlags::MASTER,
                );
                Shard::new(i as u32 * width, (i as u32 + 1) * width - 1, vec![n])
            })
            .collect();
        Topology {
            my_id: None,
            num_slots: 16384,
            hash_function: HashFunction::Crc16,
            shards,
            last_update_seq: 0,
        }
    }

    #[test]
    fn scenario_s2_multiplex_three_partitions() {
        let mux = Multiplexer::new();
        mux.ensure_size(&topology(3), HashFunction::Crc16);
        let cmd = Command::new(
            vec!["_FT.SEARCH".into(), "idx".into(), "hello".into()],
            1,
        );
        let out = mux.multiplex(GeneratorKind::Default, cmd);
        assert_eq!(out.len(), 3);
        for c in &out {
            assert!(c.args[1].starts_with("idx{"));
        }
    }

    #[test]
    fn ensure_size_is_idempotent_for_same_shard_count() {
        let mux = Multiplexer::new();
        mux.ensure_size(&topology(3), HashFunction::Crc16);
        let tag_before = mux.table.read().as_ref().unwrap().tag_for_partition(0).map(str::to_string);
        mux.ensure_size(&topology(3), HashFunction::Crc16);
        let tag_after = mux.table.read().as_ref().unwrap().tag_for_partition(0).map(str::to_string);
        assert_eq!(tag_before, tag_after);
    }
}
