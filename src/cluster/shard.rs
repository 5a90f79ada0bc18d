//! A shard: a contiguous slot range and its nodes (§3).

use super::node::Node;

/// `{slot-range [start,end], ordered list of nodes}`. The first node is the
/// master by convention unless a node is explicitly flagged.
#[derive(Debug, Clone, Default)]
pub struct Shard {
    pub start_slot: u32,
    pub end_slot: u32,
    pub nodes: Vec<Node>,
}

impl Shard {
    pub fn new(start_slot: u32, end_slot: u32, nodes: Vec<Node>) -> Self {
        Self {
            start_slot,
            end_slot,
            nodes,
        }
    }

    pub fn contains(&self, slot: u32) -> bool {
        slot >= self.start_slot && slot <= self.end_slot
    }

    pub fn width(&self) -> u32 {
        self.end_slot.saturating_sub(self.start_slot) + 1
    }

    /// The master node: the first node explicitly flagged `Master`, else
    /// the first node in the list (§3 convention).
    pub fn master(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.is_master())
            .or_else(|| self.nodes.first())
    }

    pub fn replicas(&self) -> impl Iterator<Item = &Node> {
        let master_id = self.master().map(|m| m.id.clone());
        self.nodes
            .iter()
            .filter(move |n| Some(&n.id) != master_id.as_ref())
    }
}
