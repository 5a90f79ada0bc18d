//! Topology: `{num-slots, hash-function, shards}` plus the text-format
//! parser from §6.

use super::endpoint::Endpoint;
use super::hash::HashFunction;
use super::node::{Node, NodeFlags, NodeId};
use super::shard::Shard;
use crate::error::{Error, Result};

/// `{num-slots, hash-function, list of shards}` (§3).
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub my_id: Option<NodeId>,
    pub num_slots: u32,
    pub hash_function: HashFunction,
    pub shards: Vec<Shard>,
    /// Monotonically bumped on every `UpdateTopology`, including no-ops,
    /// per the idempotence law in §8.
    pub last_update_seq: u64,
}

impl Topology {
    /// `num-shards>0 ∧ num-slots>0 ∧ Σ(shard widths) ≥ num-slots`.
    ///
    /// A shard with zero nodes is tolerated here (Open Question #3):
    /// rejecting it would make partial/incoming topologies unusable, and
    /// routing simply fails at `SelectNode` time with `NoNode`.
    pub fn is_valid(&self) -> bool {
        if self.shards.is_empty() || self.num_slots == 0 {
            return false;
        }
        let total_width: u64 = self.shards.iter().map(|s| s.width() as u64).sum();
        total_width >= self.num_slots as u64
            && self.shards.iter().filter(|n| n.is_self_shard()).count() <= 1
    }

    /// Linear scan over shards (bounded to a few thousand); first shard
    /// whose range contains `slot` wins (§4.3).
    pub fn find_shard(&self, slot: u32) -> Option<&Shard> {
        self.shards.iter().find(|s| s.contains(slot))
    }

    pub fn find_shard_index(&self, slot: u32) -> Option<usize> {
        self.shards.iter().position(|s| s.contains(slot))
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }
}

impl Shard {
    fn is_self_shard(&self) -> bool {
        self.nodes.iter().any(|n| n.is_self())
    }
}

/// Parse the minimal topology text format from §6:
///
/// ```text
/// MYID <id> [HASHFUNC CRC12|CRC16] [NUMSLOTS n] RANGES k
///   SHARD <shard-id> SLOTRANGE <start> <end> ADDR <host:port>
///        [UNIXADDR <path>] [MASTER]
///   ...
/// ```
pub fn parse_topology(text: &str) -> Result<Topology> {
    let mut tokens = text.split_whitespace().peekable();

    let mut my_id = None;
    let mut hash_function = HashFunction::Crc16;
    let mut num_slots: u32 = 16384;
    let mut ranges: Option<usize> = None;

    match tokens.next() {
        Some("MYID") => {
            my_id = Some(NodeId::from(
                tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("MYID requires a value".into()))?,
            ));
        }
        _ => return Err(Error::Syntax("topology must start with MYID".into())),
    }

    loop {
        match tokens.peek().copied() {
            Some("HASHFUNC") => {
                tokens.next();
                let f = tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("HASHFUNC requires a value".into()))?;
                hash_function = HashFunction::parse(f)
                    .ok_or_else(|| Error::Syntax(format!("unknown hash function {f}")))?;
            }
            Some("NUMSLOTS") => {
                tokens.next();
                let n: u32 = tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("NUMSLOTS requires a value".into()))?
                    .parse()
                    .map_err(|_| Error::Syntax("NUMSLOTS must be numeric".into()))?;
                if !(1..=16384).contains(&n) {
                    return Err(Error::Syntax("NUMSLOTS out of range [1, 16384]".into()));
                }
                num_slots = n;
            }
            Some("RANGES") => {
                tokens.next();
                let n: usize = tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("RANGES requires a value".into()))?
                    .parse()
                    .map_err(|_| Error::Syntax("RANGES must be numeric".into()))?;
                ranges = Some(n);
                break;
            }
            _ => return Err(Error::Syntax("expected RANGES".into())),
        }
    }

    let ranges = ranges.ok_or_else(|| Error::Syntax("missing RANGES".into()))?;
    let mut shards = Vec::with_capacity(ranges);

    while tokens.peek() == Some(&"SHARD") {
        tokens.next();
        let _shard_id = tokens
            .next()
            .ok_or_else(|| Error::Syntax("SHARD requires an id".into()))?;

        if tokens.next() != Some("SLOTRANGE") {
            return Err(Error::Syntax("expected SLOTRANGE".into()));
        }
        let start: u32 = tokens
            .next()
            .ok_or_else(|| Error::Syntax("SLOTRANGE requires start".into()))?
            .parse()
            .map_err(|_| Error::Syntax("SLOTRANGE start must be numeric".into()))?;
        let end: u32 = tokens
            .next()
            .ok_or_else(|| Error::Syntax("SLOTRANGE requires end".into()))?
            .parse()
            .map_err(|_| Error::Syntax("SLOTRANGE end must be numeric".into()))?;
        if start > end || end >= num_slots {
            return Err(Error::Syntax(format!(
                "invalid slot range [{start}, {end}] for NUMSLOTS {num_slots}"
            )));
        }

        let mut nodes = Vec::new();
        while tokens.peek() == Some(&"ADDR") || tokens.peek() == Some(&"UNIXADDR") {
            // A single node entry: ADDR host:port [UNIXADDR path] [MASTER]
            let mut endpoint;
            if tokens.next() == Some("ADDR") {
                let addr = tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("ADDR requires host:port".into()))?;
                let (host, port) = addr
                    .rsplit_once(':')
                    .ok_or_else(|| Error::Syntax("ADDR must be host:port".into()))?;
                let port: u16 = port
                    .parse()
                    .map_err(|_| Error::Syntax("ADDR port must be numeric".into()))?;
                endpoint = Endpoint::new(host, port);
            } else {
                endpoint = Endpoint::new("", 0);
            }

            if tokens.peek() == Some(&"UNIXADDR") {
                tokens.next();
                let path = tokens
                    .next()
                    .ok_or_else(|| Error::Syntax("UNIXADDR requires a path".into()))?;
                endpoint = endpoint.with_unix_socket(path);
            }

            let mut flags = NodeFlags::empty();
            if tokens.peek() == Some(&"MASTER") {
                tokens.next();
                flags.insert(NodeFlags::MASTER);
            }

            let node_id = NodeId::from(format!("{}:{}", endpoint.host, endpoint.port).as_str());
            if my_id.as_ref() == Some(&node_id) {
                flags.insert(NodeFlags::SELF_);
            }
            nodes.push(Node::new(node_id, endpoint, flags));

            // Another SHARD or node line, or loop continues on ADDR for the
            // (unusual) multi-address-per-shard-without-new-SHARD form.
            if tokens.peek() != Some(&"ADDR") && tokens.peek() != Some(&"UNIXADDR") {
                break;
            }
        }

        shards.push(Shard::new(start, end, nodes));
    }

    if tokens.next().is_some() {
        return Err(Error::Syntax("trailing tokens after topology".into()));
    }

    if shards.len() != ranges {
        return Err(Error::Syntax(format!(
            "RANGES {ranges} does not match shard count {}",
            shards.len()
        )));
    }

    Ok(Topology {
        my_id,
        num_slots,
        hash_function,
        shards,
        last_update_seq: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MYID node1:7000 HASHFUNC CRC16 NUMSLOTS 16384 RANGES 2
        SHARD s0 SLOTRANGE 0 8191 ADDR node1:7000 MASTER
        SHARD s1 SLOTRANGE 8192 16383 ADDR node2:7000 MASTER";

    #[test]
    fn parses_minimal_topology() {
        let topo = parse_topology(SAMPLE).unwrap();
        assert_eq!(topo.num_slots, 16384);
        assert_eq!(topo.shards.len(), 2);
        assert!(topo.is_valid());
        assert!(topo.shards[0].nodes[0].is_self());
    }

    #[test]
    fn rejects_range_count_mismatch() {
        let bad = SAMPLE.replace("RANGES 2", "RANGES 3");
        assert!(parse_topology(&bad).is_err());
    }

    #[test]
    fn rejects_missing_myid() {
        assert!(parse_topology("HASHFUNC CRC16 NUMSLOTS 100 RANGES 0").is_err());
    }

    #[test]
    fn rejects_trailing_tokens() {
        let bad = format!("{SAMPLE} TRAILING");
        assert!(parse_topology(&bad).is_err());
    }

    #[test]
    fn find_shard_linear_scan() {
        let topo = parse_topology(SAMPLE).unwrap();
        assert_eq!(topo.find_shard_index(0), Some(0));
        assert_eq!(topo.find_shard_index(8192), Some(1));
        assert_eq!(topo.find_shard_index(16384), None);
    }

    #[test]
    fn invalid_when_widths_do_not_cover_slots() {
        let text = "MYID n1 NUMSLOTS 16384 RANGES 1
            SHARD s0 SLOTRANGE 0 100 ADDR n1:7000 MASTER";
        let topo = parse_topology(text).unwrap();
        assert!(!topo.is_valid());
    }

    #[test]
    fn tolerates_shard_with_zero_nodes() {
        let text = "MYID n1 NUMSLOTS 10 RANGES 1
            SHARD s0 SLOTRANGE 0 9";
        let topo = parse_topology(text).unwrap();
        assert!(topo.is_valid());
        assert!(topo.shards[0].nodes.is_empty());
    }
}
