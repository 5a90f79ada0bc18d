//! Command generator: a lazy iterator that yields one rewritten command per
//! target partition (§4.5).

use crate::cluster::hash::HashFunction;
use crate::util::random_string;

use super::alias::AliasRegistry;
use super::command::Command;

/// Per-partition start-slot table, recomputed only when `num_partitions`
/// changes (SPEC_FULL §B: "Partition slot-table precomputation is cached
/// and versioned").
#[derive(Debug, Clone)]
pub struct PartitionTable {
    table_size: u32,
    num_partitions: usize,
    slots: Vec<u32>,
    /// Cache of a tag string that hashes to each partition's slot, so
    /// repeated multiplexing doesn't re-search.
    tags: Vec<String>,
}

impl PartitionTable {
    /// `EnsureSize`: build the table for `num_partitions` over a hash space
    /// of `table_size` slots, using `hash_fn` to find per-partition tags.
    pub fn build(num_partitions: usize, table_size: u32, hash_fn: HashFunction) -> Self {
        let mut slots = Vec::with_capacity(num_partitions);
        let mut tags = Vec::with_capacity(num_partitions);
        if num_partitions == 0 {
            return Self {
                table_size,
                num_partitions,
                slots,
                tags,
            };
        }
        let step = table_size / num_partitions as u32;
        for i in 0..num_partitions {
            let slot = ((i as u64 + 1) * step as u64).wrapping_sub(1) as u32 % table_size.max(1);
            slots.push(slot);
            tags.push(find_tag_for_slot(hash_fn, slot, table_size));
        }
        Self {
            table_size,
            num_partitions,
            slots,
            tags,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /// The start slot for partition `i` (§4.5 tie-break formula).
    pub fn slot_for_partition(&self, i: usize) -> Option<u32> {
        self.slots.get(i).copied()
    }

    /// A tag string guaranteed to hash to partition `i`'s slot.
    pub fn tag_for_partition(&self, i: usize) -> Option<&str> {
        self.tags.get(i).map(|s| s.as_str())
    }
}

/// Brute-force search for a short string hashing to `slot` under `hash_fn`
/// modulo `table_size`. Bounded: in practice a handful of iterations
/// suffice for table sizes in the thousands.
fn find_tag_for_slot(hash_fn: HashFunction, slot: u32, table_size: u32) -> String {
    for _ in 0..100_000 {
        let candidate = random_string(8);
        if crate::cluster::hash::slot_for_key(hash_fn, &candidate, table_size) == slot {
            return candidate;
        }
    }
    // Fallback: encode the slot directly; callers only need *a* string that
    // round-trips, not a short one.
    format!("tag{slot}")
}

/// Which rewriting strategy a [`CommandGenerator`] applies (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Default,
    NoPartition,
    SpellCheck,
}

/// Lazily yields one rewritten command per partition.
pub struct CommandGenerator<'a> {
    kind: GeneratorKind,
    cmd: Command,
    table: &'a PartitionTable,
    aliases: Option<&'a AliasRegistry>,
    next: usize,
}

impl<'a> CommandGenerator<'a> {
    pub fn new(
        kind: GeneratorKind,
        mut cmd: Command,
        table: &'a PartitionTable,
        aliases: Option<&'a AliasRegistry>,
    ) -> Self {
        // Alias resolution happens once, before partitioning (§4.5).
        if cmd.flags.aliased {
            if let (Some(reg), Some(idx)) = (aliases, cmd.sharding_key_index) {
                if let Some(arg) = cmd.args.get(idx) {
                    if let Some(resolved) = reg.resolve(arg) {
                        cmd.args[idx] = resolved.to_string();
                    }
                }
            }
        }
        Self {
            kind,
            cmd,
            table,
            aliases,
            next: 0,
        }
    }

    /// A command with a target slot already pinned bypasses generator
    /// rewriting entirely (§4.5 edge case).
    fn pinned(&self) -> bool {
        self.cmd.target_slot.is_some()
    }
}

impl<'a> Iterator for CommandGenerator<'a> {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        if self.pinned() {
            if self.next == 0 {
                self.next = 1;
                return Some(self.cmd.clone());
            }
            return None;
        }

        if self.next >= self.table.num_partitions() {
            return None;
        }
        let i = self.next;
        self.next += 1;

        let mut out = self.cmd.clone();
        match self.kind {
            GeneratorKind::Default | GeneratorKind::SpellCheck => {
                if let Some(idx) = out.sharding_key_index {
                    let tag = self.table.tag_for_partition(i)?;
                    if idx >= out.args.len() {
                        // An out-of-range argument aborts rewriting; return
                        // the command unchanged (§4.5 edge case).
                        return Some(self.cmd.clone());
                    }
                    let original = &out.args[idx];
                    let key = crate::cluster::hash::sharding_key(original);
                    out.args[idx] = format!("{key}{{{tag}}}");
                }
                if self.kind == GeneratorKind::SpellCheck {
                    let pos = 3.min(out.args.len());
                    out.args.insert(pos, "FULLSCOREINFO".to_string());
                }
            }
            GeneratorKind::NoPartition => {
                out.target_slot = self.table.slot_for_partition(i);
            }
        }
        Some(out)
    }
}
