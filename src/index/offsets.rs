//! Per-term token offsets, varint-delta encoded (§4.6).

use super::varint::{write_u64, VarintReader};

/// Delta-encoded token positions for one term within one document.
#[derive(Debug, Clone, Default)]
pub struct TermOffsets {
    data: Vec<u8>,
}

impl TermOffsets {
    pub fn encode(positions: &[u32]) -> Self {
        let mut data = Vec::new();
        let mut prev = 0u64;
        for &pos in positions {
            write_u64(&mut data, pos as u64 - prev);
            prev = pos as u64;
        }
        Self { data }
    }

    /// `ResultTermOffsets`: extract the subrange `[first_tok_pos,
    /// last_tok_pos]` by skipping varints until reaching `first_tok_pos`
    /// (a 0-based index into the position sequence), then yielding
    /// successive absolute positions until `last_tok_pos` inclusive.
    pub fn range(&self, first_tok_pos: usize, last_tok_pos: usize) -> Vec<u32> {
        let mut reader = VarintReader::new(&self.data);
        let mut cumulative = 0u64;
        let mut idx = 0usize;
        let mut out = Vec::new();

        while let Some(delta) = reader.read_u64() {
            cumulative += delta;
            if idx >= first_tok_pos && idx <= last_tok_pos {
                out.push(cumulative as u32);
            }
            if idx >= last_tok_pos {
                break;
            }
            idx += 1;
        }
        out
    }
}
