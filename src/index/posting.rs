//! Posting-list blocks: variable-length delta-encoded `(doc-id, payload)`
//! sequences, decoded forward-only (§4.6).

use super::varint::VarintReader;

/// One decoded posting: an absolute doc id plus its payload (frequency,
/// field mask, or whatever the term's scoring needs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u64,
    pub payload: u64,
}

/// `(first-doc-id, raw bytes)` (§3). The raw bytes are a contiguous stream
/// of varint-encoded `(delta-doc-id, payload)` records.
#[derive(Debug, Clone)]
pub struct PostingListBlock {
    pub first_doc_id: u64,
    pub data: Vec<u8>,
}

impl PostingListBlock {
    pub fn new(first_doc_id: u64, data: Vec<u8>) -> Self {
        Self { first_doc_id, data }
    }

    pub fn reader(&self) -> PostingBlockReader<'_> {
        PostingBlockReader {
            varint: VarintReader::new(&self.data),
            last_doc_id: None,
            first_doc_id: self.first_doc_id,
        }
    }
}

/// Forward-only decoder over one block's records.
pub struct PostingBlockReader<'a> {
    varint: VarintReader<'a>,
    last_doc_id: Option<u64>,
    first_doc_id: u64,
}

impl<'a> Iterator for PostingBlockReader<'a> {
    type Item = Posting;

    fn next(&mut self) -> Option<Posting> {
        let delta = self.varint.read_u64()?;
        let payload = self.varint.read_u64()?;
        let doc_id = match self.last_doc_id {
            Some(prev) => prev + delta,
            None => self.first_doc_id + delta,
        };
        self.last_doc_id = Some(doc_id);
        Some(Posting { doc_id, payload })
    }
}

/// Encode a sequence of (doc_id, payload) pairs (already sorted ascending
/// by doc_id) into a block.
pub fn encode_block(first_doc_id: u64, postings: &[(u64, u64)]) -> PostingListBlock {
    let mut data = Vec::new();
    let mut prev = first_doc_id;
    for (i, &(doc_id, payload)) in postings.iter().enumerate() {
        let delta = if i == 0 {
            doc_id - first_doc_id
        } else {
            doc_id - prev
        };
        super::varint::write_u64(&mut data, delta);
        super::varint::write_u64(&mut data, payload);
        prev = doc_id;
    }
    PostingListBlock::new(first_doc_id, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_in_ascending_doc_id_order() {
        let block = encode_block(10, &[(10, 1), (15, 2), (100, 3)]);
        let decoded: Vec<_> = block.reader().collect();
        assert_eq!(
            decoded,
            vec![
                Posting { doc_id: 10, payload: 1 },
                Posting { doc_id: 15, payload: 2 },
                Posting { doc_id: 100, payload: 3 },
            ]
        );
    }

    #[test]
    fn empty_block_yields_nothing() {
        let block = encode_block(0, &[]);
        assert_eq!(block.reader().count(), 0);
    }
}
