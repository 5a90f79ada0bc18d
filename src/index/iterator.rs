//! Posting-list iterator trait and its `SkipTo` contract (§4.6).

use super::result::IndexResult;

/// Outcome of advancing an iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipResult {
    /// Landed exactly on the requested doc id.
    Found,
    /// Landed past the requested doc id (no exact match, but more data
    /// remains).
    NotFound,
    /// No more results; `last_doc_id` did not advance past where it was.
    Eof,
}

/// A posting-list iterator. `SkipTo(target)` guarantees: on `Found` or
/// `NotFound`, `last_doc_id() >= target`; on `Eof`, `last_doc_id()` is
/// unchanged from before the call and no more results exist.
pub trait IndexIterator {
    fn last_doc_id(&self) -> Option<u64>;

    /// Advance to the next result in doc-id order.
    fn next(&mut self) -> Option<IndexResult>;

    /// Advance to the first result with doc id `>= target`.
    fn skip_to(&mut self, target: u64) -> SkipResult;

    fn at_eof(&self) -> bool;
}

/// A simple in-memory iterator over a pre-decoded posting list, used both
/// directly (leaf term iterator) and as the test double for the aggregate
/// iterators below.
///
/// Holds the current result in `pending` until `next()` is called, so that
/// `skip_to` can land on a doc without consuming it (peek/stay semantics):
/// after `skip_to(target)` returns `Found`/`NotFound`, the immediately
/// following `next()` call yields the landed doc rather than the one after
/// it.
pub struct VecIterator {
    results: Vec<IndexResult>,
    pos: usize,
    pending: Option<IndexResult>,
    last_doc_id: Option<u64>,
}

impl VecIterator {
    pub fn new(mut results: Vec<IndexResult>) -> Self {
        results.sort_by_key(|r| r.doc_id);
        let mut it = Self {
            results,
            pos: 0,
            pending: None,
            last_doc_id: None,
        };
        it.pending = it.pull();
        it
    }

    /// Pull the next raw result out of the backing vec; does not affect
    /// `last_doc_id`, which only tracks doc ids the iterator has landed on
    /// via `next`/`skip_to`.
    fn pull(&mut self) -> Option<IndexResult> {
        let r = self.results.get(self.pos).cloned();
        if r.is_some() {
            self.pos += 1;
        }
        r
    }
}

impl IndexIterator for VecIterator {
    fn last_doc_id(&self) -> Option<u64> {
        self.last_doc_id
    }

    fn next(&mut self) -> Option<IndexResult> {
        let r = self.pending.take()?;
        self.last_doc_id = Some(r.doc_id);
        self.pending = self.pull();
        Some(r)
    }

    fn skip_to(&mut self, target: u64) -> SkipResult {
        loop {
            match &self.pending {
                None => return SkipResult::Eof,
                Some(r) if r.doc_id >= target => {
                    let doc_id = r.doc_id;
                    self.last_doc_id = Some(doc_id);
                    return if doc_id == target {
                        SkipResult::Found
                    } else {
                        SkipResult::NotFound
                    };
                }
                Some(_) => {
                    self.pending = self.pull();
                }
            }
        }
    }

    fn at_eof(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::result::ResultKind;

    fn leaf(doc_id: u64) -> IndexResult {
        IndexResult::leaf(ResultKind::Term, doc_id, 1, 1, 1.0)
    }

    #[test]
    fn skip_to_found_and_not_found() {
        let mut it = VecIterator::new(vec![leaf(1), leaf(5), leaf(10)]);
        assert_eq!(it.skip_to(5), SkipResult::Found);
        assert_eq!(it.last_doc_id(), Some(5));

        let mut it2 = VecIterator::new(vec![leaf(1), leaf(5), leaf(10)]);
        assert_eq!(it2.skip_to(7), SkipResult::NotFound);
        assert_eq!(it2.last_doc_id(), Some(10));
    }

    #[test]
    fn skip_to_eof_when_exhausted() {
        let mut it = VecIterator::new(vec![leaf(1)]);
        assert_eq!(it.skip_to(5), SkipResult::Eof);
        assert!(it.at_eof());
    }

    #[test]
    fn skip_to_retains_landed_doc_for_next() {
        let mut it = VecIterator::new(vec![leaf(1), leaf(5), leaf(10)]);
        assert_eq!(it.skip_to(5), SkipResult::Found);
        // the doc landed on by skip_to must still be emitted by next(),
        // not the one after it.
        assert_eq!(it.next().map(|r| r.doc_id), Some(5));
        assert_eq!(it.next().map(|r| r.doc_id), Some(10));
        assert!(it.next().is_none());
    }
}
