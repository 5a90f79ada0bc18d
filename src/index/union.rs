//! Union iterator: emits the minimum current doc id among its children,
//! carrying forward every child currently sitting on that id (§4.6).

use super::iterator::{IndexIterator, SkipResult};
use super::result::{IndexResult, ResultKind};

struct Lane {
    it: Box<dyn IndexIterator>,
    pending: Option<IndexResult>,
    eof: bool,
}

impl Lane {
    fn new(mut it: Box<dyn IndexIterator>) -> Self {
        let pending = it.next();
        let eof = pending.is_none();
        Self { it, pending, eof }
    }

    fn advance(&mut self) {
        self.pending = self.it.next();
        if self.pending.is_none() {
            self.eof = true;
        }
    }
}

pub struct UnionIterator {
    lanes: Vec<Lane>,
    last_doc_id: Option<u64>,
}

impl UnionIterator {
    pub fn new(children: Vec<Box<dyn IndexIterator>>) -> Self {
        let lanes = children.into_iter().map(Lane::new).collect();
        Self { lanes, last_doc_id: None }
    }

    fn min_pending(&self) -> Option<u64> {
        self.lanes
            .iter()
            .filter(|l| !l.eof)
            .filter_map(|l| l.pending.as_ref().map(|r| r.doc_id))
            .min()
    }
}

impl IndexIterator for UnionIterator {
    fn last_doc_id(&self) -> Option<u64> {
        self.last_doc_id
    }

    fn next(&mut self) -> Option<IndexResult> {
        let doc_id = self.min_pending()?;
        let mut children = Vec::new();
        for lane in self.lanes.iter_mut() {
            if lane.eof {
                continue;
            }
            if lane.pending.as_ref().map(|r| r.doc_id) == Some(doc_id) {
                if let Some(r) = lane.pending.take() {
                    children.push(r);
                }
                lane.advance();
            }
        }
        self.last_doc_id = Some(doc_id);
        Some(IndexResult::aggregate(ResultKind::Union, doc_id, children))
    }

    fn skip_to(&mut self, target: u64) -> SkipResult {
        for lane in self.lanes.iter_mut() {
            while !lane.eof && lane.pending.as_ref().map(|r| r.doc_id) < Some(target) {
                lane.advance();
            }
        }
        // Peek/stay: land on the min pending doc id without consuming any
        // lane's `pending`, so a following `next()` still emits it.
        match self.min_pending() {
            Some(doc_id) => {
                self.last_doc_id = Some(doc_id);
                if doc_id == target {
                    SkipResult::Found
                } else {
                    SkipResult::NotFound
                }
            }
            None => SkipResult::Eof,
        }
    }

    fn at_eof(&self) -> bool {
        self.lanes.iter().all(|l| l.eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::iterator::VecIterator;

    fn leaf(doc_id: u64) -> IndexResult {
        IndexResult::leaf(ResultKind::Term, doc_id, 1, 1, 1.0)
    }

    #[test]
    fn emits_min_advancing_all_matching_lanes() {
        let a = VecIterator::new(vec![leaf(1), leaf(5)]);
        let b = VecIterator::new(vec![leaf(1), leaf(3)]);
        let mut uni = UnionIterator::new(vec![Box::new(a), Box::new(b)]);

        let r1 = uni.next().unwrap();
        assert_eq!(r1.doc_id, 1);
        assert_eq!(r1.children.len(), 2);

        let r2 = uni.next().unwrap();
        assert_eq!(r2.doc_id, 3);
        assert_eq!(r2.children.len(), 1);

        let r3 = uni.next().unwrap();
        assert_eq!(r3.doc_id, 5);
        assert_eq!(r3.children.len(), 1);

        assert!(uni.next().is_none());
    }

    #[test]
    fn skip_to_jumps_to_next_qualifying_id() {
        let a = VecIterator::new(vec![leaf(1), leaf(10)]);
        let b = VecIterator::new(vec![leaf(2), leaf(4)]);
        let mut uni = UnionIterator::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(uni.skip_to(4), SkipResult::Found);
        assert_eq!(uni.last_doc_id(), Some(4));
    }

    #[test]
    fn skip_to_retains_landed_doc_for_next() {
        let a = VecIterator::new(vec![leaf(1), leaf(10)]);
        let b = VecIterator::new(vec![leaf(2), leaf(4)]);
        let mut uni = UnionIterator::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(uni.skip_to(4), SkipResult::Found);
        // the doc landed on by skip_to must still be emitted by next().
        assert_eq!(uni.next().map(|r| r.doc_id), Some(4));
        assert_eq!(uni.next().map(|r| r.doc_id), Some(10));
        assert!(uni.next().is_none());
    }

    #[test]
    fn empty_children_is_immediately_eof() {
        let mut uni = UnionIterator::new(Vec::new());
        assert!(uni.at_eof());
        assert!(uni.next().is_none());
    }
}
