//! Intersection iterator: advances every child to the max of their current
//! doc ids and emits only when all children settle on the same one (§4.6).

use super::iterator::{IndexIterator, SkipResult};
use super::result::{IndexResult, ResultKind};

pub struct IntersectionIterator {
    children: Vec<Box<dyn IndexIterator>>,
    last_doc_id: Option<u64>,
    eof: bool,
}

impl IntersectionIterator {
    pub fn new(children: Vec<Box<dyn IndexIterator>>) -> Self {
        let eof = children.is_empty();
        Self {
            children,
            last_doc_id: None,
            eof,
        }
    }

    fn advance_to(&mut self, mut target: u64) -> Option<u64> {
        'outer: loop {
            for child in self.children.iter_mut() {
                // `skip_to` has peek/stay semantics: a child already sitting
                // on a doc id >= target is already positioned correctly and
                // must not be re-skipped, or it would overshoot past the doc
                // it's currently (but not yet `next()`-consumed) landed on.
                if child.last_doc_id().is_some_and(|d| d >= target) {
                    continue;
                }
                match child.skip_to(target) {
                    SkipResult::Eof => {
                        self.eof = true;
                        return None;
                    }
                    SkipResult::Found => continue,
                    SkipResult::NotFound => {
                        target = child.last_doc_id().expect("advanced iterator has a doc id");
                        continue 'outer;
                    }
                }
            }
            return Some(target);
        }
    }
}

impl IndexIterator for IntersectionIterator {
    fn last_doc_id(&self) -> Option<u64> {
        self.last_doc_id
    }

    fn next(&mut self) -> Option<IndexResult> {
        if self.eof {
            return None;
        }
        let start = self.last_doc_id.map(|d| d + 1).unwrap_or(0);
        let doc_id = self.advance_to(start)?;
        self.last_doc_id = Some(doc_id);

        let children: Vec<IndexResult> = self
            .children
            .iter_mut()
            .filter_map(|c| {
                if c.last_doc_id() == Some(doc_id) {
                    c.next()
                } else {
                    None
                }
            })
            .collect();
        Some(IndexResult::aggregate(ResultKind::Intersection, doc_id, children))
    }

    fn skip_to(&mut self, target: u64) -> SkipResult {
        if self.eof {
            return SkipResult::Eof;
        }
        let prior = self.last_doc_id;
        match self.advance_to(target) {
            Some(doc_id) => {
                self.last_doc_id = Some(doc_id);
                if doc_id == target {
                    SkipResult::Found
                } else {
                    SkipResult::NotFound
                }
            }
            None => {
                self.last_doc_id = prior;
                SkipResult::Eof
            }
        }
    }

    fn at_eof(&self) -> bool {
        self.eof
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
    fn emits_only_shared_doc_ids() {
        let a = VecIterator::new(vec![leaf(1), leaf(2), leaf(5), leaf(9)]);
        let b = VecIterator::new(vec![leaf(2), leaf(5), leaf(7)]);
        let mut inter = IntersectionIterator::new(vec![Box::new(a), Box::new(b)]);

        let r1 = inter.next().unwrap();
        assert_eq!(r1.doc_id, 2);
        let r2 = inter.next().unwrap();
        assert_eq!(r2.doc_id, 5);
        assert!(inter.next().is_none());
    }

    #[test]
    fn skip_to_lands_on_first_shared_id_ge_target() {
        let a = VecIterator::new(vec![leaf(1), leaf(4), leaf(8)]);
        let b = VecIterator::new(vec![leaf(4), leaf(6), leaf(8)]);
        let mut inter = IntersectionIterator::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(inter.skip_to(5), SkipResult::NotFound);
        assert_eq!(inter.last_doc_id(), Some(8));
    }

    #[test]
    fn empty_children_is_immediately_eof() {
        let mut inter = IntersectionIterator::new(Vec::new());
        assert!(inter.at_eof());
        assert!(inter.next().is_none());
    }
}
