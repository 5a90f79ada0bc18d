//! Scanner: the bottom of the chain, walking a posting-list iterator tree
//! and materializing `SearchResult`s (§4.8 step 1).

use crate::index::IndexIterator;

use super::context::QueryContext;
use super::processor::{check_deadline, NextResult, ResultProcessor};
use super::result::SearchResult;

pub struct Scanner {
    iterator: Box<dyn IndexIterator + Send>,
}

impl Scanner {
    pub fn new(iterator: Box<dyn IndexIterator + Send>) -> Self {
        Self { iterator }
    }
}

impl ResultProcessor for Scanner {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if let Some(terminal) = check_deadline(ctx) {
            return terminal;
        }
        match self.iterator.next() {
            Some(ir) => {
                ctx.total_results += 1;
                *out = Some(SearchResult::new(ir.doc_id, ir));
                NextResult::Ok
            }
            None => NextResult::Eof,
        }
    }

    fn free(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexResult, ResultKind, VecIterator};
    use crate::query::policy::{OomPolicy, TimeoutPolicy};

    fn leaf(doc_id: u64) -> IndexResult {
        IndexResult::leaf(ResultKind::Term, doc_id, 1, 1, 1.0)
    }

    #[test]
    fn yields_one_search_result_per_posting() {
        let it = VecIterator::new(vec![leaf(1), leaf(2)]);
        let mut scanner = Scanner::new(Box::new(it));
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);

        let mut out = None;
        assert!(matches!(scanner.next(&mut ctx, &mut out), NextResult::Ok));
        assert_eq!(out.unwrap().doc_id, 1);

        let mut out = None;
        assert!(matches!(scanner.next(&mut ctx, &mut out), NextResult::Ok));
        assert_eq!(out.unwrap().doc_id, 2);

        let mut out = None;
        assert!(matches!(scanner.next(&mut ctx, &mut out), NextResult::Eof));
        assert_eq!(ctx.total_results, 2);
    }
}
