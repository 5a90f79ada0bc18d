//! Paginator: drops `offset` results, yields up to `limit` (§4.8 step 4).

use super::context::QueryContext;
use super::processor::{check_deadline, NextResult, ResultProcessor};
use super::result::SearchResult;

pub struct Paginator {
    upstream: Box<dyn ResultProcessor + Send>,
    offset: u64,
    limit: u64,
    skipped: u64,
    emitted: u64,
}

impl Paginator {
    pub fn new(upstream: Box<dyn ResultProcessor + Send>, offset: u64, limit: u64) -> Self {
        Self {
            upstream,
            offset,
            limit,
            skipped: 0,
            emitted: 0,
        }
    }
}

impl ResultProcessor for Paginator {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if let Some(terminal) = check_deadline(ctx) {
            return terminal;
        }
        if self.emitted >= self.limit {
            return NextResult::Eof;
        }
        loop {
            match self.upstream.next(ctx, out) {
                NextResult::Ok => {
                    if self.skipped < self.offset {
                        self.skipped += 1;
                        *out = None;
                        continue;
                    }
                    self.emitted += 1;
                    return NextResult::Ok;
                }
                other => return other,
            }
        }
    }

    fn free(&mut self) {
        self.upstream.free();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexResult, ResultKind, VecIterator};
    use crate::query::policy::{OomPolicy, TimeoutPolicy};
    use crate::query::scan::Scanner;

    fn docs(n: u64) -> VecIterator {
        VecIterator::new((0..n).map(|i| IndexResult::leaf(ResultKind::Term, i, 1, 1, 1.0)).collect())
    }

    #[test]
    fn offset_and_limit_carve_a_window() {
        let scanner = Scanner::new(Box::new(docs(10)));
        let mut pager = Paginator::new(Box::new(scanner), 3, 4);
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);

        let mut ids = Vec::new();
        loop {
            let mut out = None;
            match pager.next(&mut ctx, &mut out) {
                NextResult::Ok => ids.push(out.unwrap().doc_id),
                NextResult::Eof => break,
                _ => panic!("unexpected"),
            }
        }
        assert_eq!(ids, vec![3, 4, 5, 6]);
    }

    #[test]
    fn limit_zero_yields_count_only() {
        let scanner = Scanner::new(Box::new(docs(5)));
        let mut pager = Paginator::new(Box::new(scanner), 0, 0);
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);
        let mut out = None;
        assert!(matches!(pager.next(&mut ctx, &mut out), NextResult::Eof));
    }
}
