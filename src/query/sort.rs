//! Sorter: a bounded heap of size `offset + limit`, so the chain never
//! materializes more than that many results in memory (§4.8 step 3).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::context::QueryContext;
use super::processor::{NextResult, ResultProcessor};
use super::result::SearchResult;

/// Sort key: score descending, doc-id ascending as the tiebreak, plus an
/// optional ordered list of additional lookup-row keys for multi-key
/// sort (§4.8 "optional multi-key sort using the lookup row").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

pub struct SortKey {
    pub field: crate::rlookup::RLookupKey,
    pub direction: SortDirection,
}

struct HeapEntry {
    result: SearchResult,
    extra_keys: Vec<SortKey>,
}

/// Ordering where `Less` means "`a` ranks before `b`": score descending,
/// doc-id ascending, then the configured extra keys.
fn best_first_cmp(a: &SearchResult, b: &SearchResult, extra: &[SortKey]) -> Ordering {
    let primary = b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id));
    if primary != Ordering::Equal || extra.is_empty() {
        return primary;
    }
    for key in extra {
        let ord = compare_json(a.row.get(key.field), b.row.get(key.field));
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn compare_json(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    match (a.and_then(|v| v.as_f64()), b.and_then(|v| v.as_f64())) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.result.doc_id == other.result.doc_id && self.result.score == other.result.score
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // `BinaryHeap` is a max-heap and pops the greatest element; we want
    // that to be the *worst* ranked result, so this is exactly
    // `best_first_cmp` — "ranks after" is "greater" in heap terms.
    fn cmp(&self, other: &Self) -> Ordering {
        best_first_cmp(&self.result, &other.result, &self.extra_keys)
    }
}

pub struct Sorter {
    upstream: Box<dyn ResultProcessor + Send>,
    capacity: usize,
    extra_keys: Vec<SortKey>,
    heap: BinaryHeap<HeapEntry>,
    drained: bool,
    sorted: Option<std::vec::IntoIter<SearchResult>>,
}

impl Sorter {
    pub fn new(upstream: Box<dyn ResultProcessor + Send>, capacity: usize, extra_keys: Vec<SortKey>) -> Self {
        Self {
            upstream,
            capacity: capacity.max(1),
            extra_keys,
            heap: BinaryHeap::new(),
            drained: false,
            sorted: None,
        }
    }

    fn drain_upstream(&mut self, ctx: &mut QueryContext) -> Option<NextResult> {
        loop {
            let mut out = None;
            match self.upstream.next(ctx, &mut out) {
                NextResult::Ok => {
                    let result = out.expect("Ok implies a result");
                    self.heap.push(HeapEntry {
                        result,
                        extra_keys: self.extra_keys.clone(),
                    });
                    if self.heap.len() > self.capacity {
                        self.heap.pop();
                    }
                }
                NextResult::Eof => return None,
                terminal @ (NextResult::TimedOut | NextResult::Error(_)) => return Some(terminal),
                NextResult::Paused => continue,
            }
        }
    }
}

impl ResultProcessor for Sorter {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if !self.drained {
            self.drained = true;
            if let Some(terminal) = self.drain_upstream(ctx) {
                if !matches!(terminal, NextResult::TimedOut) || !ctx.timeout_policy.is_return() {
                    return terminal;
                }
            }
            let mut results: Vec<SearchResult> = self.heap.drain().map(|e| e.result).collect();
            results.sort_by(|a, b| best_first_cmp(a, b, &self.extra_keys));
            self.sorted = Some(results.into_iter());
        }

        match self.sorted.as_mut().and_then(|it| it.next()) {
            Some(result) => {
                *out = Some(result);
                NextResult::Ok
            }
            None => NextResult::Eof,
        }
    }

    fn free(&mut self) {
        self.upstream.free();
    }
}
