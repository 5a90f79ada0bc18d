//! Cursors: a parked, resumable handle to a live query chain (§4.8
//! "Cursor semantics", §5 cursor-table sharing rule).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::context::QueryContext;
use super::processor::{NextResult, ResultProcessor};
use super::result::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorId(pub u64);

pub struct CursorRead {
    pub results: Vec<SearchResult>,
    pub done: bool,
    pub partial: bool,
}

pub struct Cursor {
    id: CursorId,
    chain: Box<dyn ResultProcessor + Send>,
    ctx: QueryContext,
    chunk_size: usize,
    max_idle: Duration,
    last_active: Instant,
}

impl Cursor {
    fn new(id: CursorId, chain: Box<dyn ResultProcessor + Send>, ctx: QueryContext, chunk_size: usize, max_idle: Duration) -> Self {
        Self {
            id,
            chain,
            ctx,
            chunk_size: chunk_size.max(1),
            max_idle,
            last_active: Instant::now(),
        }
    }

    /// Pull up to `chunk_size` more results, then park.
    pub fn read(&mut self) -> CursorRead {
        self.last_active = Instant::now();
        let mut results = Vec::with_capacity(self.chunk_size);
        loop {
            if results.len() >= self.chunk_size {
                return CursorRead {
                    results,
                    done: false,
                    partial: self.ctx.partial,
                };
            }
            let mut out = None;
            match self.chain.next(&mut self.ctx, &mut out) {
                NextResult::Ok => results.push(out.expect("Ok implies a result")),
                NextResult::Eof => {
                    return CursorRead {
                        results,
                        done: true,
                        partial: self.ctx.partial,
                    }
                }
                NextResult::TimedOut => {
                    return CursorRead {
                        results,
                        done: true,
                        partial: true,
                    }
                }
                NextResult::Error(_) => {
                    return CursorRead {
                        results,
                        done: true,
                        partial: self.ctx.partial,
                    }
                }
                NextResult::Paused => continue,
            }
        }
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_active) > self.max_idle
    }

    pub fn id(&self) -> CursorId {
        self.id
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.chain.free();
    }
}

/// Registry of live cursors, mutex-guarded per §5's shared-resource table
/// ("Cursor table | all | Internal mutex").
pub struct CursorRegistry {
    cursors: Mutex<HashMap<u64, Cursor>>,
    next_id: AtomicU64,
}

impl Default for CursorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorRegistry {
    pub fn new() -> Self {
        Self {
            cursors: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(
        &self,
        chain: Box<dyn ResultProcessor + Send>,
        ctx: QueryContext,
        chunk_size: usize,
        max_idle: Duration,
    ) -> CursorId {
        let raw_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = CursorId(raw_id);
        let cursor = Cursor::new(id, chain, ctx, chunk_size, max_idle);
        self.cursors.lock().insert(raw_id, cursor);
        id
    }

    pub fn read(&self, id: CursorId) -> Option<CursorRead> {
        let mut cursors = self.cursors.lock();
        let cursor = cursors.get_mut(&id.0)?;
        let read = cursor.read();
        if read.done {
            cursors.remove(&id.0);
        }
        Some(read)
    }

    pub fn close(&self, id: CursorId) {
        self.cursors.lock().remove(&id.0);
    }

    /// Reap cursors idle longer than their configured `max_idle`. Returns
    /// the count reaped.
    pub fn reap_idle(&self, now: Instant) -> usize {
        let mut cursors = self.cursors.lock();
        let idle: Vec<u64> = cursors
            .values()
            .filter(|c| c.is_idle(now))
            .map(|c| c.id().0)
            .collect();
        for id in &idle {
            cursors.remove(id);
        }
        idle.len()
    }

    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
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
    fn read_returns_chunks_then_marks_done() {
        let registry = CursorRegistry::new();
        let scanner = Scanner::new(Box::new(docs(7)));
        let ctx = QueryContext::new(100, TimeoutPolicy::Return, OomPolicy::Return);
        let id = registry.register(Box::new(scanner), ctx, 3, Duration::from_secs(60));

        let first = registry.read(id).unwrap();
        assert_eq!(first.results.len(), 3);
        assert!(!first.done);

        let second = registry.read(id).unwrap();
        assert_eq!(second.results.len(), 3);
        assert!(!second.done);

        let third = registry.read(id).unwrap();
        assert_eq!(third.results.len(), 1);
        assert!(third.done);

        assert!(registry.read(id).is_none());
    }

    #[test]
    fn reap_idle_removes_cursors_past_their_deadline() {
        let registry = CursorRegistry::new();
        let scanner = Scanner::new(Box::new(docs(1)));
        let ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);
        registry.register(Box::new(scanner), ctx, 1, Duration::from_millis(0));

        assert_eq!(registry.len(), 1);
        let reaped = registry.reap_idle(Instant::now() + Duration::from_millis(1));
        assert_eq!(reaped, 1);
        assert!(registry.is_empty());
    }
}
