//! `AsyncReadPipeline`: three bounded FIFO stages overlapping posting-list
//! iteration with disk I/O while preserving submission order (§4.7).
//!
//! The FIFO invariant holds because completions are applied to whichever
//! pending entry they belong to (by token), and only the *head* of
//! `pending_results` is ever promoted to `ready_results` — an entry that
//! completes out of turn simply waits there until its predecessors do too.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use super::pool::{AsyncReadPool, DocMetadata, UserData};
use crate::index::IndexResult;

enum PendingState {
    Waiting,
    Ready(DocMetadata),
}

struct PendingEntry {
    token: UserData,
    result: IndexResult,
    state: PendingState,
}

/// A completed read, ready for hand-off to the result-processor chain.
pub struct ReadyResult {
    pub result: IndexResult,
    pub metadata: DocMetadata,
}

pub struct AsyncReadPipeline<P: AsyncReadPool> {
    pool: Arc<P>,
    pool_size: usize,
    next_token: UserData,
    iterator_results: VecDeque<IndexResult>,
    pending_results: VecDeque<PendingEntry>,
    ready_results: VecDeque<ReadyResult>,
}

impl<P: AsyncReadPool> AsyncReadPipeline<P> {
    pub fn new(pool: Arc<P>, pool_size: usize) -> Self {
        Self {
            pool,
            pool_size: pool_size.max(1),
            next_token: 0,
            iterator_results: VecDeque::new(),
            pending_results: VecDeque::new(),
            ready_results: VecDeque::new(),
        }
    }

    /// Buffer a result pulled from the source iterator. The caller is not
    /// required to deep-copy first; we do it here so the original stays
    /// valid for the iterator to keep advancing.
    pub fn push(&mut self, result: &IndexResult) {
        self.iterator_results.push_back(result.deep_copy());
    }

    pub fn pending_count(&self) -> usize {
        self.pending_results.len()
    }

    /// While the pool has room and results are buffered, submit head-first.
    /// Never submits more than `pool_size` in flight; never reorders.
    pub fn refill(&mut self) {
        while self.pending_results.len() < self.pool_size {
            let Some(result) = self.iterator_results.pop_front() else {
                break;
            };
            let token = self.next_token;
            self.next_token += 1;
            if !self.pool.add_async_read(result.doc_id, token) {
                self.iterator_results.push_front(result);
                break;
            }
            self.pending_results.push_back(PendingEntry {
                token,
                result,
                state: PendingState::Waiting,
            });
        }
    }

    /// Drain completions from the backend into `ready_results`, then
    /// promote every contiguous completed run starting at the head of
    /// `pending_results`.
    pub async fn poll(&mut self, timeout_ms: u64, expiration: Option<Instant>) {
        let mut ready = Vec::new();
        let mut failed = Vec::new();
        self.pool
            .poll_async_reads(timeout_ms, expiration, &mut ready, &mut failed)
            .await;

        for (token, meta) in ready {
            if let Some(entry) = self.pending_results.iter_mut().find(|e| e.token == token) {
                entry.state = PendingState::Ready(meta);
            }
        }
        for token in failed {
            self.pending_results.retain(|e| e.token != token);
        }

        while let Some(front) = self.pending_results.front() {
            if matches!(front.state, PendingState::Ready(_)) {
                let entry = self.pending_results.pop_front().expect("front checked above");
                let PendingState::Ready(meta) = entry.state else {
                    unreachable!()
                };
                self.ready_results.push_back(ReadyResult {
                    result: entry.result,
                    metadata: meta,
                });
            } else {
                break;
            }
        }
    }

    /// Pop the next ready result in submission order, or `None` if the
    /// head of the pipeline has not completed yet.
    pub fn pop_ready_result(&mut self) -> Option<ReadyResult> {
        self.ready_results.pop_front()
    }

    pub fn is_complete(&self, iterator_at_eof: bool) -> bool {
        iterator_at_eof
            && self.ready_results.is_empty()
            && self.pending_results.is_empty()
            && self.iterator_results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asyncread::pool::{InMemoryReadPool, ReadOutcome};
    use crate::index::ResultKind;

    fn leaf(doc_id: u64) -> IndexResult {
        IndexResult::leaf(ResultKind::Term, doc_id, 1, 1, 1.0)
    }

    fn meta(doc_id: u64) -> DocMetadata {
        DocMetadata {
            doc_id,
            bytes: std::sync::Arc::from(vec![0u8; 1]),
        }
    }

    #[tokio::test]
    async fn fifo_order_survives_out_of_order_completion() {
        let pool = Arc::new(InMemoryReadPool::new(4));
        let mut pipeline = AsyncReadPipeline::new(pool.clone(), 4);

        for d in 1..=8u64 {
            pipeline.push(&leaf(d));
        }
        pipeline.refill();
        assert_eq!(pipeline.pending_count(), 4);

        // Disk completes d3, d1, d4, d2 — out of submission order.
        pool.complete(2, ReadOutcome::Ready(meta(3)));
        pool.complete(0, ReadOutcome::Ready(meta(1)));
        pool.complete(3, ReadOutcome::Ready(meta(4)));
        pool.complete(1, ReadOutcome::Ready(meta(2)));
        pipeline.poll(0, None).await;

        assert_eq!(pipeline.pending_count(), 0);
        let popped: Vec<u64> = std::iter::from_fn(|| pipeline.pop_ready_result())
            .map(|r| r.result.doc_id)
            .collect();
        assert_eq!(popped, vec![1, 2, 3, 4]);

        pipeline.refill();
        assert_eq!(pipeline.pending_count(), 4);
        for (token, doc_id) in [(4u64, 5u64), (5, 6), (6, 7), (7, 8)] {
            pool.complete(token, ReadOutcome::Ready(meta(doc_id)));
        }
        pipeline.poll(0, None).await;
        let popped: Vec<u64> = std::iter::from_fn(|| pipeline.pop_ready_result())
            .map(|r| r.result.doc_id)
            .collect();
        assert_eq!(popped, vec![5, 6, 7, 8]);
        assert!(pipeline.is_complete(true));
    }

    #[tokio::test]
    async fn partial_completion_blocks_the_head() {
        let pool = Arc::new(InMemoryReadPool::new(4));
        let mut pipeline = AsyncReadPipeline::new(pool.clone(), 4);
        for d in 1..=3u64 {
            pipeline.push(&leaf(d));
        }
        pipeline.refill();

        // Only the second entry (token 1, doc 2) completes.
        pool.complete(1, ReadOutcome::Ready(meta(2)));
        pipeline.poll(0, None).await;

        assert!(pipeline.pop_ready_result().is_none());
        assert_eq!(pipeline.pending_count(), 3);
    }

    #[tokio::test]
    async fn failed_reads_are_dropped_silently() {
        let pool = Arc::new(InMemoryReadPool::new(4));
        let mut pipeline = AsyncReadPipeline::new(pool.clone(), 4);
        for d in 1..=2u64 {
            pipeline.push(&leaf(d));
        }
        pipeline.refill();

        pool.complete(0, ReadOutcome::Failed);
        pool.complete(1, ReadOutcome::Ready(meta(2)));
        pipeline.poll(0, None).await;

        let popped: Vec<u64> = std::iter::from_fn(|| pipeline.pop_ready_result())
            .map(|r| r.result.doc_id)
            .collect();
        assert_eq!(popped, vec![2]);
    }
}
