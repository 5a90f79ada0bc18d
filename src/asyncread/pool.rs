//! `AsyncReadPool`: the disk-backend capability the pipeline overlaps
//! iteration with (§4.7). This crate is transport/storage-agnostic, so the
//! pool is a trait the host document store implements.

use async_trait::async_trait;

/// Opaque per-request token the pool round-trips back on completion. The
/// pipeline stuffs a raw doc id in here; the trait does not interpret it.
pub type UserData = u64;

/// A handle to a document's metadata, returned on a successful read.
#[derive(Debug, Clone)]
pub struct DocMetadata {
    pub doc_id: u64,
    pub bytes: std::sync::Arc<[u8]>,
}

/// One completed read, either a hit or a miss/error (§4.7 "not found and
/// disk error are treated identically").
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Ready(DocMetadata),
    Failed,
}

/// The storage layer's async-read capability. A pool instance is sized
/// once at construction (`capacity`) and shared across all pipelines
/// drawing from the same backend.
#[async_trait]
pub trait AsyncReadPool: Send + Sync {
    /// Submit a read. Returns `false` when the pool is already at
    /// capacity and the caller should retry later.
    fn add_async_read(&self, doc_id: u64, user_data: UserData) -> bool;

    /// Drain completed reads (bounded by `timeout_ms`, or until
    /// `expiration` — an absolute deadline — is reached) into `ready` and
    /// `failed`. Returns the number of reads still pending after the
    /// call.
    async fn poll_async_reads(
        &self,
        timeout_ms: u64,
        expiration: Option<std::time::Instant>,
        ready: &mut Vec<(UserData, DocMetadata)>,
        failed: &mut Vec<UserData>,
    ) -> usize;
}

/// An in-memory `AsyncReadPool` used by tests and by any deployment that
/// indexes directly against an in-process document store.
pub struct InMemoryReadPool {
    capacity: usize,
    inflight: parking_lot::Mutex<std::collections::VecDeque<(UserData, ReadOutcome)>>,
}

impl InMemoryReadPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inflight: parking_lot::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// Test/simulation hook: enqueue a completion for a doc that was
    /// previously submitted via `add_async_read`, in whatever order the
    /// simulated disk wants to complete it.
    pub fn complete(&self, user_data: UserData, outcome: ReadOutcome) {
        self.inflight.lock().push_back((user_data, outcome));
    }
}

#[async_trait]
impl AsyncReadPool for InMemoryReadPool {
    fn add_async_read(&self, _doc_id: u64, _user_data: UserData) -> bool {
        self.inflight.lock().len() < self.capacity * 4
    }

    async fn poll_async_reads(
        &self,
        _timeout_ms: u64,
        _expiration: Option<std::time::Instant>,
        ready: &mut Vec<(UserData, DocMetadata)>,
        failed: &mut Vec<UserData>,
    ) -> usize {
        let mut inflight = self.inflight.lock();
        while let Some((user_data, outcome)) = inflight.pop_front() {
            match outcome {
                ReadOutcome::Ready(meta) => ready.push((user_data, meta)),
                ReadOutcome::Failed => failed.push(user_data),
            }
        }
        inflight.len()
    }
}
