//! Bounded async-read pipeline overlapping posting-list iteration with
//! disk I/O while preserving FIFO result order (§4.7).

pub mod pipeline;
pub mod pool;

pub use pipeline::{AsyncReadPipeline, ReadyResult};
pub use pool::{AsyncReadPool, DocMetadata, InMemoryReadPool, ReadOutcome, UserData};
