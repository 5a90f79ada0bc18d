//! Inverted-index posting lists, decode iterators, and their composition
//! into boolean query trees (§3, §4.6).

pub mod intersection;
pub mod iterator;
pub mod offsets;
pub mod posting;
pub mod result;
pub mod union;
pub mod varint;

pub use intersection::IntersectionIterator;
pub use iterator::{IndexIterator, SkipResult, VecIterator};
pub use offsets::TermOffsets;
pub use posting::{encode_block, Posting, PostingBlockReader, PostingListBlock};
pub use result::{IndexResult, ResultKind, TypeMask};
pub use union::UnionIterator;
