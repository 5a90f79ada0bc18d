//! Hybrid query parser and result fusion: `FT.HYBRID` declares two or more
//! sub-queries and a combination method, fuses their ranked streams, and
//! produces an aggregation plan over the shared result-processor chain
//! (§4.9).

pub mod fusion;
pub mod parser;

pub use fusion::{fuse, FusionMethod, HybridSearchResult};
pub use parser::{parse_hybrid_args, ArgSpec, HybridPlan, HybridParseError};
