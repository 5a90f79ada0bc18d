//! Result-fusion strategies: RRF and linear combination of ranked result
//! streams produced by independent sub-queries (§4.9).

use std::collections::HashMap;

use crate::index::IndexResult;
use crate::query::result::{ResultFlags, SearchResult};
use crate::rlookup::{RLookupKey, RLookupRow};

/// Default reciprocal-rank-fusion constant and window, referenced by the
/// parser when `COMBINE RRF` omits `CONSTANT`/`WINDOW`.
pub const HYBRID_DEFAULT_RRF_CONSTANT: u64 = 60;
pub const HYBRID_DEFAULT_WINDOW: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionMethod {
    Rrf { k: u64, window: usize },
    Linear { alpha: f64, beta: f64 },
}

impl Default for FusionMethod {
    fn default() -> Self {
        FusionMethod::Rrf {
            k: HYBRID_DEFAULT_RRF_CONSTANT,
            window: HYBRID_DEFAULT_WINDOW,
        }
    }
}

/// A doc id's rank (1-based) and score within one sub-query's stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamEntry {
    pub doc_id: u64,
    pub score: f64,
}

/// One sub-query's ranked result stream, already ordered best-first.
pub type Stream = Vec<StreamEntry>;

/// A doc id's combined fusion outcome before the final per-doc result
/// merge: the computed fused score plus which streams contributed.
#[derive(Debug, Clone, Copy, Default)]
struct FusedScore {
    score: f64,
    present: [bool; 2],
}

/// Compute fused scores for every doc id appearing in any of `streams`
/// (§4.9, scenarios S3/S4). Only the first two streams are fused with
/// linear combination (it is defined as a two-way blend); RRF generalizes
/// to any number of streams.
fn fuse_scores(streams: &[Stream], method: FusionMethod) -> HashMap<u64, FusedScore> {
    let mut scores: HashMap<u64, FusedScore> = HashMap::new();
    match method {
        FusionMethod::Rrf { k, window } => {
            for (stream_idx, stream) in streams.iter().enumerate() {
                for (i, entry) in stream.iter().take(window).enumerate() {
                    let rank = (i + 1) as f64;
                    let contribution = 1.0 / (k as f64 + rank);
                    let slot = scores.entry(entry.doc_id).or_default();
                    slot.score += contribution;
                    if stream_idx < 2 {
                        slot.present[stream_idx] = true;
                    }
                }
            }
        }
        FusionMethod::Linear { alpha, beta } => {
            let weights = [alpha, beta];
            for (stream_idx, stream) in streams.iter().enumerate().take(2) {
                let weight = weights[stream_idx];
                for entry in stream {
                    let slot = scores.entry(entry.doc_id).or_default();
                    slot.score += weight * entry.score;
                    slot.present[stream_idx] = true;
                }
            }
        }
    }
    scores
}

/// Doc ids ranked descending by fused score (ties broken by ascending doc
/// id, matching the sorter's tie-break in §4.8).
pub fn fuse(streams: &[Stream], method: FusionMethod) -> Vec<(u64, f64)> {
    let scores = fuse_scores(streams, method);
    let mut ranked: Vec<(u64, f64)> = scores.into_iter().map(|(id, s)| (id, s.score)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    ranked
}

/// A merged per-doc result: fused score, union of per-stream flags, the
/// primary `IndexResult` (first non-null stream, preferring stream 0),
/// and a row assembled from every contributing stream's field values.
pub struct HybridSearchResult {
    pub doc_id: u64,
    pub score: f64,
    primary: Option<SearchResult>,
}

impl HybridSearchResult {
    /// Merge `candidates` (one `Some(SearchResult)` per stream that found
    /// this doc id, `None` for streams that didn't) into a single result.
    /// The primary's `IndexResult` is kept; its row is wiped and replaced
    /// by the union of every source row, written through `dest_for` (a
    /// per-source-key -> dest-key mapping via the shared lookup table).
    /// The merged flags byte is the union of every stream's flags.
    pub fn merge(
        doc_id: u64,
        score: f64,
        candidates: Vec<Option<SearchResult>>,
        dest_for: impl Fn(usize, RLookupKey) -> Option<RLookupKey>,
    ) -> Self {
        let mut flags = ResultFlags::empty();
        let mut primary_idx = None;
        for (i, c) in candidates.iter().enumerate() {
            if let Some(r) = c {
                flags.insert(r.flags);
                if primary_idx.is_none() {
                    primary_idx = Some(i);
                }
            }
        }

        let mut merged_row = RLookupRow::new();
        for (i, c) in candidates.iter().enumerate() {
            if let Some(r) = c {
                for key_idx in 0..r.row.len_hint() {
                    let src_key = RLookupKey(key_idx);
                    if let Some(v) = r.row.get(src_key) {
                        if let Some(dk) = dest_for(i, src_key) {
                            merged_row.set(dk, v.clone());
                        }
                    }
                }
            }
        }

        let mut owned: Vec<Option<SearchResult>> = candidates;
        let primary = primary_idx.map(|idx| {
            let mut r = owned[idx].take().expect("primary_idx points at Some");
            r.row.clear();
            r.row = merged_row;
            r.score = score;
            r.flags = flags;
            r
        });

        // HybridSearchResult releases its reference to every non-primary
        // candidate here (drop of `owned`), avoiding a double free of the
        // primary's `IndexResult`, which is owned solely by `primary` now.
        drop(owned);

        Self { doc_id, score, primary }
    }

    pub fn into_search_result(self) -> Option<SearchResult> {
        self.primary
    }

    pub fn index_result(&self) -> Option<&IndexResult> {
        self.primary.as_ref().and_then(|r| r.index_result.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(docs: &[u64]) -> Stream {
        docs.iter()
            .map(|&d| StreamEntry { doc_id: d, score: 1.0 })
            .collect()
    }

    #[test]
    fn scenario_s3_rrf_fusion_orders_d1_d3_d2_d4() {
        let a = stream(&[1, 2, 3]);
        let b = stream(&[3, 1, 4]);
        let ranked = fuse(&[a, b], FusionMethod::Rrf { k: 60, window: usize::MAX });
        let order: Vec<u64> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![1, 3, 2, 4]);
    }

    #[test]
    fn scenario_s3_rrf_scores_match_formula() {
        let a = stream(&[1, 2, 3]);
        let b = stream(&[3, 1, 4]);
        let ranked = fuse(&[a, b], FusionMethod::Rrf { k: 60, window: usize::MAX });
        let by_id: HashMap<u64, f64> = ranked.into_iter().collect();
        let eps = 1e-9;
        assert!((by_id[&1] - (1.0 / 61.0 + 1.0 / 62.0)).abs() < eps);
        assert!((by_id[&2] - (1.0 / 61.0)).abs() < eps);
        assert!((by_id[&3] - (1.0 / 63.0 + 1.0 / 61.0)).abs() < eps);
        assert!((by_id[&4] - (1.0 / 63.0)).abs() < eps);
    }

    #[test]
    fn scenario_s4_linear_fusion_with_missing_values() {
        let a: Stream = vec![StreamEntry { doc_id: 1, score: 0.9 }];
        let b: Stream = vec![StreamEntry { doc_id: 2, score: 0.8 }];
        let ranked = fuse(&[a, b], FusionMethod::Linear { alpha: 0.5, beta: 0.5 });
        let by_id: HashMap<u64, f64> = ranked.into_iter().collect();
        assert!((by_id[&1] - 0.45).abs() < 1e-9);
        assert!((by_id[&2] - 0.40).abs() < 1e-9);
    }

    #[test]
    fn rrf_window_caps_stream_depth() {
        let a = stream(&[1, 2, 3]);
        let b = stream(&[4, 5, 6]);
        let ranked = fuse(&[a, b], FusionMethod::Rrf { k: 60, window: 1 });
        let ids: std::collections::HashSet<u64> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [1u64, 4u64].into_iter().collect());
    }
}
