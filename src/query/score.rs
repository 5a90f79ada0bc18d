//! Scorer: computes a result's score via a pluggable scoring function,
//! optionally building a score-explanation tree (§4.8 step 2, supplemented
//! by `original_source/src/score_explain.h`).

use crate::asyncread::DocMetadata;
use crate::index::IndexResult;

use super::context::QueryContext;
use super::processor::{check_deadline, NextResult, ResultProcessor};
use super::result::{ScoreExplanation, SearchResult};

/// Corpus-wide statistics a scoring function may need (document
/// frequency, total docs, average doc length, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub total_docs: u64,
    pub avg_doc_len: f64,
}

/// `{IndexResult, DocumentMetadata, minScore, indexStats} -> (score,
/// explanation?)` (§4.8).
pub trait ScoringFunction: Send {
    fn score(
        &self,
        result: &IndexResult,
        metadata: Option<&DocMetadata>,
        min_score: f64,
        stats: &IndexStats,
        explain: bool,
    ) -> (f64, Option<ScoreExplanation>);
}

/// Term-frequency weighted by the aggregate field mask's popcount,
/// normalized by average document length — a stand-in for BM25-style
/// scoring, not a faithful BM25 implementation.
pub struct TfScorer;

impl ScoringFunction for TfScorer {
    fn score(
        &self,
        result: &IndexResult,
        _metadata: Option<&DocMetadata>,
        min_score: f64,
        stats: &IndexStats,
        explain: bool,
    ) -> (f64, Option<ScoreExplanation>) {
        let tf = result.frequency as f64;
        let norm = if stats.avg_doc_len > 0.0 {
            stats.avg_doc_len
        } else {
            1.0
        };
        let weighted = tf * result.weight / norm;
        let score = weighted.max(min_score);

        if !explain {
            return (score, None);
        }

        let explanation = if result.children.is_empty() {
            ScoreExplanation::leaf(score, format!("tf={tf} weight={}", result.weight))
        } else {
            let children: Vec<ScoreExplanation> = result
                .children
                .iter()
                .map(|c| ScoreExplanation::leaf(c.weight, format!("child tf={}", c.frequency)))
                .collect();
            ScoreExplanation::combine(score, "aggregate", children)
        };
        (score, Some(explanation))
    }
}

pub struct Scorer {
    upstream: Box<dyn ResultProcessor + Send>,
    function: Box<dyn ScoringFunction>,
    stats: IndexStats,
    min_score: f64,
    explain: bool,
}

impl Scorer {
    pub fn new(
        upstream: Box<dyn ResultProcessor + Send>,
        function: Box<dyn ScoringFunction>,
        stats: IndexStats,
        min_score: f64,
        explain: bool,
    ) -> Self {
        Self {
            upstream,
            function,
            stats,
            min_score,
            explain,
        }
    }
}

impl ResultProcessor for Scorer {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if let Some(terminal) = check_deadline(ctx) {
            return terminal;
        }
        match self.upstream.next(ctx, out) {
            NextResult::Ok => {
                let result = out.as_mut().expect("Ok implies a result was written");
                let ir = result.index_result.as_ref().expect("scanner always attaches one");
                let (score, explanation) = self.function.score(
                    ir,
                    result.doc_metadata.as_ref(),
                    self.min_score,
                    &self.stats,
                    self.explain,
                );
                result.score = score;
                result.score_explanation = explanation;
                NextResult::Ok
            }
            other => other,
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

    fn leaf(doc_id: u64, freq: u32, weight: f64) -> IndexResult {
        IndexResult::leaf(ResultKind::Term, doc_id, 1, freq, weight)
    }

    #[test]
    fn score_reflects_frequency_and_weight() {
        let it = VecIterator::new(vec![leaf(1, 4, 2.0)]);
        let scanner = Scanner::new(Box::new(it));
        let stats = IndexStats {
            total_docs: 100,
            avg_doc_len: 2.0,
        };
        let mut scorer = Scorer::new(Box::new(scanner), Box::new(TfScorer), stats, 0.0, false);
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);

        let mut out = None;
        assert!(matches!(scorer.next(&mut ctx, &mut out), NextResult::Ok));
        let result = out.unwrap();
        assert_eq!(result.score, 4.0);
        assert!(result.score_explanation.is_none());
    }

    #[test]
    fn explain_flag_builds_a_tree() {
        let it = VecIterator::new(vec![leaf(1, 1, 1.0)]);
        let scanner = Scanner::new(Box::new(it));
        let mut scorer = Scorer::new(
            Box::new(scanner),
            Box::new(TfScorer),
            IndexStats::default(),
            0.0,
            true,
        );
        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);
        let mut out = None;
        scorer.next(&mut ctx, &mut out);
        assert!(out.unwrap().score_explanation.is_some());
    }
}
