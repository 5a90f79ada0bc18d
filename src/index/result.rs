//! `IndexResult`: the polymorphic record produced by posting-list
//! iterators (§3).

use super::offsets::TermOffsets;

/// Which shape of iterator produced an [`IndexResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Term,
    Numeric,
    Intersection,
    Union,
    HybridMetric,
    Virtual,
    Metric,
}

/// Bitmask of child result kinds present under an aggregate node, ORed
/// together as children are added (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeMask(pub u8);

impl TypeMask {
    pub fn of(kind: ResultKind) -> Self {
        TypeMask(1 << (kind as u8))
    }

    pub fn merge(self, other: TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }

    pub fn contains(&self, kind: ResultKind) -> bool {
        self.0 & (1 << (kind as u8)) != 0
    }
}

/// The polymorphic record produced by posting-list iterators.
#[derive(Debug, Clone)]
pub struct IndexResult {
    pub kind: ResultKind,
    pub doc_id: u64,
    pub field_mask: u128,
    pub frequency: u32,
    pub offsets: Option<TermOffsets>,
    pub weight: f64,
    /// Aggregate variants (`Intersection`/`Union`/`HybridMetric`) hold
    /// their children here; leaf variants (`Term`/`Numeric`/`Virtual`/
    /// `Metric`) leave this empty.
    pub children: Vec<IndexResult>,
    pub child_type_mask: TypeMask,
}

impl IndexResult {
    pub fn leaf(kind: ResultKind, doc_id: u64, field_mask: u128, frequency: u32, weight: f64) -> Self {
        Self {
            kind,
            doc_id,
            field_mask,
            frequency,
            offsets: None,
            weight,
            children: Vec::new(),
            child_type_mask: TypeMask::default(),
        }
    }

    pub fn aggregate(kind: ResultKind, doc_id: u64, children: Vec<IndexResult>) -> Self {
        let field_mask = children.iter().fold(0u128, |acc, c| acc | c.field_mask);
        let frequency = children.iter().map(|c| c.frequency).sum();
        let child_type_mask = children
            .iter()
            .fold(TypeMask::default(), |acc, c| acc.merge(TypeMask::of(c.kind)));
        let weight = children.iter().map(|c| c.weight).sum();
        Self {
            kind,
            doc_id,
            field_mask,
            frequency,
            offsets: None,
            weight,
            children,
            child_type_mask,
        }
    }

    /// Deep-copy, used when handing a result off to the async-read
    /// pipeline (§3 "IndexResult lifetime").
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_ors_field_masks_and_sums_frequency() {
        let a = IndexResult::leaf(ResultKind::Term, 1, 0b01, 2, 1.0);
        let b = IndexResult::leaf(ResultKind::Numeric, 1, 0b10, 3, 1.0);
        let agg = IndexResult::aggregate(ResultKind::Intersection, 1, vec![a, b]);
        assert_eq!(agg.field_mask, 0b11);
        assert_eq!(agg.frequency, 5);
        assert!(agg.child_type_mask.contains(ResultKind::Term));
        assert!(agg.child_type_mask.contains(ResultKind::Numeric));
        assert!(!agg.child_type_mask.contains(ResultKind::Union));
    }
}
