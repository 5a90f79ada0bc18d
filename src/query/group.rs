//! Grouper/Reducer: hash-group by one or more property keys, each group
//! carrying its own reducer state (§4.8 step 5; quantile and
//! first-value-by-sort reducers supplemented from
//! `original_source/src/util/quantile.c` and
//! `original_source/src/aggregate/reducers/first_value.c`).

use std::collections::HashMap;

use serde_json::Value;

use crate::rlookup::RLookupKey;

use super::context::QueryContext;
use super::processor::{NextResult, ResultProcessor};
use super::result::SearchResult;
use super::sort::SortDirection;

/// Per-group accumulator. Each reducer kind owns its running state and
/// produces one output value when the group is finalized.
pub trait Reducer: Send {
    fn add(&mut self, row_value: Option<&Value>, sort_value: Option<&Value>);
    fn finalize(&self) -> Value;
    fn alias(&self) -> &str;
}

pub struct CountReducer {
    pub alias: String,
    count: u64,
}

impl CountReducer {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            count: 0,
        }
    }
}

impl Reducer for CountReducer {
    fn add(&mut self, _row_value: Option<&Value>, _sort_value: Option<&Value>) {
        self.count += 1;
    }
    fn finalize(&self) -> Value {
        Value::from(self.count)
    }
    fn alias(&self) -> &str {
        &self.alias
    }
}

pub struct SumReducer {
    pub alias: String,
    sum: f64,
}

impl SumReducer {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            sum: 0.0,
        }
    }
}

impl Reducer for SumReducer {
    fn add(&mut self, row_value: Option<&Value>, _sort_value: Option<&Value>) {
        if let Some(v) = row_value.and_then(|v| v.as_f64()) {
            self.sum += v;
        }
    }
    fn finalize(&self) -> Value {
        Value::from(self.sum)
    }
    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Bounded-buffer quantile sketch: accumulates samples until `capacity`,
/// then compacts by sorting and halving (keeping every other sample),
/// doubling each surviving sample's implicit weight. Approximate but
/// O(capacity) memory regardless of stream length.
pub struct QuantileReducer {
    pub alias: String,
    quantile: f64,
    capacity: usize,
    buffer: Vec<(f64, u64)>,
}

impl QuantileReducer {
    pub fn new(alias: impl Into<String>, quantile: f64, capacity: usize) -> Self {
        Self {
            alias: alias.into(),
            quantile: quantile.clamp(0.0, 1.0),
            capacity: capacity.max(2),
            buffer: Vec::new(),
        }
    }

    fn compact(&mut self) {
        self.buffer.sort_by(|a, b| a.0.total_cmp(&b.0));
        let compacted: Vec<(f64, u64)> = self
            .buffer
            .chunks(2)
            .map(|pair| {
                let weight: u64 = pair.iter().map(|(_, w)| w).sum();
                (pair[0].0, weight)
            })
            .collect();
        self.buffer = compacted;
    }
}

impl Reducer for QuantileReducer {
    fn add(&mut self, row_value: Option<&Value>, _sort_value: Option<&Value>) {
        let Some(v) = row_value.and_then(|v| v.as_f64()) else {
            return;
        };
        self.buffer.push((v, 1));
        if self.buffer.len() > self.capacity {
            self.compact();
        }
    }

    fn finalize(&self) -> Value {
        if self.buffer.is_empty() {
            return Value::Null;
        }
        let mut sorted = self.buffer.clone();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total: u64 = sorted.iter().map(|(_, w)| w).sum();
        let target = (self.quantile * total as f64).round() as u64;
        let mut cumulative = 0u64;
        for (value, weight) in &sorted {
            cumulative += weight;
            if cumulative >= target.max(1) {
                return Value::from(*value);
            }
        }
        Value::from(sorted.last().unwrap().0)
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Keeps the row value from whichever input row sorts first/last by a
/// named property, kept distinct from a generic "first" reducer per the
/// original's dedicated implementation.
pub struct FirstValueBySortReducer {
    pub alias: String,
    direction: SortDirection,
    best_sort_value: Option<f64>,
    best_value: Value,
}

impl FirstValueBySortReducer {
    pub fn new(alias: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            alias: alias.into(),
            direction,
            best_sort_value: None,
            best_value: Value::Null,
        }
    }
}

impl Reducer for FirstValueBySortReducer {
    fn add(&mut self, row_value: Option<&Value>, sort_value: Option<&Value>) {
        let Some(candidate) = sort_value.and_then(|v| v.as_f64()) else {
            return;
        };
        let better = match self.best_sort_value {
            None => true,
            Some(current) => match self.direction {
                SortDirection::Asc => candidate < current,
                SortDirection::Desc => candidate > current,
            },
        };
        if better {
            self.best_sort_value = Some(candidate);
            self.best_value = row_value.cloned().unwrap_or(Value::Null);
        }
    }

    fn finalize(&self) -> Value {
        self.best_value.clone()
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// Spec for one reduce step: which column feeds it, which (optional)
/// column drives ordering (for `FirstValueBySort`), and a factory for a
/// fresh per-group `Reducer`.
pub struct ReduceSpec {
    pub source: Option<RLookupKey>,
    pub sort_source: Option<RLookupKey>,
    pub output: RLookupKey,
    pub make_reducer: Box<dyn Fn() -> Box<dyn Reducer> + Send>,
}

pub struct Grouper {
    upstream: Box<dyn ResultProcessor + Send>,
    group_keys: Vec<RLookupKey>,
    reduce_specs: Vec<ReduceSpec>,
    groups: HashMap<Vec<Value>, Vec<Box<dyn Reducer>>>,
    group_order: Vec<Vec<Value>>,
    drained: bool,
    emit_index: usize,
}

impl Grouper {
    pub fn new(upstream: Box<dyn ResultProcessor + Send>, group_keys: Vec<RLookupKey>, reduce_specs: Vec<ReduceSpec>) -> Self {
        Self {
            upstream,
            group_keys,
            reduce_specs,
            groups: HashMap::new(),
            group_order: Vec::new(),
            drained: false,
            emit_index: 0,
        }
    }

    fn group_key_values(&self, result: &SearchResult) -> Vec<Value> {
        self.group_keys
            .iter()
            .map(|k| result.row.get(*k).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl ResultProcessor for Grouper {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if !self.drained {
            self.drained = true;
            loop {
                let mut upstream_out = None;
                match self.upstream.next(ctx, &mut upstream_out) {
                    NextResult::Ok => {
                        let result = upstream_out.expect("Ok implies a result");
                        let key = self.group_key_values(&result);
                        if !self.groups.contains_key(&key) {
                            self.group_order.push(key.clone());
                            let fresh: Vec<Box<dyn Reducer>> =
                                self.reduce_specs.iter().map(|s| (s.make_reducer)()).collect();
                            self.groups.insert(key.clone(), fresh);
                        }
                        let reducers = self.groups.get_mut(&key).expect("just inserted");
                        for (reducer, spec) in reducers.iter_mut().zip(self.reduce_specs.iter()) {
                            let row_value = spec.source.and_then(|k| result.row.get(k));
                            let sort_value = spec.sort_source.and_then(|k| result.row.get(k));
                            reducer.add(row_value, sort_value);
                        }
                    }
                    NextResult::Eof => break,
                    terminal @ (NextResult::TimedOut | NextResult::Error(_)) => return terminal,
                    NextResult::Paused => continue,
                }
            }
        }

        let Some(key) = self.group_order.get(self.emit_index).cloned() else {
            return NextResult::Eof;
        };
        self.emit_index += 1;

        let reducers = self.groups.get(&key).expect("every queued key has a group");
        let mut row = crate::rlookup::RLookupRow::new();
        for (i, group_key) in self.group_keys.iter().enumerate() {
            row.set(*group_key, key[i].clone());
        }
        for (reducer, spec) in reducers.iter().zip(self.reduce_specs.iter()) {
            row.set(spec.output, reducer.finalize());
        }

        let ir = crate::index::IndexResult::leaf(crate::index::ResultKind::Virtual, self.emit_index as u64, 0, 0, 0.0);
        let mut result = SearchResult::new(self.emit_index as u64, ir);
        result.row = row;
        *out = Some(result);
        NextResult::Ok
    }

    fn free(&mut self) {
        self.upstream.free();
    }
}
