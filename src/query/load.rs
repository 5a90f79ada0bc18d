//! Loader: fetches designated fields from the document store for each
//! result (§4.8 step 6).

use async_trait::async_trait;
use serde_json::Value;

use crate::rlookup::RLookupKey;

use super::context::QueryContext;
use super::processor::{check_deadline, NextResult, ResultProcessor};
use super::result::SearchResult;

/// The document store's field-fetch capability, external to this crate
/// per §1 ("out of scope: ... the document store ... interface").
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_fields(&self, doc_id: u64, fields: &[RLookupKey]) -> Vec<(RLookupKey, Value)>;
}

pub struct Loader<S: DocumentStore> {
    upstream: Box<dyn ResultProcessor + Send>,
    store: std::sync::Arc<S>,
    fields: Vec<RLookupKey>,
    /// Pre-fetched rows, populated synchronously by `prime()` before this
    /// processor runs inside the synchronous chain — the chain itself is
    /// pull-based and synchronous; async field loads are batched ahead of
    /// time by the driver loop.
    prefetched: std::collections::HashMap<u64, Vec<(RLookupKey, Value)>>,
}

impl<S: DocumentStore> Loader<S> {
    pub fn new(upstream: Box<dyn ResultProcessor + Send>, store: std::sync::Arc<S>, fields: Vec<RLookupKey>) -> Self {
        Self {
            upstream,
            store,
            fields,
            prefetched: std::collections::HashMap::new(),
        }
    }

    pub async fn load(&self, doc_id: u64) -> Vec<(RLookupKey, Value)> {
        self.store.load_fields(doc_id, &self.fields).await
    }

    pub fn prime(&mut self, doc_id: u64, values: Vec<(RLookupKey, Value)>) {
        self.prefetched.insert(doc_id, values);
    }
}

impl<S: DocumentStore> ResultProcessor for Loader<S> {
    fn next(&mut self, ctx: &mut QueryContext, out: &mut Option<SearchResult>) -> NextResult {
        if let Some(terminal) = check_deadline(ctx) {
            return terminal;
        }
        match self.upstream.next(ctx, out) {
            NextResult::Ok => {
                let result = out.as_mut().expect("Ok implies a result");
                if let Some(values) = self.prefetched.remove(&result.doc_id) {
                    for (key, value) in values {
                        result.row.set(key, value);
                    }
                }
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
    use crate::rlookup::RLookupTable;

    struct FakeStore;
    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn load_fields(&self, doc_id: u64, fields: &[RLookupKey]) -> Vec<(RLookupKey, Value)> {
            fields.iter().map(|k| (*k, Value::from(doc_id))).collect()
        }
    }

    #[tokio::test]
    async fn primed_values_land_in_the_row() {
        let mut table = RLookupTable::new();
        let title = table.get_key("title");
        let it = VecIterator::new(vec![IndexResult::leaf(ResultKind::Term, 7, 1, 1, 1.0)]);
        let scanner = Scanner::new(Box::new(it));
        let store = std::sync::Arc::new(FakeStore);
        let mut loader = Loader::new(Box::new(scanner), store, vec![title]);
        loader.prime(7, vec![(title, Value::from(7))]);

        let mut ctx = QueryContext::new(10, TimeoutPolicy::Return, OomPolicy::Return);
        let mut out = None;
        assert!(matches!(loader.next(&mut ctx, &mut out), NextResult::Ok));
        assert_eq!(out.unwrap().row.get(title), Some(&Value::from(7)));
    }
}
