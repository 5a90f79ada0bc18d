//! Shared mutable context threaded through one query's result-processor
//! chain (§4.8).

use std::time::Instant;

use crate::error::Error;

use super::policy::{OomPolicy, TimeoutPolicy};

#[derive(Debug)]
pub struct QueryContext {
    pub total_results: u64,
    pub result_limit: u64,
    pub timeout_deadline: Option<Instant>,
    pub oom_flag: bool,
    pub error: Option<Error>,
    pub timeout_policy: TimeoutPolicy,
    pub oom_policy: OomPolicy,
    /// Set when a `Return`-policy timeout or OOM truncated the results;
    /// surfaced to the client as a flag rather than an error (§4.8, §7).
    pub partial: bool,
    /// Set when this is a profiling query — a timeout/OOM during
    /// aggregation never becomes a client-visible error in profile mode
    /// even under `Fail` policy.
    pub profile: bool,
}

impl QueryContext {
    pub fn new(result_limit: u64, timeout_policy: TimeoutPolicy, oom_policy: OomPolicy) -> Self {
        Self {
            total_results: 0,
            result_limit,
            timeout_deadline: None,
            oom_flag: false,
            error: None,
            timeout_policy,
            oom_policy,
            partial: false,
            profile: false,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.timeout_deadline = Some(deadline);
        self
    }

    pub fn is_timed_out(&self) -> bool {
        self.timeout_deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false)
    }

    /// Should this chain convert a timeout/OOM at boundary-check time into
    /// a terminal error, or stream partial results and flag it instead?
    pub fn should_fail_on_timeout(&self) -> bool {
        self.timeout_policy == TimeoutPolicy::Fail && !self.profile
    }

    pub fn should_fail_on_oom(&self) -> bool {
        self.oom_policy == OomPolicy::Fail && !self.profile
    }
}
