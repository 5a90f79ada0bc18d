//! Timeout/OOM policy for the result-processor chain (§4.8).

/// What happens when the per-query deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Stream whatever was already produced, end with `Eof`, and report
    /// the timeout as a per-query flag rather than an error.
    #[default]
    Return,
    /// Fail the whole query with a `TimedOut` error.
    Fail,
}

/// What happens when the OOM flag is raised mid-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OomPolicy {
    #[default]
    Return,
    Fail,
}

impl TimeoutPolicy {
    pub fn is_return(&self) -> bool {
        matches!(self, TimeoutPolicy::Return)
    }
}

impl OomPolicy {
    pub fn is_return(&self) -> bool {
        matches!(self, OomPolicy::Return)
    }
}
