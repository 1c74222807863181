use crate::engine::types::{Decision, VerdictSource};

#[derive(Debug, Clone)]
pub struct DecisionLogEntry {
    /// URL the verdict was computed for.
    pub url: String,
    /// URL of the intercepted request.
    pub original_url: String,
    pub decision: Decision,
    pub source: VerdictSource,
    /// Network action taken: `proceed`, `cancel` or `redirect`.
    pub action: &'static str,
    pub latency_ms: u64,
}

pub trait DecisionLogSink: Send + Sync {
    fn log(&self, entry: &DecisionLogEntry);
}
