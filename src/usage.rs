//! Usage reporting

use std::sync::Mutex;

use crate::error::LlmError;
use crate::types::Usage;

/// Receives token usage deltas. Failures are logged by the pipelines and
/// never fail a call.
pub trait UsageSink: Send + Sync {
    fn record(&self, delta: &Usage) -> Result<(), LlmError>;
}

/// Accumulates usage totals across calls.
#[derive(Debug, Default)]
pub struct UsageTracker {
    total: Mutex<Usage>,
    records: Mutex<u64>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Usage {
        *self.total.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Number of deltas recorded.
    pub fn records(&self) -> u64 {
        *self.records.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl UsageSink for UsageTracker {
    fn record(&self, delta: &Usage) -> Result<(), LlmError> {
        self.total
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .merge(delta);
        *self.records.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}
