use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracking runtime activity
///
/// Updated lock-free from the tick loops, snapshotted by the query facade.
#[derive(Debug, Default)]
pub struct RuntimeMetrics {
    ticks_dispatched: AtomicU64,
    trades_committed: AtomicU64,
    trades_rejected: AtomicU64,
    strategy_faults: AtomicU64,
}

/// Point-in-time view of the runtime counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub ticks_dispatched: u64,
    pub trades_committed: u64,
    pub trades_rejected: u64,
    pub strategy_faults: u64,
    pub timestamp: DateTime<Utc>,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trade(&self) {
        self.trades_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_trade(&self) {
        self.trades_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.strategy_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks_dispatched: self.ticks_dispatched.load(Ordering::Relaxed),
            trades_committed: self.trades_committed.load(Ordering::Relaxed),
            trades_rejected: self.trades_rejected.load(Ordering::Relaxed),
            strategy_faults: self.strategy_faults.load(Ordering::Relaxed),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RuntimeMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_trade();
        metrics.record_rejected_trade();
        metrics.record_fault();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks_dispatched, 2);
        assert_eq!(snapshot.trades_committed, 1);
        assert_eq!(snapshot.trades_rejected, 1);
        assert_eq!(snapshot.strategy_faults, 1);
    }
}
