use std::collections::{HashMap, VecDeque};

use crate::taxi::TaxiId;

/// Per-taxi record of recent allocation times, bounded in length so a busy
/// taxi's history cannot grow without limit.
#[derive(Debug, Clone, Default)]
pub struct FairnessHistory {
    capacity: usize,
    allocations: HashMap<TaxiId, VecDeque<u64>>,
}

impl FairnessHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            allocations: HashMap::new(),
        }
    }

    pub fn record(&mut self, taxi: TaxiId, at: u64) {
        let history = self.allocations.entry(taxi).or_default();
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(at);
    }

    /// Allocations at or after `now - window`.
    pub fn count_within(&self, taxi: TaxiId, now: u64, window: u64) -> usize {
        let cutoff = now.saturating_sub(window);
        self.allocations
            .get(&taxi)
            .map(|h| h.iter().filter(|&&at| at >= cutoff).count())
            .unwrap_or(0)
    }

    /// Drops timestamps that can no longer fall inside the window.
    pub fn prune(&mut self, now: u64, window: u64) {
        let cutoff = now.saturating_sub(window);
        for history in self.allocations.values_mut() {
            while history.front().is_some_and(|&at| at < cutoff) {
                history.pop_front();
            }
        }
        self.allocations.retain(|_, h| !h.is_empty());
    }
}
