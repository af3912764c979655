use std::collections::{HashSet, VecDeque};

/// Bounded in-memory record of recently handled event keys.
///
/// Slack redelivers envelopes it considers unacknowledged; the oldest key is
/// evicted once `cap` keys are held.
pub(super) struct ProcessedEventWindow {
    cap: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl ProcessedEventWindow {
    pub(super) fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            order: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    pub(super) fn contains(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Records `key`, returning false when it was already present.
    pub(super) fn mark_processed(&mut self, key: &str) -> bool {
        if self.index.contains(key) {
            return false;
        }
        self.order.push_back(key.to_string());
        self.index.insert(key.to_string());
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }
}
