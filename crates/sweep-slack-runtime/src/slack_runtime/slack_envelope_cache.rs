use std::collections::{HashSet, VecDeque};

/// Bounded in-memory set of envelope ids already handled. Slack redelivers
/// envelopes whose acknowledgement it did not see; the oldest ids are evicted
/// once `cap` is exceeded.
#[derive(Debug)]
pub(super) struct ProcessedEnvelopeCache {
    cap: usize,
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl ProcessedEnvelopeCache {
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

    /// Returns `false` when the key was already present.
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

    pub(super) fn len(&self) -> usize {
        self.order.len()
    }
}
