//! Bounded sample history
//!
//! The buffer is pre-filled with absent entries so readers always receive a
//! sequence of the configured length, even before the first sample lands.

use std::collections::VecDeque;

use crate::RuntimeStatistics;

/// Fixed-capacity FIFO of optional runtime statistics (oldest first)
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Option<RuntimeStatistics>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let mut samples = VecDeque::with_capacity(capacity + 1);
        samples.resize(capacity, None);

        Self { samples, capacity }
    }

    /// Append a sample, evicting the oldest entries beyond capacity
    pub fn push(&mut self, sample: Option<RuntimeStatistics>) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<Option<RuntimeStatistics>> {
        self.samples.iter().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn latest(&self) -> Option<&RuntimeStatistics> {
        self.samples.back().and_then(Option::as_ref)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
