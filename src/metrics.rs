//! Per-step results and the loss/accuracy history kept for plotting.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Outcome of one `Network::train_batch` call.
pub struct BatchReport {
    /// Mean cross-entropy over the batch.
    pub loss: f32,
    /// Fraction of samples whose argmax matched the label.
    pub accuracy: f32,
    /// Number of samples actually used (at most `MAX_BATCH`).
    pub samples: usize,
    /// Samples whose softmax denominator was degenerate and fell back to 0.5/0.5.
    pub degenerate: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub loss: f32,
    pub accuracy: f32,
}

#[derive(Debug, Clone)]
/// Loss/accuracy history.
///
/// Bounded histories drop the oldest entry on overflow and keep the rest in order.
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl History {
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
        }
    }

    /// `0` means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            Self::unbounded()
        } else {
            Self::bounded(capacity)
        }
    }

    pub fn push(&mut self, loss: f32, accuracy: f32) {
        if self.capacity == Some(self.entries.len()) {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { loss, accuracy });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn last(&self) -> Option<HistoryEntry> {
        self.entries.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    /// Loss values oldest first, as a contiguous buffer for plotting widgets.
    pub fn losses(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.loss).collect()
    }

    pub fn accuracies(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.accuracy).collect()
    }
}
