use std::collections::vec_deque;
use std::collections::VecDeque;

use super::types::MetricSample;

pub const DEFAULT_HISTORY_SIZE: usize = 60;

/// Fixed-capacity FIFO buffer. Inserting into a full window drops the oldest
/// element; there is no other way to remove one.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RollingWindow<T> {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `value`, returning the evicted oldest element if the window was
    /// full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> RollingWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl<'a, T> IntoIterator for &'a RollingWindow<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Per-metric series for charting.
impl RollingWindow<MetricSample> {
    pub fn timestamps(&self) -> Vec<f64> {
        self.iter().map(|s| s.timestamp).collect()
    }

    pub fn cpu_series(&self) -> Vec<f32> {
        self.iter().map(|s| s.cpu_percent).collect()
    }

    pub fn ram_series(&self) -> Vec<f32> {
        self.iter().map(|s| s.ram_percent).collect()
    }

    pub fn net_series(&self) -> Vec<f64> {
        self.iter().map(|s| s.net_kb_per_sec).collect()
    }
}
