use std::collections::VecDeque;

/// Bounded FIFO of recent pixel-space wrist positions along one axis.
///
/// Appends at the tail and evicts at the head once over capacity, so the
/// window always holds the most recent `capacity` samples.
#[derive(Clone, Debug)]
pub struct MotionHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl MotionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// `newest - oldest`, only once the window is full.
    pub fn displacement(&self) -> Option<f32> {
        if !self.is_full() {
            return None;
        }
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;
        Some(newest - oldest)
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut history = MotionHistory::new(3);
        for sample in [1.0, 2.0, 3.0, 10.0] {
            history.push(sample);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.displacement(), Some(8.0));
    }

    #[test]
    fn displacement_requires_full_window() {
        let mut history = MotionHistory::new(5);
        for sample in [0.0, 100.0, 200.0, 300.0] {
            history.push(sample);
        }
        assert_eq!(history.displacement(), None);
        history.push(400.0);
        assert_eq!(history.displacement(), Some(400.0));
    }

    #[test]
    fn clear_empties_window() {
        let mut history = MotionHistory::new(2);
        history.push(1.0);
        history.push(2.0);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.displacement(), None);
    }
}
