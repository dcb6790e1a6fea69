// Bounded ring buffer of freshly pushed samples
use std::collections::VecDeque;

pub const DEFAULT_LIVE_BUFFER_CAPACITY: usize = 500;

#[derive(Debug, Clone)]
pub struct LiveBuffer<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> LiveBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the single oldest sample when full.
    pub fn add(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

impl<T> Default for LiveBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut buffer = LiveBuffer::new(3);
        for i in 0..7 {
            buffer.add(i);
            assert!(buffer.len() <= 3);
        }
        let kept: Vec<_> = buffer.iter().copied().collect();
        assert_eq!(kept, vec![4, 5, 6]);
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let mut buffer = LiveBuffer::new(10);
        buffer.add("a");
        buffer.add("b");
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_default_capacity() {
        let mut buffer = LiveBuffer::default();
        for i in 0..1_000 {
            buffer.add(i);
        }
        assert_eq!(buffer.len(), DEFAULT_LIVE_BUFFER_CAPACITY);
        assert_eq!(buffer.iter().next(), Some(&500));
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut buffer = LiveBuffer::new(0);
        buffer.add(1);
        buffer.add(2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2]);
    }
}
