use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Bounded drop-oldest ring shared between the event loop (writer) and an
/// application thread (reader). When a push overruns the reader the oldest
/// entry is discarded and the missed counter incremented; the counter is the
/// only state written across threads without the lock.
#[derive(Debug)]
pub struct Ring<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    missed: AtomicU32,
}

impl<T> Ring<T> {
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            missed: AtomicU32::new(0),
        })
    }

    pub fn push(&self, value: T) {
        let mut queue = self.queue.lock().expect("ring lock poisoned");
        if queue.len() == self.capacity {
            queue.pop_front();
            self.missed.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(value);
    }

    pub fn pop(&self) -> Option<T> {
        self.queue.lock().expect("ring lock poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("ring lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missed_count(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_and_counts_misses() {
        let ring = Ring::with_capacity(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.missed_count(), 2);
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), Some(4));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn fifo_below_capacity() {
        let ring = Ring::with_capacity(8);
        ring.push("a");
        ring.push("b");
        assert_eq!(ring.pop(), Some("a"));
        assert_eq!(ring.pop(), Some("b"));
        assert_eq!(ring.missed_count(), 0);
    }
}
