//! Bounded FIFO store backing the pool

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Holds the resources that are currently available.
///
/// Dequeue blocks with a deadline; enqueue never blocks because the pool
/// never owns more resources than the store can hold.
pub(crate) struct Store<T> {
    items: Mutex<VecDeque<T>>,
    signal: Condvar,
    capacity: usize,
}

impl<T> Store<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            signal: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue an item and wake one waiter. Hands the item back if full.
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                return Err(item);
            }
            items.push_back(item);
        }
        self.signal.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Dequeue, waiting at most `timeout` for an item to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        // A deadline too far out to represent is an unbounded wait.
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            loop {
                if let Some(item) = items.pop_front() {
                    return Some(item);
                }
                self.signal.wait(&mut items);
            }
        };

        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.signal.wait_until(&mut items, deadline).timed_out() {
                return items.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let store = Store::new(3);
        store.push(1).unwrap();
        store.push(2).unwrap();
        store.push(3).unwrap();

        assert_eq!(store.try_pop(), Some(1));
        assert_eq!(store.try_pop(), Some(2));
        assert_eq!(store.try_pop(), Some(3));
        assert_eq!(store.try_pop(), None);
    }

    #[test]
    fn test_push_never_exceeds_capacity() {
        let store = Store::new(1);
        store.push("a").unwrap();
        assert_eq!(store.push("b"), Err("b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_pop_timeout_expires() {
        let store: Store<u8> = Store::new(1);
        let start = Instant::now();

        assert!(store.pop_timeout(Duration::from_millis(50)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_pop_timeout_wakes_on_push() {
        let store = Arc::new(Store::new(1));
        let producer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                store.push(7).unwrap();
            })
        };

        assert_eq!(store.pop_timeout(Duration::from_secs(5)), Some(7));
        producer.join().unwrap();
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let store = Store::new(1);
        store.push(1).unwrap();
        assert_eq!(store.pop_timeout(Duration::MAX), Some(1));
    }
}
