//! A bounded, blocking, stable priority queue: FIFO within a priority bucket,
//! lower priority numbers drained first.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Highest-urgency priority: used for the immediate-shutdown sentinel, which
/// must pre-empt every task still sitting in the queue.
pub const IMMEDIATE: u8 = 0;
pub const CREATE_COMPLETE: u8 = 1;
pub const PART: u8 = 5;
pub const PRINT: u8 = 8;
pub const CLOSE: u8 = 8;
pub const BASIC: u8 = 10;
pub const SHUTDOWN: u8 = 10;
pub const IMMEDIATE_SHUTDOWN: u8 = IMMEDIATE;

const MAX_PRIORITY: usize = 10;

struct Inner<T> {
    buckets: Vec<VecDeque<T>>,
    len: usize,
}

/// Bounded MPMC queue. `max_priority` values above [`MAX_PRIORITY`] are
/// clamped to the least-important bucket rather than rejected.
pub struct StablePriorityQueue<T> {
    state: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> StablePriorityQueue<T> {
    pub fn new(capacity: usize) -> Self {
        StablePriorityQueue {
            state: Mutex::new(Inner {
                buckets: (0..=MAX_PRIORITY).map(|_| VecDeque::new()).collect(),
                len: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until there is room, then enqueues `item` at `priority`.
    pub fn put(&self, priority: u8, item: T) {
        let priority = (priority as usize).min(MAX_PRIORITY);
        let mut inner = self.state.lock().unwrap();
        while inner.len >= self.capacity {
            inner = self.not_full.wait(inner).unwrap();
        }
        inner.buckets[priority].push_back(item);
        inner.len += 1;
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available, then returns the lowest-priority
    /// (most urgent), earliest-enqueued one.
    pub fn get(&self) -> T {
        let mut inner = self.state.lock().unwrap();
        loop {
            if let Some(item) = Self::pop(&mut inner) {
                drop(inner);
                self.not_full.notify_one();
                return item;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Like [`get`](Self::get) but gives up after `timeout`, so a poller can
    /// periodically check an external stop condition.
    pub fn get_timeout(&self, timeout: Duration) -> Option<T> {
        let mut inner = self.state.lock().unwrap();
        loop {
            if let Some(item) = Self::pop(&mut inner) {
                drop(inner);
                self.not_full.notify_one();
                return Some(item);
            }
            let (guard, result) = self.not_empty.wait_timeout(inner, timeout).unwrap();
            inner = guard;
            if result.timed_out() {
                return None;
            }
        }
    }

    fn pop(inner: &mut Inner<T>) -> Option<T> {
        for bucket in inner.buckets.iter_mut() {
            if let Some(item) = bucket.pop_front() {
                inner.len -= 1;
                return Some(item);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drains_lowest_priority_first() {
        let q = StablePriorityQueue::new(10);
        q.put(BASIC, "basic");
        q.put(PART, "part");
        q.put(IMMEDIATE, "immediate");
        assert_eq!(q.get(), "immediate");
        assert_eq!(q.get(), "part");
        assert_eq!(q.get(), "basic");
    }

    #[test]
    fn same_priority_is_fifo() {
        let q = StablePriorityQueue::new(10);
        q.put(PART, "one");
        q.put(PART, "two");
        q.put(PART, "three");
        assert_eq!(q.get(), "one");
        assert_eq!(q.get(), "two");
        assert_eq!(q.get(), "three");
    }

    #[test]
    fn put_blocks_until_capacity_frees() {
        let q = Arc::new(StablePriorityQueue::new(1));
        q.put(BASIC, 1);
        let q2 = Arc::clone(&q);
        let handle = std::thread::spawn(move || {
            q2.put(BASIC, 2);
        });
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(q.get(), 1);
        handle.join().unwrap();
        assert_eq!(q.get(), 2);
    }

    #[test]
    fn get_timeout_expires_when_empty() {
        let q: StablePriorityQueue<i32> = StablePriorityQueue::new(1);
        assert_eq!(q.get_timeout(Duration::from_millis(20)), None);
    }
}
