use crate::semaphore::Semaphore;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A capacity-limited FIFO queue that blocks producers when full and
/// consumers when empty.
///
/// Capacity and availability are tracked by two counting semaphores that are
/// waited on *before* the structural lock is taken, so no thread ever holds
/// the lock while it is parked. The lock only guards linking and unlinking
/// items.
///
/// Share it between threads with `Arc<BoundedQueue<T>>`.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    free_slots: Semaphore,
    available: Semaphore,
    capacity: usize,
    blocked_pushes: AtomicU64,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            free_slots: Semaphore::new(capacity),
            available: Semaphore::new(0),
            capacity,
            blocked_pushes: AtomicU64::new(0),
        }
    }

    /// Append `item` at the tail, waiting for a free slot if the queue is full
    pub fn push(&self, item: T) {
        if !self.free_slots.try_acquire() {
            self.blocked_pushes.fetch_add(1, Ordering::Relaxed);
            self.free_slots.acquire();
        }
        self.link(item);
    }

    /// Append `item` only if a slot is free right now
    pub fn try_push(&self, item: T) -> Result<(), T> {
        if !self.free_slots.try_acquire() {
            return Err(item);
        }
        self.link(item);
        Ok(())
    }

    /// Append `item`, waiting at most `timeout` for a free slot.
    /// The item is handed back if the wait expires.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        if !self.free_slots.try_acquire() {
            self.blocked_pushes.fetch_add(1, Ordering::Relaxed);
            if !self.free_slots.acquire_timeout(timeout) {
                return Err(item);
            }
        }
        self.link(item);
        Ok(())
    }

    /// Remove the head item, waiting until one is available
    pub fn pop(&self) -> T {
        self.available.acquire();
        self.unlink()
    }

    /// Remove the head item if one is available right now
    pub fn try_pop(&self) -> Option<T> {
        if !self.available.try_acquire() {
            return None;
        }
        Some(self.unlink())
    }

    /// Remove the head item, waiting at most `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        if !self.available.acquire_timeout(timeout) {
            return None;
        }
        Some(self.unlink())
    }

    /// Snapshot of emptiness. Stale as soon as it returns if other threads
    /// are pushing or popping; never use it to decide that draining is done.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Snapshot of the number of linked items
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Maximum number of items the queue holds
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pushes that found the queue full and had to wait
    pub fn blocked_pushes(&self) -> u64 {
        self.blocked_pushes.load(Ordering::Relaxed)
    }

    // Caller holds a free-slot permit.
    fn link(&self, item: T) {
        {
            let mut items = self.items.lock();
            assert!(
                items.len() < self.capacity,
                "queue corrupted: free slot granted to a full queue"
            );
            items.push_back(item);
        }
        self.available.release();
    }

    // Caller holds an availability permit.
    fn unlink(&self) -> T {
        let item = self.items.lock().pop_front();
        let Some(item) = item else {
            panic!("queue corrupted: empty when an item was signalled available");
        };
        self.free_slots.release();
        item
    }
}
