use std::time::Duration;

use crate::sync::{Mutex, Semaphore, WaitStrategy};

/// Bounded FIFO of fixed-size byte records over caller-provided storage.
///
/// `free` counts slots a producer may write, `filled` counts slots a consumer
/// may read. Every transfer takes its semaphore first, then the ring lock,
/// and releases the opposite semaphore only after the ring lock is dropped.
#[derive(Debug)]
pub struct StaticQueue<'a> {
    capacity: usize,
    record_size: usize,
    filled: Semaphore,
    free: Semaphore,
    ring: Mutex<Ring<'a>>,
}

#[derive(Debug)]
struct Ring<'a> {
    storage: &'a mut [u8],
    write: u64,
    read: u64,
}

impl Ring<'_> {
    fn slot(&mut self, cursor: u64, capacity: usize, record_size: usize) -> &mut [u8] {
        let start = (cursor % capacity as u64) as usize * record_size;
        &mut self.storage[start..start + record_size]
    }
}

impl<'a> StaticQueue<'a> {
    /// Builds a queue of `capacity` records of `record_size` bytes each.
    ///
    /// # Panics
    ///
    /// If `capacity` or `record_size` is zero, or `storage` is shorter than
    /// `capacity * record_size`. Surplus storage is left untouched.
    pub fn new(capacity: usize, record_size: usize, storage: &'a mut [u8]) -> Self {
        Self::with_strategy(capacity, record_size, storage, WaitStrategy::Park)
    }

    pub fn with_strategy(
        capacity: usize,
        record_size: usize,
        storage: &'a mut [u8],
        strategy: WaitStrategy,
    ) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        assert!(record_size > 0, "record size must be at least 1 byte");
        let Some(needed) = capacity.checked_mul(record_size) else {
            panic!("queue of {capacity} x {record_size} bytes overflows usize");
        };
        assert!(
            storage.len() >= needed,
            "storage holds {} bytes, queue needs {needed}",
            storage.len()
        );

        Self {
            capacity,
            record_size,
            filled: Semaphore::with_strategy(0, capacity, strategy),
            free: Semaphore::with_strategy(capacity, capacity, strategy),
            ring: Mutex::new(Ring {
                storage: &mut storage[..needed],
                write: 0,
                read: 0,
            }),
        }
    }

    /// Copies `record` into the next slot, blocking while the queue is full.
    pub fn enqueue(&self, record: &[u8]) {
        self.check_record(record);
        self.free.acquire();
        self.push_slot(record);
    }

    /// Copies the oldest record into `out`, blocking while the queue is empty.
    pub fn dequeue(&self, out: &mut [u8]) {
        self.check_out(out);
        self.filled.acquire();
        self.pop_slot(out);
    }

    pub fn try_enqueue(&self, record: &[u8]) -> bool {
        self.check_record(record);
        if !self.free.try_acquire() {
            return false;
        }
        self.push_slot(record);
        true
    }

    pub fn try_dequeue(&self, out: &mut [u8]) -> bool {
        self.check_out(out);
        if !self.filled.try_acquire() {
            return false;
        }
        self.pop_slot(out);
        true
    }

    /// Bounded [`StaticQueue::enqueue`]. On `false` nothing was written.
    pub fn enqueue_timeout(&self, record: &[u8], timeout: Duration) -> bool {
        self.check_record(record);
        if !self.free.acquire_timeout(timeout) {
            return false;
        }
        self.push_slot(record);
        true
    }

    /// Bounded [`StaticQueue::dequeue`]. On `false` `out` is untouched.
    pub fn dequeue_timeout(&self, out: &mut [u8], timeout: Duration) -> bool {
        self.check_out(out);
        if !self.filled.acquire_timeout(timeout) {
            return false;
        }
        self.pop_slot(out);
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Records ready to be dequeued.
    pub fn len(&self) -> usize {
        self.filled.value()
    }

    /// Slots ready to be enqueued into.
    pub fn free_slots(&self) -> usize {
        self.free.value()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    fn push_slot(&self, record: &[u8]) {
        let mut ring = self.ring.lock();
        let cursor = ring.write;
        ring.slot(cursor, self.capacity, self.record_size)
            .copy_from_slice(record);
        ring.write += 1;
        drop(ring);

        self.filled.release();
    }

    fn pop_slot(&self, out: &mut [u8]) {
        let mut ring = self.ring.lock();
        let cursor = ring.read;
        let slot = ring.slot(cursor, self.capacity, self.record_size);
        out[..self.record_size].copy_from_slice(slot);
        ring.read += 1;
        drop(ring);

        self.free.release();
    }

    fn check_record(&self, record: &[u8]) {
        assert_eq!(
            record.len(),
            self.record_size,
            "record length does not match queue record size"
        );
    }

    fn check_out(&self, out: &[u8]) {
        assert!(
            out.len() >= self.record_size,
            "output buffer holds {} bytes, records are {}",
            out.len(),
            self.record_size
        );
    }

    #[cfg(test)]
    fn cursors(&self) -> (u64, u64) {
        let ring = self.ring.lock();
        (ring.write, ring.read)
    }
}
