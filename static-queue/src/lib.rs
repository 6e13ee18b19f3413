//! Fixed-capacity blocking queue of byte records for threads that share no
//! other coordination.
//!
//! [`StaticQueue`] moves `record_size`-byte records through caller-owned
//! storage in FIFO order. Producers block while the queue is full, consumers
//! block while it is empty. The blocking comes from two counting
//! [`sync::Semaphore`]s, each of which is a binary [`sync::Mutex`] around a
//! counter.
//!
//! ```
//! use static_queue::StaticQueue;
//!
//! let mut storage = [0u8; 4 * 8];
//! let queue = StaticQueue::new(4, 8, &mut storage);
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0u64..10 {
//!             queue.enqueue(&i.to_le_bytes());
//!         }
//!     });
//!
//!     let mut out = [0u8; 8];
//!     for i in 0u64..10 {
//!         queue.dequeue(&mut out);
//!         assert_eq!(u64::from_le_bytes(out), i);
//!     }
//! });
//! ```

pub mod queue;
pub mod sync;

pub use queue::StaticQueue;
pub use sync::WaitStrategy;
