use std::{
    thread,
    time::{Duration, Instant},
};

use super::{Condvar, Mutex};

/// How a blocked [`Semaphore::acquire`] waits for the count to become positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// Sleep on a condition variable until a release signals it.
    #[default]
    Park,
    /// Drop the lock, yield the processor and re-check. Never sleeps.
    Yield,
}

#[derive(Debug)]
struct Counter {
    value: usize,
    max: usize,
}

/// Counting semaphore holding a value in `0..=max`.
///
/// The count lives behind a binary [`Mutex`]; every read-modify-write of it
/// happens under that lock. `acquire` blocks without bound, `release`
/// saturates at `max`.
#[derive(Debug)]
pub struct Semaphore {
    counter: Mutex<Counter>,
    available: Condvar,
    strategy: WaitStrategy,
}

impl Semaphore {
    /// Creates a semaphore with `initial` units, clamped to `max`.
    pub const fn new(initial: usize, max: usize) -> Self {
        Self::with_strategy(initial, max, WaitStrategy::Park)
    }

    pub const fn with_strategy(initial: usize, max: usize, strategy: WaitStrategy) -> Self {
        // Out-of-range initial counts are clamped, not rejected.
        let value = if initial > max { max } else { initial };
        Self {
            counter: Mutex::new(Counter { value, max }),
            available: Condvar::new(),
            strategy,
        }
    }

    pub fn acquire(&self) {
        match self.strategy {
            WaitStrategy::Park => {
                let mut counter = self.counter.lock();
                while counter.value == 0 {
                    counter = self.available.wait(counter);
                }
                counter.value -= 1;
            }
            WaitStrategy::Yield => loop {
                if self.try_acquire() {
                    return;
                }
                thread::yield_now();
            },
        }
    }

    /// Takes one unit if available, never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut counter = self.counter.lock();
        if counter.value == 0 {
            return false;
        }
        counter.value -= 1;
        true
    }

    /// Like [`Semaphore::acquire`], but gives up once `timeout` has elapsed.
    /// Returns `false` without touching the count on timeout.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        if self.try_acquire() {
            return true;
        }
        // A deadline past what `Instant` can represent never arrives.
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.acquire();
            return true;
        };
        match self.strategy {
            WaitStrategy::Park => {
                let mut counter = self.counter.lock();
                while counter.value == 0 {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self.available.wait_timeout(counter, deadline - now);
                    counter = guard;
                }
                counter.value -= 1;
                true
            }
            WaitStrategy::Yield => loop {
                if self.try_acquire() {
                    return true;
                }
                if Instant::now() >= deadline {
                    return false;
                }
                thread::yield_now();
            },
        }
    }

    /// Adds one unit. Releasing a full semaphore is a no-op.
    pub fn release(&self) {
        let mut counter = self.counter.lock();
        if counter.value < counter.max {
            counter.value += 1;
        }
        drop(counter);

        if self.strategy == WaitStrategy::Park {
            self.available.signal();
        }
    }

    pub fn value(&self) -> usize {
        self.counter.lock().value
    }

    pub fn max(&self) -> usize {
        self.counter.lock().max
    }

    pub fn strategy(&self) -> WaitStrategy {
        self.strategy
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    use super::{Semaphore, WaitStrategy};

    static GATE: Semaphore = Semaphore::new(0, 1);

    #[test]
    fn clamps_initial_count() {
        let sem = Semaphore::new(5, 3);
        assert_eq!(sem.value(), 3);
        assert_eq!(sem.max(), 3);
    }

    #[test]
    fn release_saturates() {
        let sem = Semaphore::new(3, 3);
        sem.release();
        sem.release();
        assert_eq!(sem.value(), 3);

        sem.acquire();
        sem.release();
        sem.release();
        assert_eq!(sem.value(), 3);
    }

    #[test]
    fn try_acquire_on_empty() {
        let sem = Semaphore::new(1, 2);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn acquire_timeout_gives_up() {
        for strategy in [WaitStrategy::Park, WaitStrategy::Yield] {
            let sem = Semaphore::with_strategy(0, 1, strategy);
            assert!(!sem.acquire_timeout(Duration::from_millis(10)));
            assert_eq!(sem.value(), 0);

            sem.release();
            assert!(sem.acquire_timeout(Duration::from_millis(10)));
            assert_eq!(sem.value(), 0);
        }
    }

    #[test]
    fn unbounded_timeout_waits_like_acquire() {
        for strategy in [WaitStrategy::Park, WaitStrategy::Yield] {
            let sem = Semaphore::with_strategy(1, 1, strategy);
            assert!(sem.acquire_timeout(Duration::MAX));
            assert_eq!(sem.value(), 0);

            thread::scope(|s| {
                s.spawn(|| {
                    thread::sleep(Duration::from_millis(10));
                    sem.release();
                });
                assert!(sem.acquire_timeout(Duration::MAX));
            });
            assert_eq!(sem.value(), 0);
        }
    }

    #[test]
    fn acquire_blocks_until_release() {
        for strategy in [WaitStrategy::Park, WaitStrategy::Yield] {
            let sem = Semaphore::with_strategy(0, 1, strategy);
            let acquired = AtomicBool::new(false);

            thread::scope(|s| {
                s.spawn(|| {
                    sem.acquire();
                    acquired.store(true, Ordering::SeqCst);
                });

                thread::sleep(Duration::from_millis(30));
                assert!(!acquired.load(Ordering::SeqCst));
                sem.release();
            });

            assert!(acquired.load(Ordering::SeqCst));
            assert_eq!(sem.value(), 0);
        }
    }

    #[test]
    fn static_gate() {
        thread::scope(|s| {
            s.spawn(|| GATE.acquire());
            GATE.release();
        });
        assert_eq!(GATE.value(), 0);
    }

    #[test]
    fn concurrent_count_stays_in_range() {
        for strategy in [WaitStrategy::Park, WaitStrategy::Yield] {
            let sem = Semaphore::with_strategy(4, 4, strategy);
            let inside = AtomicUsize::new(0);
            let peak = AtomicUsize::new(0);

            thread::scope(|s| {
                for _ in 0..8 {
                    s.spawn(|| {
                        for _ in 0..200 {
                            sem.acquire();
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            sem.release();
                        }
                    });
                }
            });

            assert!(peak.load(Ordering::SeqCst) <= 4);
            assert_eq!(sem.value(), 4);
        }
    }
}
