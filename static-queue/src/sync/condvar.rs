use std::{
    cell::UnsafeCell,
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use libc::{
    c_int, c_long, pthread_cond_broadcast, pthread_cond_destroy, pthread_cond_signal,
    pthread_cond_t, pthread_cond_timedwait, pthread_cond_wait, pthread_mutex_t, time_t, timespec,
    ETIMEDOUT, PTHREAD_COND_INITIALIZER,
};

use super::MutexGuard;

/// Condition variable over a pthread condvar, used together with [`super::Mutex`].
pub struct Condvar {
    inner: UnsafeCell<pthread_cond_t>,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(PTHREAD_COND_INITIALIZER),
        }
    }

    pub fn signal(&self) {
        unsafe {
            if pthread_cond_signal(self.inner.get()) != 0 {
                panic!("failed to signal condvar");
            }
        }
    }

    pub fn broadcast(&self) {
        unsafe {
            if pthread_cond_broadcast(self.inner.get()) != 0 {
                panic!("failed to broadcast condvar");
            }
        }
    }

    /// Atomically releases the guard's mutex and sleeps until signalled.
    /// Wakeups may be spurious; callers re-check their condition.
    pub fn wait<'m, T>(&self, guard: MutexGuard<'m, T>) -> MutexGuard<'m, T> {
        unsafe {
            if pthread_cond_wait(self.inner.get(), guard.get_inner_lock()) != 0 {
                panic!("failed to wait on condvar");
            }
        }
        guard
    }

    /// Like [`Condvar::wait`], bounded by `timeout`. The returned flag is
    /// `true` when the wait ended because the timeout elapsed.
    pub fn wait_timeout<'m, T>(
        &self,
        guard: MutexGuard<'m, T>,
        timeout: Duration,
    ) -> (MutexGuard<'m, T>, bool) {
        let result =
            unsafe { cond_wait_timeout(self.inner.get(), guard.get_inner_lock(), timeout) };
        match result {
            0 => (guard, false),
            ETIMEDOUT => (guard, true),
            e => panic!("failed to wait for condvar: {e}"),
        }
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar").finish_non_exhaustive()
    }
}

unsafe impl Send for Condvar {}
unsafe impl Sync for Condvar {}

impl Drop for Condvar {
    fn drop(&mut self) {
        if unsafe { pthread_cond_destroy(self.inner.get()) } != 0 {
            panic!("failed to destroy condvar");
        }
    }
}

/// `pthread_cond_timedwait` takes an absolute `CLOCK_REALTIME` deadline and
/// returns the error number directly.
unsafe fn cond_wait_timeout(
    cond: *mut pthread_cond_t,
    mutex: *mut pthread_mutex_t,
    timeout: Duration,
) -> c_int {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    let target = now.saturating_add(timeout);
    let ts = timespec {
        tv_sec: target.as_secs().min(time_t::MAX as u64) as time_t,
        tv_nsec: target.subsec_nanos() as c_long,
    };
    pthread_cond_timedwait(cond, mutex, &raw const ts)
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::Condvar;
    use crate::sync::Mutex;

    #[test]
    fn wait_timeout_elapses() {
        let m = Mutex::new(());
        let cv = Condvar::new();
        let start = Instant::now();
        let (_guard, timed_out) = cv.wait_timeout(m.lock(), Duration::from_millis(20));
        assert!(timed_out);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn signal_wakes_waiter() {
        let m = Mutex::new(false);
        let cv = Condvar::new();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(10));
                *m.lock() = true;
                cv.signal();
            });

            let mut ready = m.lock();
            while !*ready {
                ready = cv.wait(ready);
            }
        });
        assert!(*m.lock());
    }

    #[test]
    fn broadcast_wakes_all() {
        let m = Mutex::new(false);
        let cv = Condvar::new();
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut open = m.lock();
                    while !*open {
                        open = cv.wait(open);
                    }
                });
            }

            thread::sleep(Duration::from_millis(10));
            *m.lock() = true;
            cv.broadcast();
        });
    }
}
