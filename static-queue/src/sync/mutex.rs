use std::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
};

use libc::{
    pthread_mutex_destroy, pthread_mutex_lock, pthread_mutex_t, pthread_mutex_trylock,
    pthread_mutex_unlock, EBUSY, PTHREAD_MUTEX_INITIALIZER,
};

/// Binary mutex over a pthread mutex, guarding a value of type `T`.
///
/// The lock is statically initialized, so a `Mutex` can be built in a
/// `const` context and placed in a `static`. It is never moved while locked:
/// a guard borrows the mutex for its whole lifetime.
pub struct Mutex<T> {
    lock: UnsafeCell<pthread_mutex_t>,
    data: UnsafeCell<T>,
}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            lock: UnsafeCell::new(PTHREAD_MUTEX_INITIALIZER),
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        unsafe {
            if pthread_mutex_lock(self.lock.get()) != 0 {
                panic!("failed to lock mutex");
            }
            MutexGuard {
                lock: self,
                data: &mut *self.data.get(),
            }
        }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        unsafe {
            match pthread_mutex_trylock(self.lock.get()) {
                0 => Some(MutexGuard {
                    lock: self,
                    data: &mut *self.data.get(),
                }),
                EBUSY => None,
                e => panic!("failed to lock mutex: {e}"),
            }
        }
    }

    pub fn into_inner(self) -> T {
        let this = std::mem::ManuallyDrop::new(self);
        unsafe {
            if pthread_mutex_destroy(this.lock.get()) != 0 {
                panic!("failed to destroy mutex");
            }
            std::ptr::read(this.data.get())
        }
    }
}

pub struct MutexGuard<'a, T: 'a> {
    lock: &'a Mutex<T>,
    data: &'a mut T,
}

impl<'a, T: 'a> MutexGuard<'a, T> {
    pub(crate) fn get_inner_lock(&self) -> *mut pthread_mutex_t {
        self.lock.lock.get()
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            if pthread_mutex_unlock(self.lock.lock.get()) != 0 {
                panic!("failed to unlock mutex");
            }
        }
    }
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Drop for Mutex<T> {
    fn drop(&mut self) {
        if unsafe { pthread_mutex_destroy(self.lock.get()) } != 0 {
            panic!("failed to destroy mutex");
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("Mutex").field("data", &*guard).finish(),
            None => f.debug_struct("Mutex").field("data", &"<locked>").finish(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::Mutex;

    static SHARED: Mutex<u64> = Mutex::new(0);

    #[test]
    fn guards_mutation() {
        let m = Mutex::new(vec![1, 2]);
        m.lock().push(3);
        assert_eq!(*m.lock(), vec![1, 2, 3]);
        assert_eq!(m.into_inner(), vec![1, 2, 3]);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let m = Mutex::new(0u32);
        let guard = m.lock();
        assert!(m.try_lock().is_none());
        drop(guard);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn static_mutex_counts_across_threads() {
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        *SHARED.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(*SHARED.lock(), 8000);
    }
}
