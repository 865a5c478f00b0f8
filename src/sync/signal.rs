//! Dispatcher wake-up signal.
//!
//! The dispatcher sleeps on a counting semaphore. Every enqueue, completion
//! and reset notification posts it once; every wake-up runs one scan pass.

/// Counting wake-up primitive shared by producers, the event context and the
/// dispatcher.
///
/// [`post`](Self::post) must be callable from interrupt context and must not
/// block. [`wait`](Self::wait) is only ever called by the dispatcher.
pub trait WorkSignal {
    /// Add one unit of pending work
    fn post(&self);

    /// Block until at least one unit is pending, then consume it
    fn wait(&self);
}

#[cfg(feature = "std")]
pub use self::std_impl::Semaphore;

#[cfg(feature = "std")]
#[allow(clippy::std_instead_of_core)]
mod std_impl {
    use std::sync::{Condvar, Mutex, PoisonError};

    use super::WorkSignal;

    /// Condvar-backed counting semaphore
    #[derive(Debug, Default)]
    pub struct Semaphore {
        count: Mutex<usize>,
        condvar: Condvar,
    }

    impl Semaphore {
        /// Create a semaphore holding `initial` units
        pub const fn new(initial: usize) -> Self {
            Self {
                count: Mutex::new(initial),
                condvar: Condvar::new(),
            }
        }

        /// Units currently pending
        pub fn pending(&self) -> usize {
            *self.count.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl WorkSignal for Semaphore {
        fn post(&self) {
            {
                let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
                *count += 1;
            }
            self.condvar.notify_one();
        }

        fn wait(&self) {
            let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
            while *count == 0 {
                count = self
                    .condvar
                    .wait(count)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *count -= 1;
        }
    }
}
