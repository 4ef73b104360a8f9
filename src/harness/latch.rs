//! One-shot count-down latch
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// Releases every waiter once its count reaches zero. Cannot be reset.
#[derive(Debug)]
pub struct Latch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Decrement the count, waking all waiters when it reaches zero.
    /// Counting down an already released latch does nothing.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    pub fn count(&self) -> usize {
        *self.remaining.lock()
    }

    pub fn is_released(&self) -> bool {
        self.count() == 0
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.released.wait(&mut remaining);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses.
    /// Returns whether the latch was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.released.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

/// Counts a latch down when dropped, so a unit arrives even if it panics.
/// A unit arriving by panic is also tallied in `panicked`, before the latch moves.
pub(crate) struct Arrival<'a> {
    latch: &'a Latch,
    panicked: &'a AtomicUsize,
}

impl<'a> Arrival<'a> {
    pub(crate) fn new(latch: &'a Latch, panicked: &'a AtomicUsize) -> Self {
        Self { latch, panicked }
    }
}

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.panicked.fetch_add(1, Ordering::SeqCst);
            log::error!(
                "execution error in {}",
                thread::current().name().unwrap_or("unnamed")
            );
        }
        self.latch.count_down();
    }
}
