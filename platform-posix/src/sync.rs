// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::UnsafeCell;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use platform::{
    ErrorKind, MutexHandle, Platform, PlatformError, Threading, ThreadEntry, ThreadHandle,
    WaitableHandle,
};

use crate::{errno_error, PosixPlatform};

/// A thread in the two-step creation protocol: allocated first, actually
/// spawned on start.
pub(crate) enum ThreadSlot {
    Created,
    Running(std::thread::JoinHandle<()>),
}

/// A bare pthread mutex. `std::sync::Mutex` hands out scoped guards, which
/// the split lock/unlock halves of the platform contract cannot be
/// expressed with, so this reaches below `std` for the same primitive the C
/// runtime uses.
pub(crate) struct RawMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

// Safety: pthread mutexes are made for cross-thread use; the UnsafeCell is
// only ever passed to pthread calls.
unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    /// A default-kind (non-recursive) mutex. Relocking it from the holding
    /// thread is undefined behavior per POSIX, which is also this mutex's
    /// documented contract.
    pub fn new() -> RawMutex {
        RawMutex {
            inner: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
        }
    }

    #[must_use]
    pub fn lock(&self) -> i32 {
        unsafe { libc::pthread_mutex_lock(self.inner.get()) }
    }

    #[must_use]
    pub fn unlock(&self) -> i32 {
        unsafe { libc::pthread_mutex_unlock(self.inner.get()) }
    }
}

impl Drop for RawMutex {
    fn drop(&mut self) {
        // The contract requires the mutex to be unlocked before free, so
        // there's nothing useful to do if destroy objects here.
        unsafe { libc::pthread_mutex_destroy(self.inner.get()) };
    }
}

/// The signalled flag and the condition it is waited on with. A signal
/// latches in the flag, so signal-then-wait consumes it immediately instead
/// of losing it.
pub(crate) struct Waitable {
    signalled: Mutex<bool>,
    cond: Condvar,
}

impl Waitable {
    pub fn new() -> Waitable {
        Waitable {
            signalled: Mutex::new(false),
            cond: Condvar::new(),
        }
    }
}

impl PosixPlatform {
    fn waitable(&self, handle: WaitableHandle, place: &str) -> Arc<Waitable> {
        match self.waitables.get(handle.inner()) {
            Some(waitable) => waitable,
            None => self.fatal_invalid_handle(place),
        }
    }

    fn fatal_invalid_handle(&self, place: &str) -> ! {
        self.fatal(place, PlatformError::new(ErrorKind::InvalidArgument));
    }
}

impl Threading for PosixPlatform {
    fn thread_create(&self) -> ThreadHandle {
        ThreadHandle::new(self.threads.insert(ThreadSlot::Created))
    }

    fn thread_start(&self, thread: ThreadHandle, entry: ThreadEntry) {
        let spawned = match std::thread::Builder::new().spawn(move || entry()) {
            Ok(join_handle) => join_handle,
            Err(err) => self.fatal("starting a thread", crate::io_error(err)),
        };
        let started = self
            .threads
            .with_mut(thread.inner(), |slot| {
                matches!(
                    std::mem::replace(slot, ThreadSlot::Running(spawned)),
                    ThreadSlot::Created
                )
            });
        if started != Some(true) {
            self.fatal_invalid_handle("starting a thread");
        }
    }

    fn thread_detach(&self, thread: ThreadHandle) {
        // Dropping a JoinHandle is a detach; the slot just goes away.
        if self.threads.take(thread.inner()).is_none() {
            self.fatal_invalid_handle("detaching a thread");
        }
    }

    fn thread_join(&self, thread: ThreadHandle) {
        match self.threads.take(thread.inner()) {
            Some(ThreadSlot::Running(join_handle)) => {
                if join_handle.join().is_err() {
                    self.fatal("joining a thread", PlatformError::new(ErrorKind::Other));
                }
            }
            _ => self.fatal_invalid_handle("joining a thread"),
        }
    }

    fn thread_sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn mutex_create(&self) -> MutexHandle {
        MutexHandle::new(self.mutexes.insert(Arc::new(RawMutex::new())))
    }

    fn mutex_free(&self, mutex: MutexHandle) {
        if self.mutexes.take(mutex.inner()).is_none() {
            self.fatal_invalid_handle("freeing a mutex");
        }
    }

    fn mutex_lock(&self, mutex: MutexHandle) {
        let raw = match self.mutexes.get(mutex.inner()) {
            Some(raw) => raw,
            None => self.fatal_invalid_handle("locking a mutex"),
        };
        let res = raw.lock();
        if res != 0 {
            self.fatal("locking a mutex", errno_error(res));
        }
    }

    fn mutex_unlock(&self, mutex: MutexHandle) {
        let raw = match self.mutexes.get(mutex.inner()) {
            Some(raw) => raw,
            None => self.fatal_invalid_handle("unlocking a mutex"),
        };
        let res = raw.unlock();
        if res != 0 {
            self.fatal("unlocking a mutex", errno_error(res));
        }
    }

    fn waitable_create(&self) -> WaitableHandle {
        WaitableHandle::new(self.waitables.insert(Arc::new(Waitable::new())))
    }

    fn waitable_free(&self, waitable: WaitableHandle) {
        if self.waitables.take(waitable.inner()).is_none() {
            self.fatal_invalid_handle("freeing a waitable");
        }
    }

    fn waitable_signal(&self, waitable: WaitableHandle) {
        let waitable = self.waitable(waitable, "signalling a waitable");
        let mut signalled = waitable
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *signalled = true;
        waitable.cond.notify_one();
    }

    fn waitable_wait(&self, waitable: WaitableHandle) {
        let waitable = self.waitable(waitable, "waiting on a waitable");
        let mut signalled = waitable
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*signalled {
            signalled = waitable
                .cond
                .wait(signalled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *signalled = false;
    }

    fn waitable_wait_for(&self, waitable: WaitableHandle, timeout: Duration) -> bool {
        let waitable = self.waitable(waitable, "waiting on a waitable");
        let deadline = Instant::now() + timeout;

        let mut signalled = waitable
            .signalled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*signalled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            signalled = waitable
                .cond
                .wait_timeout(signalled, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *signalled = false;
        true
    }
}
