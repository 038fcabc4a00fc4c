// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Thread and synchronization primitives of a platform.
//!
//! Everything here is deliberately low-level: raw handles, explicit create
//! and free calls, no RAII. The client builds its own safe utilities on top;
//! this layer's job is to present one contract that can be implemented on
//! preemptive desktop schedulers and cooperative handheld kernels alike.
//! Callers must not assume preemption fairness, and must not spin without
//! yielding.
//!
//! Failures of the primitives themselves (a mutex that cannot be locked, a
//! thread that cannot be spawned) are not result codes: an environment where
//! synchronization is broken is unusable, so implementations report them
//! through [`Platform::fatal`](crate::Platform::fatal).

use core::time::Duration;

use alloc::boxed::Box;

/// The code a thread runs, handed to [`Threading::thread_start`].
pub type ThreadEntry = Box<dyn FnOnce() + Send + 'static>;

/// Platform-specific thread handle.
///
/// Lifecycle: created (allocated, not running) → started → joined or
/// detached. Exactly one of [`Threading::thread_join`] and
/// [`Threading::thread_detach`] must be called per handle; calling both, or
/// neither, is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadHandle(u64);

impl ThreadHandle {
    /// Creates a new [`ThreadHandle`]. Should only be created in the
    /// platform implementation, which also knows how the inner value is
    /// going to be used.
    pub fn new(id: u64) -> ThreadHandle {
        ThreadHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Platform-specific mutex handle. See [`Threading::mutex_create`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutexHandle(u64);

impl MutexHandle {
    /// Creates a new [`MutexHandle`]. Should only be created in the
    /// platform implementation.
    pub fn new(id: u64) -> MutexHandle {
        MutexHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Platform-specific waitable handle. See [`Threading::waitable_create`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitableHandle(u64);

impl WaitableHandle {
    /// Creates a new [`WaitableHandle`]. Should only be created in the
    /// platform implementation.
    pub fn new(id: u64) -> WaitableHandle {
        WaitableHandle(id)
    }

    /// The platform-specific id this handle was created with.
    pub fn inner(self) -> u64 {
        self.0
    }
}

/// Threading and synchronization services of a platform.
pub trait Threading {
    /// Allocates a thread handle without running anything yet.
    ///
    /// Creation is split in two because some kernels need the thread object
    /// to exist before it can be configured and resumed. Platforms without
    /// that need simply allocate here and do the real work in
    /// [`Threading::thread_start`]; callers always use the two-step
    /// protocol.
    fn thread_create(&self) -> ThreadHandle;

    /// Starts the created thread, running `entry` on it.
    ///
    /// Must be called exactly once per handle, before join/detach.
    fn thread_start(&self, thread: ThreadHandle, entry: ThreadEntry);

    /// Gives up on ever joining the thread; it keeps running and its
    /// resources are released when it finishes. The handle is dead
    /// afterwards.
    fn thread_detach(&self, thread: ThreadHandle);

    /// Blocks until the thread finishes. The handle is dead afterwards.
    fn thread_join(&self, thread: ThreadHandle);

    /// Puts the calling thread to sleep for roughly the given duration.
    fn thread_sleep(&self, duration: Duration);

    /// Creates a mutex, initially unlocked.
    ///
    /// The mutex is not recursive unless the platform's native primitive
    /// guarantees it; relocking from the holding thread is undefined, so
    /// don't. Whichever thread holds the lock owns it transiently; there is
    /// no other ownership tracking.
    fn mutex_create(&self) -> MutexHandle;

    /// Destroys a mutex. Must not be locked by anyone.
    fn mutex_free(&self, mutex: MutexHandle);

    /// Blocks until the mutex is available, then takes it.
    fn mutex_lock(&self, mutex: MutexHandle);

    /// Releases the mutex. Must be paired with a
    /// [`Threading::mutex_lock`] on the same thread.
    fn mutex_unlock(&self, mutex: MutexHandle);

    /// Creates a waitable: a binary signalled/unsignalled object.
    ///
    /// A signal latches until a wait consumes it, so signalling before
    /// anyone waits is never lost: the next wait returns immediately,
    /// exactly once.
    fn waitable_create(&self) -> WaitableHandle;

    /// Destroys a waitable. Must have no waiters.
    fn waitable_free(&self, waitable: WaitableHandle);

    /// Signals the waitable. Idempotent, and safe to call with no waiter
    /// present; the state stays latched until consumed by one wait.
    fn waitable_signal(&self, waitable: WaitableHandle);

    /// Blocks until the waitable is signalled, consuming the signal.
    fn waitable_wait(&self, waitable: WaitableHandle);

    /// Like [`Threading::waitable_wait`], but gives up after `timeout`.
    ///
    /// Returns true if a signal was consumed, false on timeout. Timing out
    /// is a perfectly normal outcome, not an error.
    fn waitable_wait_for(&self, waitable: WaitableHandle, timeout: Duration) -> bool;
}
