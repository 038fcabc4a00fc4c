// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! A [`Platform`] implementation with no platform underneath.
//!
//! Files live in a map, the clock only moves when told to, "threads" run
//! their entry inline on start, and sockets don't exist. This is the
//! backend the client's tests run against: fully deterministic, no
//! filesystem or scheduler noise, and every logged line can be inspected
//! afterwards.
//!
//! It also stands in for the most constrained targets the contract has to
//! cover: a cooperative single-core kernel with possibly no storage
//! mounted. On such a platform a wait with nobody left to signal is a
//! guaranteed deadlock, so here it panics instead of hanging the test
//! suite; and with [`HeadlessPlatform::set_storage_available`] the
//! unmounted-storage behaviors become testable too.

mod calendar;
mod vfs;

use std::ffi::c_void;
use std::sync::Mutex;
use std::time::Duration;

use platform::{
    Clock, CpStr, DateTime, DynamicLibraries, ErrorKind, FileHandle, FileSystem, Instant,
    LibraryHandle, MutexHandle, Platform, PlatformError, PlatformResult, SeekOrigin,
    SocketHandle, Sockets, SocketSelect, ThreadEntry, ThreadHandle, Threading, WaitableHandle,
};

use vfs::Vfs;

/// 2020-01-01T00:00:00Z, where the virtual wall clock starts.
const EPOCH_MS: u64 = 1_577_836_800_000;

/// The fixed "machine identity" of the virtual machine.
const MACHINE_KEY: [u32; 4] = [0x4845_4144, 0x4C45_5353, 0x0000_0000, 0xFFFF_FFFF];

enum ThreadSlot {
    Created,
    Finished,
}

#[derive(Default)]
struct SyncState {
    threads: Vec<Option<ThreadSlot>>,
    /// One latch per waitable; None means freed.
    waitables: Vec<Option<bool>>,
    /// One held-flag per mutex; None means freed.
    mutexes: Vec<Option<bool>>,
}

/// The in-memory platform. See the [module docs](self).
#[derive(Default)]
pub struct HeadlessPlatform {
    vfs: Mutex<Vfs>,
    clock: Mutex<Duration>,
    sync: Mutex<SyncState>,
    log_lines: Mutex<Vec<String>>,
    opened_targets: Mutex<Vec<String>>,
}

impl HeadlessPlatform {
    /// A platform with mounted (empty) storage and the clock at zero.
    pub fn new() -> HeadlessPlatform {
        HeadlessPlatform::default()
    }

    /// Mounts or unmounts the virtual storage. While unmounted, directory
    /// creation and enumeration report
    /// [`ErrorKind::NotSupported`] and nothing "exists", matching targets
    /// whose storage medium can go away.
    pub fn set_storage_available(&self, available: bool) {
        self.vfs.lock().unwrap().storage_available = available;
    }

    /// Moves the virtual clock forward. [`Threading::thread_sleep`] and
    /// timed waits do this implicitly.
    pub fn advance_clock(&self, by: Duration) {
        *self.clock.lock().unwrap() += by;
    }

    /// Everything logged so far, draining the buffer.
    pub fn take_logged(&self) -> Vec<String> {
        std::mem::take(&mut self.log_lines.lock().unwrap())
    }

    /// Every target passed to [`Platform::start_open`] so far, draining
    /// the buffer.
    pub fn take_opened(&self) -> Vec<String> {
        std::mem::take(&mut self.opened_targets.lock().unwrap())
    }
}

impl Platform for HeadlessPlatform {
    fn log(&self, message: &str) {
        self.log_lines.lock().unwrap().push(String::from(message));
    }

    fn describe_error(&self, _error: &PlatformError) -> Option<String> {
        // There is no native error space here, so there is never anything
        // to add beyond the kind the error already displays.
        None
    }

    fn machine_key(&self) -> PlatformResult<[u32; 4]> {
        Ok(MACHINE_KEY)
    }

    fn start_open(&self, target: &CpStr) -> PlatformResult<()> {
        self.opened_targets.lock().unwrap().push(target.decode());
        Ok(())
    }

    fn exit(&self, clean: bool) -> ! {
        panic!("HeadlessPlatform::exit({clean}) was called");
    }

    fn fatal(&self, place: &str, error: PlatformError) -> ! {
        panic!("fatal error {place}: {error}");
    }
}

impl Clock for HeadlessPlatform {
    fn utc_now_ms(&self) -> u64 {
        EPOCH_MS + self.clock.lock().unwrap().as_millis() as u64
    }

    fn local_now(&self) -> DateTime {
        // The virtual machine lives in UTC; there is no timezone database
        // to consult.
        calendar::date_time_from_unix_ms(self.utc_now_ms())
    }

    fn now(&self) -> Instant {
        Instant::reference() + *self.clock.lock().unwrap()
    }
}

impl FileSystem for HeadlessPlatform {
    fn directory_create(&self, path: &CpStr) -> PlatformResult<()> {
        self.vfs.lock().unwrap().directory_create(path.as_bytes())
    }

    fn file_exists(&self, path: &CpStr) -> bool {
        self.vfs.lock().unwrap().file_exists(path.as_bytes())
    }

    fn directory_enum(
        &self,
        path: &CpStr,
        callback: &mut dyn FnMut(&CpStr),
    ) -> PlatformResult<()> {
        // Snapshot first: the callback is allowed to call back into the
        // platform without deadlocking on the vfs lock.
        let files = self.vfs.lock().unwrap().files_under(path.as_bytes())?;
        for file in &files {
            callback(CpStr::from_bytes(file));
        }
        Ok(())
    }

    fn file_open(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.vfs.lock().unwrap().open(path.as_bytes(), false, false)
    }

    fn file_create(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.vfs.lock().unwrap().open(path.as_bytes(), true, true)
    }

    fn file_open_or_create(&self, path: &CpStr) -> PlatformResult<FileHandle> {
        self.vfs.lock().unwrap().open(path.as_bytes(), true, false)
    }

    fn file_read(&self, file: FileHandle, buffer: &mut [u8]) -> PlatformResult<usize> {
        self.vfs.lock().unwrap().read(file, buffer)
    }

    fn file_write(&self, file: FileHandle, data: &[u8]) -> PlatformResult<usize> {
        self.vfs.lock().unwrap().write(file, data)
    }

    fn file_seek(&self, file: FileHandle, offset: i64, origin: SeekOrigin) -> PlatformResult<()> {
        self.vfs.lock().unwrap().seek(file, offset, origin)
    }

    fn file_position(&self, file: FileHandle) -> PlatformResult<u64> {
        self.vfs.lock().unwrap().position(file)
    }

    fn file_length(&self, file: FileHandle) -> PlatformResult<u64> {
        self.vfs.lock().unwrap().length(file)
    }

    fn file_close(&self, file: FileHandle) -> PlatformResult<()> {
        self.vfs.lock().unwrap().close(file)
    }
}

impl Threading for HeadlessPlatform {
    fn thread_create(&self) -> ThreadHandle {
        let mut sync = self.sync.lock().unwrap();
        sync.threads.push(Some(ThreadSlot::Created));
        ThreadHandle::new(sync.threads.len() as u64)
    }

    fn thread_start(&self, thread: ThreadHandle, entry: ThreadEntry) {
        {
            let mut sync = self.sync.lock().unwrap();
            let slot = sync
                .threads
                .get_mut(thread.inner() as usize - 1)
                .and_then(Option::as_mut)
                .expect("thread_start on an unknown thread handle");
            assert!(
                matches!(slot, ThreadSlot::Created),
                "thread_start called twice on one handle"
            );
            *slot = ThreadSlot::Finished;
        }
        // One core, cooperative scheduling: the "thread" runs to completion
        // right here, before start returns.
        entry();
    }

    fn thread_detach(&self, thread: ThreadHandle) {
        let mut sync = self.sync.lock().unwrap();
        sync.threads
            .get_mut(thread.inner() as usize - 1)
            .and_then(Option::take)
            .expect("thread_detach on an unknown thread handle");
    }

    fn thread_join(&self, thread: ThreadHandle) {
        let mut sync = self.sync.lock().unwrap();
        let slot = sync
            .threads
            .get_mut(thread.inner() as usize - 1)
            .and_then(Option::take)
            .expect("thread_join on an unknown thread handle");
        assert!(
            matches!(slot, ThreadSlot::Finished),
            "thread_join on a thread that was never started"
        );
    }

    fn thread_sleep(&self, duration: Duration) {
        self.advance_clock(duration);
    }

    fn mutex_create(&self) -> MutexHandle {
        let mut sync = self.sync.lock().unwrap();
        sync.mutexes.push(Some(false));
        MutexHandle::new(sync.mutexes.len() as u64)
    }

    fn mutex_free(&self, mutex: MutexHandle) {
        let mut sync = self.sync.lock().unwrap();
        let held = sync
            .mutexes
            .get_mut(mutex.inner() as usize - 1)
            .and_then(Option::take)
            .expect("mutex_free on an unknown mutex handle");
        assert!(!held, "mutex_free on a held mutex");
    }

    fn mutex_lock(&self, mutex: MutexHandle) {
        let mut sync = self.sync.lock().unwrap();
        let held = sync
            .mutexes
            .get_mut(mutex.inner() as usize - 1)
            .and_then(Option::as_mut)
            .expect("mutex_lock on an unknown mutex handle");
        // With one thread of execution, contention can only be a deadlock.
        assert!(!*held, "mutex_lock would deadlock: already held");
        *held = true;
    }

    fn mutex_unlock(&self, mutex: MutexHandle) {
        let mut sync = self.sync.lock().unwrap();
        let held = sync
            .mutexes
            .get_mut(mutex.inner() as usize - 1)
            .and_then(Option::as_mut)
            .expect("mutex_unlock on an unknown mutex handle");
        assert!(*held, "mutex_unlock without a matching lock");
        *held = false;
    }

    fn waitable_create(&self) -> WaitableHandle {
        let mut sync = self.sync.lock().unwrap();
        sync.waitables.push(Some(false));
        WaitableHandle::new(sync.waitables.len() as u64)
    }

    fn waitable_free(&self, waitable: WaitableHandle) {
        let mut sync = self.sync.lock().unwrap();
        sync.waitables
            .get_mut(waitable.inner() as usize - 1)
            .and_then(Option::take)
            .expect("waitable_free on an unknown waitable handle");
    }

    fn waitable_signal(&self, waitable: WaitableHandle) {
        let mut sync = self.sync.lock().unwrap();
        let latched = sync
            .waitables
            .get_mut(waitable.inner() as usize - 1)
            .and_then(Option::as_mut)
            .expect("waitable_signal on an unknown waitable handle");
        *latched = true;
    }

    fn waitable_wait(&self, waitable: WaitableHandle) {
        let mut sync = self.sync.lock().unwrap();
        let latched = sync
            .waitables
            .get_mut(waitable.inner() as usize - 1)
            .and_then(Option::as_mut)
            .expect("waitable_wait on an unknown waitable handle");
        // Nobody else is running to deliver a signal later.
        assert!(*latched, "waitable_wait would deadlock: not signalled");
        *latched = false;
    }

    fn waitable_wait_for(&self, waitable: WaitableHandle, timeout: Duration) -> bool {
        {
            let mut sync = self.sync.lock().unwrap();
            let latched = sync
                .waitables
                .get_mut(waitable.inner() as usize - 1)
                .and_then(Option::as_mut)
                .expect("waitable_wait_for on an unknown waitable handle");
            if *latched {
                *latched = false;
                return true;
            }
        }
        self.advance_clock(timeout);
        false
    }
}

impl Sockets for HeadlessPlatform {
    fn socket_create(&self) -> PlatformResult<SocketHandle> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_connect(
        &self,
        _socket: SocketHandle,
        _address: &CpStr,
        _port: u16,
    ) -> PlatformResult<()> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_set_blocking(&self, _socket: SocketHandle, _blocking: bool) -> PlatformResult<()> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_available(&self, _socket: SocketHandle) -> PlatformResult<u32> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_read(&self, _socket: SocketHandle, _buffer: &mut [u8]) -> PlatformResult<usize> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_write(&self, _socket: SocketHandle, _data: &[u8]) -> PlatformResult<usize> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_select(&self, _socket: SocketHandle, _mode: SocketSelect) -> PlatformResult<bool> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_error(&self, _socket: SocketHandle) -> PlatformResult<Option<PlatformError>> {
        Err(ErrorKind::NotSupported.into())
    }

    fn socket_close(&self, _socket: SocketHandle) -> PlatformResult<()> {
        Err(ErrorKind::NotSupported.into())
    }
}

impl DynamicLibraries for HeadlessPlatform {
    fn library_load(&self, _path: &CpStr) -> PlatformResult<LibraryHandle> {
        Err(ErrorKind::NotSupported.into())
    }

    fn library_symbol(
        &self,
        _library: LibraryHandle,
        _name: &str,
    ) -> PlatformResult<*const c_void> {
        Err(ErrorKind::NotSupported.into())
    }

    fn library_error_details(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use platform::{
        Clock, CpString, ErrorKind, FileSystem, Platform, SeekOrigin, Threading,
    };

    use super::HeadlessPlatform;

    #[test]
    fn file_io_round_trips_through_seek() {
        let platform = HeadlessPlatform::new();
        let path = CpString::from("x.cw");

        let file = platform.file_create(&path).unwrap();
        let written: Vec<u8> = (0..100).collect();
        assert_eq!(100, platform.file_write(file, &written).unwrap());

        platform.file_seek(file, 0, SeekOrigin::Start).unwrap();
        let mut read_back = [0u8; 100];
        assert_eq!(100, platform.file_read(file, &mut read_back).unwrap());

        assert_eq!(written, read_back);
        assert_eq!(100, platform.file_length(file).unwrap());
        assert_eq!(100, platform.file_position(file).unwrap());
        platform.file_close(file).unwrap();
    }

    #[test]
    fn directories_are_not_files() {
        let platform = HeadlessPlatform::new();
        let path = CpString::from("maps");

        platform.directory_create(&path).unwrap();
        assert!(!platform.file_exists(&path));
        assert!(platform
            .directory_create(&path)
            .unwrap_err()
            .is(ErrorKind::DirectoryExists));
    }

    #[test]
    fn unmounted_storage_is_not_an_error_for_exists() {
        let platform = HeadlessPlatform::new();
        let path = CpString::from("maps");
        platform.directory_create(&path).unwrap();

        platform.set_storage_available(false);
        assert!(!platform.file_exists(&path));
        assert!(platform
            .directory_create(&CpString::from("other"))
            .unwrap_err()
            .is(ErrorKind::NotSupported));
    }

    #[test]
    fn enumeration_recurses_depth_first() {
        let platform = HeadlessPlatform::new();
        for dir in ["maps", "maps/backups"] {
            platform.directory_create(&CpString::from(dir)).unwrap();
        }
        for path in ["maps/a.cw", "maps/backups/old.cw", "maps/z.cw"] {
            let file = platform.file_create(&CpString::from(path)).unwrap();
            platform.file_close(file).unwrap();
        }

        let mut seen = Vec::new();
        platform
            .directory_enum(&CpString::from("maps"), &mut |path| {
                seen.push(path.to_string());
            })
            .unwrap();
        // In-memory listing order is lexicographic, so the subdirectory's
        // contents land between a.cw and z.cw, fully before the listing
        // continues.
        assert_eq!(vec!["maps/a.cw", "maps/backups/old.cw", "maps/z.cw"], seen);
    }

    #[test]
    fn signal_then_wait_consumes_the_latch_once() {
        let platform = HeadlessPlatform::new();
        let waitable = platform.waitable_create();

        platform.waitable_signal(waitable);
        platform.waitable_signal(waitable);
        platform.waitable_wait(waitable);

        assert!(!platform.waitable_wait_for(waitable, Duration::from_millis(250)));
        platform.waitable_free(waitable);
    }

    #[test]
    #[should_panic(expected = "would deadlock")]
    fn waiting_with_no_signal_is_a_deadlock() {
        let platform = HeadlessPlatform::new();
        let waitable = platform.waitable_create();
        platform.waitable_wait(waitable);
    }

    #[test]
    #[should_panic(expected = "would deadlock")]
    fn relocking_the_only_thread_is_a_deadlock() {
        let platform = HeadlessPlatform::new();
        let mutex = platform.mutex_create();
        platform.mutex_lock(mutex);
        platform.mutex_lock(mutex);
    }

    #[test]
    fn threads_run_inline_and_time_is_virtual() {
        let platform = HeadlessPlatform::new();

        let begin = platform.now();
        let thread = platform.thread_create();
        platform.thread_start(thread, Box::new(|| {}));
        platform.thread_join(thread);

        platform.thread_sleep(Duration::from_secs(3));
        let elapsed = platform.now().duration_since(begin).unwrap();
        assert_eq!(Duration::from_secs(3), elapsed);
    }

    #[test]
    fn timed_wait_timeouts_advance_the_clock() {
        let platform = HeadlessPlatform::new();
        let waitable = platform.waitable_create();

        let before = platform.utc_now_ms();
        assert!(!platform.waitable_wait_for(waitable, Duration::from_millis(1500)));
        assert_eq!(before + 1500, platform.utc_now_ms());
    }

    #[test]
    fn the_calendar_starts_in_2020() {
        let platform = HeadlessPlatform::new();
        let local = platform.local_now();
        assert_eq!((2020, 1, 1), (local.year, local.month, local.day));

        platform.advance_clock(Duration::from_secs(31 * 24 * 60 * 60 + 3600));
        let local = platform.local_now();
        assert_eq!((2020, 2, 1, 1), (local.year, local.month, local.day, local.hour));
    }

    #[test]
    fn logging_is_captured() {
        let platform = HeadlessPlatform::new();
        platform.log("hello");
        platform.start_open(&CpString::from("https://example.net")).unwrap();
        assert_eq!(vec!["hello"], platform.take_logged());
        assert_eq!(vec!["https://example.net"], platform.take_opened());
    }
}
