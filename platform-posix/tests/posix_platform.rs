// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contract tests for the POSIX backend, run against a throwaway root
//! directory so they can't disturb (or be disturbed by) the real one.

use std::io::{Read as _, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use platform::{
    decrypt, encrypt, Clock, CpString, ErrorKind, FileSystem, Platform, SeekOrigin, Sockets,
    SocketSelect, Threading,
};
use platform_posix::PosixPlatform;

fn scratch_platform() -> (tempfile::TempDir, PosixPlatform) {
    let dir = tempfile::tempdir().unwrap();
    let platform = PosixPlatform::with_root(dir.path().to_path_buf());
    (dir, platform)
}

#[test]
fn file_io_round_trips_through_seek() {
    let (_dir, platform) = scratch_platform();
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
    assert!(platform.file_exists(&path));

    // The handle died with the close.
    assert!(platform
        .file_length(file)
        .unwrap_err()
        .is(ErrorKind::InvalidArgument));
}

#[test]
fn create_truncates_and_open_or_create_does_not() {
    let (_dir, platform) = scratch_platform();
    let path = CpString::from("options.txt");

    let file = platform.file_create(&path).unwrap();
    platform.file_write(file, b"mouse-sensitivity=30").unwrap();
    platform.file_close(file).unwrap();

    let file = platform.file_open_or_create(&path).unwrap();
    assert_eq!(20, platform.file_length(file).unwrap());
    platform.file_close(file).unwrap();

    let file = platform.file_create(&path).unwrap();
    assert_eq!(0, platform.file_length(file).unwrap());
    platform.file_close(file).unwrap();
}

#[test]
fn directories_are_not_files() {
    let (_dir, platform) = scratch_platform();
    let path = CpString::from("maps");

    platform.directory_create(&path).unwrap();
    assert!(!platform.file_exists(&path));

    let err = platform.directory_create(&path).unwrap_err();
    assert!(err.is(ErrorKind::DirectoryExists));
}

#[test]
fn missing_files_are_recognized() {
    let (_dir, platform) = scratch_platform();
    let path = CpString::from("texpacks/missing.zip");

    assert!(!platform.file_exists(&path));
    let err = platform.file_open(&path).unwrap_err();
    assert!(err.is(ErrorKind::FileNotFound));

    // A real errno travelled along, so it can be described.
    assert!(platform.describe_error(&err).is_some());
    // Errors synthesized without a native call cannot.
    assert_eq!(
        None,
        platform.describe_error(&ErrorKind::NotSupported.into())
    );
}

#[test]
fn enumeration_sees_every_file_exactly_once() {
    let (_dir, platform) = scratch_platform();
    for dir in ["maps", "maps/backups", "texpacks"] {
        platform.directory_create(&CpString::from(dir)).unwrap();
    }
    for path in [
        "maps/main.cw",
        "maps/backups/1.cw",
        "maps/backups/2.cw",
        "texpacks/default.zip",
    ] {
        let file = platform.file_create(&CpString::from(path)).unwrap();
        platform.file_close(file).unwrap();
    }

    let mut seen = Vec::new();
    platform
        .directory_enum(&CpString::from("maps"), &mut |path| {
            seen.push(path.to_string());
        })
        .unwrap();

    // Native listing order is unspecified; sort for the comparison.
    seen.sort();
    assert_eq!(
        vec!["maps/backups/1.cw", "maps/backups/2.cw", "maps/main.cw"],
        seen
    );
}

#[test]
fn enumerating_a_missing_directory_fails() {
    let (_dir, platform) = scratch_platform();
    let err = platform
        .directory_enum(&CpString::from("nope"), &mut |_| {
            panic!("callback must not run for a failed walk");
        })
        .unwrap_err();
    assert!(err.is(ErrorKind::FileNotFound));
}

#[test]
fn two_phase_threads_run_and_join() {
    let (_dir, platform) = scratch_platform();
    let ran = Arc::new(AtomicBool::new(false));

    let thread = platform.thread_create();
    let ran_in_thread = ran.clone();
    platform.thread_start(
        thread,
        Box::new(move || ran_in_thread.store(true, Ordering::Release)),
    );
    platform.thread_join(thread);

    assert!(ran.load(Ordering::Acquire));
}

#[test]
fn signal_before_wait_is_latched() {
    let (_dir, platform) = scratch_platform();
    let waitable = platform.waitable_create();

    platform.waitable_signal(waitable);
    // Latched: consumed immediately, no blocking.
    platform.waitable_wait(waitable);

    // The signal was consumed by exactly one wait, so now we time out.
    let before = Instant::now();
    assert!(!platform.waitable_wait_for(waitable, Duration::from_millis(30)));
    assert!(before.elapsed() >= Duration::from_millis(30));

    platform.waitable_free(waitable);
}

#[test]
fn signalling_twice_wakes_one_wait() {
    let (_dir, platform) = scratch_platform();
    let waitable = platform.waitable_create();

    platform.waitable_signal(waitable);
    platform.waitable_signal(waitable);
    assert!(platform.waitable_wait_for(waitable, Duration::from_millis(10)));
    assert!(!platform.waitable_wait_for(waitable, Duration::from_millis(10)));

    platform.waitable_free(waitable);
}

#[test]
fn waits_are_unblocked_from_another_thread() {
    let (_dir, platform) = scratch_platform();
    let platform = Arc::new(platform);
    let waitable = platform.waitable_create();

    let thread = platform.thread_create();
    let signaller = platform.clone();
    platform.thread_start(
        thread,
        Box::new(move || {
            signaller.thread_sleep(Duration::from_millis(20));
            signaller.waitable_signal(waitable);
        }),
    );

    platform.waitable_wait(waitable);
    platform.thread_join(thread);
    platform.waitable_free(waitable);
}

#[test]
fn mutexes_exclude_across_threads() {
    // Non-recursive by contract on this backend: relocking from the
    // holding thread is documented undefined, so that's exactly what this
    // test doesn't do.
    let (_dir, platform) = scratch_platform();
    let platform = Arc::new(platform);
    let mutex = platform.mutex_create();

    let thread = platform.thread_create();
    let other = platform.clone();
    platform.mutex_lock(mutex);
    platform.thread_start(
        thread,
        Box::new(move || {
            other.mutex_lock(mutex);
            other.mutex_unlock(mutex);
        }),
    );
    platform.thread_sleep(Duration::from_millis(10));
    platform.mutex_unlock(mutex);

    platform.thread_join(thread);
    platform.mutex_free(mutex);
}

#[test]
fn sockets_talk_to_a_local_listener() {
    let (_dir, platform) = scratch_platform();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let socket = platform.socket_create().unwrap();
    platform.socket_set_blocking(socket, true).unwrap();
    platform
        .socket_connect(socket, &CpString::from("127.0.0.1"), port)
        .unwrap();

    let (mut peer, _) = listener.accept().unwrap();
    assert_eq!(4, platform.socket_write(socket, b"ping").unwrap());

    let mut greeting = [0u8; 4];
    peer.read_exact(&mut greeting).unwrap();
    assert_eq!(b"ping", &greeting);
    peer.write_all(b"pong").unwrap();
    peer.flush().unwrap();

    // A connected socket with room in its send buffer polls writable.
    assert!(platform.socket_select(socket, SocketSelect::Write).unwrap());
    let mut reply = [0u8; 4];
    assert_eq!(4, platform.socket_read(socket, &mut reply).unwrap());
    assert_eq!(b"pong", &reply);

    assert_eq!(None, platform.socket_error(socket).unwrap());
    platform.socket_close(socket).unwrap();
}

#[test]
fn nonblocking_reads_would_block() {
    let (_dir, platform) = scratch_platform();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let socket = platform.socket_create().unwrap();
    platform.socket_set_blocking(socket, true).unwrap();
    platform
        .socket_connect(socket, &CpString::from("127.0.0.1"), port)
        .unwrap();
    let _peer = listener.accept().unwrap();

    platform.socket_set_blocking(socket, false).unwrap();
    assert_eq!(0, platform.socket_available(socket).unwrap());
    let err = platform.socket_read(socket, &mut [0u8; 16]).unwrap_err();
    assert!(err.is(ErrorKind::WouldBlock));

    platform.socket_close(socket).unwrap();
}

#[test]
fn secrets_round_trip_with_the_machine_key() {
    let (_dir, platform) = scratch_platform();

    // Not every system exposes a machine identity; that's a supported
    // outcome, not a test failure.
    let key = match platform.machine_key() {
        Ok(key) => key,
        Err(err) => {
            assert!(err.is(ErrorKind::NotSupported));
            return;
        }
    };

    let sealed = encrypt(b"SecretPassword123", &key).unwrap();
    assert_eq!(b"SecretPassword123".to_vec(), decrypt(&sealed, &key).unwrap());

    let other_key = [key[0] ^ 0xFFFF_FFFF, key[1], key[2], key[3]];
    assert!(decrypt(&sealed, &other_key)
        .unwrap_err()
        .is(ErrorKind::InvalidArgument));
}

#[test]
fn the_monotonic_clock_moves_forward() {
    let (_dir, platform) = scratch_platform();

    let begin = Clock::now(&platform);
    platform.thread_sleep(Duration::from_millis(15));
    let end = Clock::now(&platform);

    let elapsed = end.duration_since(begin).unwrap();
    assert!(elapsed >= Duration::from_millis(15));

    // And the calendar clock is at least in a plausible century.
    assert!(platform.utc_now_ms() > 1_500_000_000_000);
    let local = platform.local_now();
    assert!((2020..2200).contains(&local.year));
    assert!((1..=12).contains(&local.month));
}
