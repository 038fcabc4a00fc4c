// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exercises the platform layer end to end on the desktop backend: logging,
//! files, timing, threads, and the secret store. Useful as a smoke test and
//! as a reference for how the pieces are meant to be wired together.

use std::time::Duration;

use log::{info, warn, LevelFilter};
use platform::{
    decrypt, encrypt, split_args, Clock, CpString, ErrorKind, FileSystem, PingList, Platform,
    PlatformLogger, PlatformResult, SeekOrigin, Threading,
};
use platform_posix::PosixPlatform;

fn main() {
    // The platform outlives everything, including the logger that is about
    // to borrow it.
    let platform: &'static PosixPlatform = Box::leak(Box::new(PosixPlatform::new()));

    let logger: &'static PlatformLogger =
        Box::leak(Box::new(PlatformLogger::new(platform, LevelFilter::Info)));
    log::set_logger(logger).expect("no other logger should be installed");
    log::set_max_level(LevelFilter::Info);

    let command_line: Vec<String> = std::env::args().skip(1).collect();
    let command_line = command_line.join(" ");
    let args = split_args(&command_line);
    if !args.is_empty() {
        info!("launch arguments: {:?}", args.as_slice());
    }

    if let Err(err) = run(platform) {
        match platform.describe_error(&err) {
            Some(details) => warn!("demo failed: {err} ({details})"),
            None => warn!("demo failed: {err}"),
        }
        platform.exit(false);
    }
    platform.exit(true);
}

fn run(platform: &'static PosixPlatform) -> PlatformResult<()> {
    let started = platform.now();
    let local = platform.local_now();
    info!(
        "starting demo on {:04}-{:02}-{:02} at {:02}:{:02}",
        local.year, local.month, local.day, local.hour, local.minute
    );

    file_demo(platform)?;
    thread_demo(platform);
    secret_demo(platform)?;
    ping_demo(platform);

    let elapsed = platform
        .now()
        .duration_since(started)
        .unwrap_or(Duration::ZERO);
    info!("demo done in {elapsed:.2?}");
    Ok(())
}

/// Create a world file, write it, read it back through a seek.
fn file_demo(platform: &PosixPlatform) -> PlatformResult<()> {
    let dir = CpString::from("demo-maps");
    match platform.directory_create(&dir) {
        Ok(()) => {}
        Err(err) if err.is(ErrorKind::DirectoryExists) => {}
        Err(err) => return Err(err),
    }

    let path = CpString::from("demo-maps/x.cw");
    let file = platform.file_create(&path)?;
    let payload: Vec<u8> = (0..100).collect();
    platform.file_write(file, &payload)?;

    platform.file_seek(file, 0, SeekOrigin::Start)?;
    let mut read_back = [0u8; 100];
    let read = platform.file_read(file, &mut read_back)?;
    let length = platform.file_length(file)?;
    platform.file_close(file)?;

    info!("wrote {} bytes, read {read} back, file length {length}", payload.len());

    let mut listed = 0;
    platform.directory_enum(&dir, &mut |entry| {
        info!("  found {entry}");
        listed += 1;
    })?;
    info!("enumerated {listed} file(s) under {dir}");
    Ok(())
}

/// Two-phase thread creation plus a latched waitable, the way the
/// background resource loader uses them.
fn thread_demo(platform: &'static PosixPlatform) {
    let waitable = platform.waitable_create();

    let worker = platform.thread_create();
    platform.thread_start(
        worker,
        Box::new(move || {
            platform.thread_sleep(Duration::from_millis(10));
            platform.waitable_signal(waitable);
        }),
    );

    platform.waitable_wait(waitable);
    platform.thread_join(worker);
    platform.waitable_free(waitable);
    info!("worker thread signalled and joined");
}

/// Round-trip a secret through the machine-bound cipher, if this machine
/// has an identity to bind to.
fn secret_demo(platform: &PosixPlatform) -> PlatformResult<()> {
    let key = match platform.machine_key() {
        Ok(key) => key,
        Err(err) if err.is(ErrorKind::NotSupported) => {
            warn!("no machine identity here, skipping the secret demo");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let sealed = encrypt(b"correct horse battery staple", &key)?;
    let opened = decrypt(&sealed, &key)?;
    info!(
        "sealed {} bytes of secret into {} bytes and got them back intact: {}",
        opened.len(),
        sealed.len(),
        opened == b"correct horse battery staple"
    );
    Ok(())
}

/// Feed the ping tracker like a chatty server connection would.
fn ping_demo(platform: &PosixPlatform) {
    let mut pings = PingList::new();
    for _ in 0..3 {
        let id = pings.next_ping_id(platform.utc_now_ms());
        platform.thread_sleep(Duration::from_millis(5));
        pings.update(id, platform.utc_now_ms());
    }
    info!("average ping over 3 loopback rounds: {} ms", pings.average_ping_ms());
}
