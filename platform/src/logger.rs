// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use log::{LevelFilter, Log, Metadata, Record};

use alloc::format;

use crate::Platform;

/// Routes the `log` crate's macros into [`Platform::log`].
///
/// The whole client logs through the `log` facade; this adapter is what
/// makes those records come out of the platform's one logging primitive
/// (the console on desktop, the debugger channel elsewhere). The platform
/// lives for the whole process anyway, so the `'static` borrow here is the
/// natural shape, and it lets the logger be installed with plain
/// `log::set_logger`:
///
/// ```ignore
/// let logger = Box::leak(Box::new(PlatformLogger::new(platform, LevelFilter::Info)));
/// log::set_logger(logger)?;
/// log::set_max_level(LevelFilter::Info);
/// ```
pub struct PlatformLogger {
    platform: &'static (dyn Platform + Send + Sync),
    max_level: LevelFilter,
}

impl PlatformLogger {
    /// Wraps a platform in a `log` sink. Records above `max_level` are
    /// dropped without formatting.
    pub fn new(
        platform: &'static (dyn Platform + Send + Sync),
        max_level: LevelFilter,
    ) -> PlatformLogger {
        PlatformLogger {
            platform,
            max_level,
        }
    }
}

impl Log for PlatformLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.platform
            .log(&format!("{:<5} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}
