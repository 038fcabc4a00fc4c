// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::mem;
use std::time::{SystemTime, UNIX_EPOCH};

use platform::{Clock, DateTime, Instant};

use crate::PosixPlatform;

impl Clock for PosixPlatform {
    fn utc_now_ms(&self) -> u64 {
        // A clock before 1970 is not a case worth carrying an error channel
        // for; pin it to the epoch and move on.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis() as u64)
            .unwrap_or(0)
    }

    fn local_now(&self) -> DateTime {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .unwrap_or(0);
        let time = secs as libc::time_t;

        // std has no notion of the local timezone; this is what
        // localtime_r is for.
        let mut tm: libc::tm = unsafe { mem::zeroed() };
        unsafe { libc::localtime_r(&time, &mut tm) };

        DateTime {
            year: tm.tm_year + 1900,
            month: (tm.tm_mon + 1) as u8,
            day: tm.tm_mday as u8,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
            second: tm.tm_sec as u8,
        }
    }

    fn now(&self) -> Instant {
        Instant::reference() + self.started.elapsed()
    }
}
