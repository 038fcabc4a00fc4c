// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{fill_zeroes, Pod, Zeroable};

/// How many round trips are tracked at once. Pings older than this many
/// outstanding requests fall out of the average.
const PING_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, Default, Zeroable, Pod)]
#[repr(C)]
struct PingEntry {
    sent: u64,
    recv: u64,
    id: u16,
    _pad: [u16; 3],
}

/// Round-trip latency tracking over a fixed ring of in-flight pings.
///
/// The connection code calls [`PingList::next_ping_id`] when it sends a ping
/// packet and [`PingList::update`] when the matching reply arrives;
/// [`PingList::average_ping_ms`] is what ends up on the debug overlay.
///
/// Each connection owns its own `PingList` (constructed wherever the
/// connection state lives), so tests and multiple connections don't step on
/// each other. Timestamps are passed in by the caller, from
/// [`Clock::utc_now_ms`](crate::Clock::utc_now_ms).
#[derive(Debug)]
pub struct PingList {
    entries: [PingEntry; PING_ENTRIES],
    head: usize,
}

impl Default for PingList {
    fn default() -> PingList {
        PingList::new()
    }
}

impl PingList {
    /// Creates an empty ping list.
    pub fn new() -> PingList {
        PingList {
            entries: [PingEntry::default(); PING_ENTRIES],
            head: 0,
        }
    }

    /// Allocates the id for the next outgoing ping and records its send
    /// time.
    ///
    /// Ids are sequential and wrap around the id space (not the ring), so a
    /// reply can always be told apart from the replies of the other nine
    /// tracked pings. The oldest ring slot is overwritten unconditionally;
    /// if more than [`PING_ENTRIES`] pings are in flight, the oldest ones
    /// are silently dropped from the measurements.
    pub fn next_ping_id(&mut self, now_ms: u64) -> u16 {
        let next = self.entries[self.head].id.wrapping_add(1);

        let head = (self.head + 1) % PING_ENTRIES;
        self.entries[head] = PingEntry {
            id: next,
            sent: now_ms,
            recv: 0,
            _pad: [0; 3],
        };
        self.head = head;
        next
    }

    /// Records the receive time for the ping with the given id.
    ///
    /// If the id has already been evicted from the ring (or never existed),
    /// the reply is silently dropped.
    pub fn update(&mut self, id: u16, now_ms: u64) {
        for entry in &mut self.entries {
            if entry.id == id {
                entry.recv = now_ms;
                return;
            }
        }
    }

    /// The average one-way latency in milliseconds, over the tracked pings
    /// that have both timestamps.
    ///
    /// The measured value is a full round trip; it is halved here since
    /// callers want the time for data to reach the server. Returns 0 when
    /// no ping has completed yet.
    pub fn average_ping_ms(&self) -> u32 {
        let mut total_ms = 0u64;
        let mut measures = 0u64;

        for entry in &self.entries {
            if entry.sent == 0 || entry.recv == 0 {
                continue;
            }
            total_ms += entry.recv.saturating_sub(entry.sent);
            measures += 1;
        }

        if measures == 0 {
            return 0;
        }
        ((total_ms / 2) / measures) as u32
    }

    /// Forgets all tracked pings, e.g. after a reconnect.
    pub fn reset(&mut self) {
        fill_zeroes(&mut self.entries);
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{PingList, PING_ENTRIES};

    #[test]
    fn eviction_keeps_only_the_newest_measurements() {
        let mut pings = PingList::new();

        let mut last_id = 0;
        for i in 0..PING_ENTRIES as u64 + 1 {
            last_id = pings.next_ping_id(1000 + i);
        }
        // Only the newest ping gets a reply; its round trip is 100 ms.
        pings.update(last_id, 1000 + PING_ENTRIES as u64 + 100);
        assert_eq!(50, pings.average_ping_ms());

        // The first ping's id was evicted by the 11th send; a late reply to
        // it must not disturb the average.
        pings.update(1, 9999);
        assert_eq!(50, pings.average_ping_ms());
    }

    #[test]
    fn average_is_zero_with_no_completed_pings() {
        let mut pings = PingList::new();
        assert_eq!(0, pings.average_ping_ms());
        pings.next_ping_id(1234);
        assert_eq!(0, pings.average_ping_ms());
    }

    #[test]
    fn averages_over_all_paired_entries() {
        let mut pings = PingList::new();
        let a = pings.next_ping_id(1000);
        let b = pings.next_ping_id(1000);
        pings.update(a, 1100);
        pings.update(b, 1300);
        // Round trips of 100 and 300 ms, halved and averaged.
        assert_eq!(100, pings.average_ping_ms());
    }

    #[test]
    fn ids_wrap_without_colliding_in_the_ring() {
        let mut pings = PingList::new();
        let mut id = 0;
        for i in 0..u16::MAX as u64 + 3 {
            id = pings.next_ping_id(i);
        }
        // Wrapped past the id space; the newest id is still trackable.
        pings.update(id, u16::MAX as u64 + 10);
        assert_ne!(0, pings.average_ping_ms());
    }

    #[test]
    fn reset_forgets_history() {
        let mut pings = PingList::new();
        let id = pings.next_ping_id(500);
        pings.update(id, 700);
        assert_ne!(0, pings.average_ping_ms());
        pings.reset();
        assert_eq!(0, pings.average_ping_ms());
    }
}
