// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

/// Computes the byte size of an allocation of `num_elems` elements of
/// `elem_size` bytes each.
///
/// A zero-sized request is rounded up to one byte, so that every successful
/// allocation has a unique address. Overflow of the multiplication yields
/// None; the platform layer treats that as an unrecoverable caller bug
/// (routed through [`Platform::fatal`](crate::Platform::fatal)) rather than
/// quietly allocating a wrong size.
///
/// Allocation failure itself needs no handling here: the global allocator
/// already terminates the process on out-of-memory, which is exactly the
/// behavior the client wants everywhere.
pub fn checked_alloc_size(num_elems: usize, elem_size: usize) -> Option<usize> {
    match num_elems.checked_mul(elem_size) {
        Some(0) => Some(1),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::checked_alloc_size;

    #[test]
    fn zero_sized_requests_become_one_byte() {
        assert_eq!(Some(1), checked_alloc_size(0, 16));
        assert_eq!(Some(1), checked_alloc_size(16, 0));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        assert_eq!(None, checked_alloc_size(usize::MAX, 2));
        assert_eq!(Some(usize::MAX), checked_alloc_size(usize::MAX, 1));
    }

    #[test]
    fn ordinary_sizes_multiply() {
        assert_eq!(Some(4096), checked_alloc_size(1024, 4));
    }
}
