// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Mutex;

/// A table of platform resources addressed by the numeric ids that go out
/// in the opaque handle types.
///
/// Ids start at 1 so that a zeroed handle never resolves to anything, and a
/// freed slot is reused for the next insert. Looking up an id that was
/// never handed out, or was already taken back, just yields None; the
/// callers turn that into an invalid-argument error.
pub(crate) struct Registry<T> {
    slots: Mutex<Vec<Option<T>>>,
}

impl<T> Registry<T> {
    pub fn new() -> Registry<T> {
        Registry {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Stores a resource, returning the id for its handle.
    pub fn insert(&self, value: T) -> u64 {
        let mut slots = self.slots.lock().unwrap();
        for (i, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(value);
                return (i + 1) as u64;
            }
        }
        slots.push(Some(value));
        slots.len() as u64
    }

    /// Removes and returns the resource, invalidating the id.
    pub fn take(&self, id: u64) -> Option<T> {
        let mut slots = self.slots.lock().unwrap();
        let index = (id as usize).checked_sub(1)?;
        slots.get_mut(index)?.take()
    }

    /// Runs `f` on the resource while the table is locked. Keep `f` short;
    /// anything that can block belongs outside (clone the resource out
    /// instead).
    pub fn with_mut<R>(&self, id: u64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut slots = self.slots.lock().unwrap();
        let index = (id as usize).checked_sub(1)?;
        slots.get_mut(index)?.as_mut().map(f)
    }
}

impl<T: Clone> Registry<T> {
    /// Clones the resource out, so the caller can work with it without
    /// holding the table lock (the resources are `Arc`s and fds, so clones
    /// are cheap).
    pub fn get(&self, id: u64) -> Option<T> {
        let slots = self.slots.lock().unwrap();
        let index = (id as usize).checked_sub(1)?;
        slots.get(index)?.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;

    #[test]
    fn ids_are_nonzero_and_slots_are_reused() {
        let registry = Registry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");
        assert_eq!(1, a);
        assert_eq!(2, b);

        assert_eq!(Some("a"), registry.take(a));
        assert_eq!(None, registry.take(a));
        assert_eq!(a, registry.insert("c"));
        assert_eq!(Some("c"), registry.get(a));
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let registry = Registry::<u32>::new();
        assert_eq!(None, registry.get(0));
        assert_eq!(None, registry.get(7));
        assert_eq!(None, registry.with_mut(0, |v| *v));
    }
}
