//! Generational entity pools
//!
//! Every live entity sits in a slot of a [`Pool`]. A [`Handle`] names a slot
//! plus the generation it was issued for, so a handle to a destroyed entity
//! simply stops resolving instead of aliasing whatever reuses the slot.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Non-owning reference to an entity in a [`Pool<T>`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index (stable for the entity's lifetime)
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: derives would demand the same traits from `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation-checked handles
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Freed slot indices, lowest on top
    free: BinaryHeap<Reverse<u32>>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: BinaryHeap::new(),
            len: 0,
        }
    }

    /// Insert a value, reusing the lowest freed slot first
    pub fn spawn(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    /// Remove an entity. Every outstanding handle to it stops resolving.
    pub fn destroy(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(Reverse(handle.index));
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Whether the handle still names a live entity
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(i as u32, slot.generation), v))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|v| (Handle::new(i as u32, generation), v))
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    /// Snapshot of live handles, safe to hold while mutating the pool
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(h, _)| h).collect()
    }

    pub fn count_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.values().filter(|v| predicate(v)).count()
    }

    /// Destroy every entity matching `remove`, returning them
    pub fn drain_where(&mut self, mut remove: impl FnMut(&T) -> bool) -> Vec<(Handle<T>, T)> {
        let doomed: Vec<Handle<T>> = self
            .iter()
            .filter(|(_, v)| remove(v))
            .map(|(h, _)| h)
            .collect();
        doomed
            .into_iter()
            .filter_map(|h| self.destroy(h).map(|v| (h, v)))
            .collect()
    }

    /// Destroy everything, invalidating all handles
    pub fn clear(&mut self) {
        for handle in self.handles() {
            self.destroy(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroyed_handle_stops_resolving() {
        let mut pool = Pool::new();
        let a = pool.spawn("a");
        assert_eq!(pool.get(a), Some(&"a"));

        assert_eq!(pool.destroy(a), Some("a"));
        assert!(pool.get(a).is_none());
        assert!(pool.destroy(a).is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_reused_slot_does_not_alias() {
        let mut pool = Pool::new();
        let old = pool.spawn(1);
        pool.destroy(old);
        let new = pool.spawn(2);

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(pool.get(old).is_none());
        assert_eq!(pool.get(new), Some(&2));
    }

    #[test]
    fn test_iteration_in_slot_order() {
        let mut pool = Pool::new();
        let handles: Vec<_> = (0..5).map(|i| pool.spawn(i)).collect();
        pool.destroy(handles[1]);
        pool.destroy(handles[3]);

        let values: Vec<_> = pool.values().copied().collect();
        assert_eq!(values, vec![0, 2, 4]);

        // Lowest freed slot is reused first
        let h = pool.spawn(9);
        assert_eq!(h.index(), 1);
    }

    #[test]
    fn test_reuse_order_ignores_destroy_order() {
        let mut pool = Pool::new();
        let handles: Vec<_> = (0..8).map(|i| pool.spawn(i)).collect();
        for i in [5, 2, 7, 0, 3] {
            pool.destroy(handles[i]);
        }

        let reused: Vec<u32> = (0..5).map(|i| pool.spawn(100 + i).index()).collect();
        assert_eq!(reused, vec![0, 2, 3, 5, 7]);
        // Free list exhausted: next spawn appends
        assert_eq!(pool.spawn(200).index(), 8);
    }

    #[test]
    fn test_count_and_drain() {
        let mut pool = Pool::new();
        for i in 0..10 {
            pool.spawn(i);
        }
        assert_eq!(pool.count_where(|v| v % 2 == 0), 5);

        let drained = pool.drain_where(|v| *v >= 7);
        assert_eq!(drained.len(), 3);
        assert_eq!(pool.len(), 7);
        for (h, _) in drained {
            assert!(!pool.contains(h));
        }

        pool.clear();
        assert!(pool.is_empty());
    }
}
