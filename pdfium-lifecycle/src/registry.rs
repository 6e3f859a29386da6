//! Generational slot registry keyed by typed [`Handle`]s.

use crate::error::{PdfiumError, Result};
use crate::handle::{Handle, HandleType, GENERATION_MASK};
use std::marker::PhantomData;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena for one handle kind.
///
/// Removing an entry bumps its slot's generation, so handles issued before
/// the removal no longer resolve even after the slot is reused.
pub(crate) struct Registry<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _kind: PhantomData<fn() -> K>,
}

fn next_generation(generation: u32) -> u32 {
    let next = generation.wrapping_add(1) & GENERATION_MASK;
    if next == 0 {
        1
    } else {
        next
    }
}

impl<K: HandleType, T> Registry<K, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _kind: PhantomData,
        }
    }

    pub fn insert(&mut self, value: T) -> Handle<K> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        Handle::new(index, 1)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Resolve or fail with [`PdfiumError::InvalidHandle`].
    pub fn lookup(&self, handle: Handle<K>) -> Result<&T> {
        self.get(handle)
            .ok_or(PdfiumError::InvalidHandle { kind: K::KIND })
    }

    pub fn lookup_mut(&mut self, handle: Handle<K>) -> Result<&mut T> {
        self.get_mut(handle)
            .ok_or(PdfiumError::InvalidHandle { kind: K::KIND })
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = next_generation(slot.generation);
        self.free.push(handle.index());
        self.live -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Handles whose entries match `pred`, in issue order of their slots.
    pub fn handles_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<Handle<K>> {
        self.iter()
            .filter(|(_, value)| pred(value))
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Remove every entry matching `pred` and return them.
    pub fn drain_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<(Handle<K>, T)> {
        let handles = self.handles_where(&mut pred);
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle).map(|value| (handle, value)))
            .collect()
    }
}

impl<K: HandleType, T> Default for Registry<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
