//! Generational unit storage.
//!
//! Slots are reused in release order. Every release bumps the slot's
//! generation (5 bits, matching the wire id), so ids held by control groups
//! or stale stream records stop resolving once their unit is gone.
use std::collections::VecDeque;

use lockstep_core::{UnitHandle, UnitId};
use serde::{Deserialize, Serialize};

/// Generations wrap within the 5 bits a wire id carries.
const GENERATION_MASK: u8 = 0x1F;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Slot<T> {
    generation: u8,
    value: Option<T>,
}

/// Fixed-capacity arena addressed by [`UnitHandle`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: VecDeque<u16>,
    capacity: u16,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: u16) -> Self {
        Self {
            slots: Vec::new(),
            free: VecDeque::new(),
            capacity,
        }
    }

    /// Stores `value`, returning its handle, or gives it back when full.
    pub fn insert(&mut self, value: T) -> Result<UnitHandle, T> {
        if let Some(index) = self.free.pop_front() {
            self.slots[index as usize].value = Some(value);
            return Ok(UnitHandle(index));
        }
        if self.slots.len() >= self.capacity as usize {
            return Err(value);
        }
        let index = self.slots.len() as u16;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Ok(UnitHandle(index))
    }

    pub fn remove(&mut self, handle: UnitHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1) & GENERATION_MASK;
        self.free.push_back(handle.0);
        Some(value)
    }

    pub fn get(&self, handle: UnitHandle) -> Option<&T> {
        self.slots.get(handle.index())?.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: UnitHandle) -> Option<&mut T> {
        self.slots.get_mut(handle.index())?.value.as_mut()
    }

    /// Wire id naming the slot's current generation.
    pub fn id_of(&self, handle: UnitHandle) -> UnitId {
        self.slots
            .get(handle.index())
            .map_or(UnitId::NONE, |slot| {
                UnitId::from_parts(handle.0, slot.generation)
            })
    }

    /// Live handle named by `id`, if its generation is current.
    pub fn resolve(&self, id: UnitId) -> Option<UnitHandle> {
        let index = id.index()?;
        let slot = self.slots.get(index as usize)?;
        (slot.value.is_some() && slot.generation == id.generation()).then_some(UnitHandle(index))
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| Some((UnitHandle(index as u16), slot.value.as_ref()?)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| Some((UnitHandle(index as u16), slot.value.as_mut()?)))
    }

    pub fn handles(&self) -> Vec<UnitHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
