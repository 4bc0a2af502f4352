use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Generational handle to a body owned by a [`World`](crate::world::World).
///
/// The slot index doubles as the body's stable ordering key: broadphase
/// sorting and pair normalisation compare slot indices, never generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
        }
    }

    /// Builds a handle from a raw slot index with generation zero.
    pub fn from_index(index: u32) -> Self {
        Self {
            index,
            generation: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for BodyId {
    fn default() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
        }
    }
}

/// Slot arena handing out generational [`BodyId`]s.
///
/// Freed slots are recycled oldest-first; a recycled slot carries a bumped
/// generation so handles to the removed value stop resolving.
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    generations: Vec<u32>,
    free: VecDeque<usize>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free: VecDeque::new(),
            live: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> BodyId {
        self.live += 1;
        if let Some(index) = self.free.pop_front() {
            self.slots[index] = Some(value);
            return BodyId::new(index, self.generations[index]);
        }

        let index = self.slots.len();
        self.slots.push(Some(value));
        self.generations.push(0);
        BodyId::new(index, 0)
    }

    pub fn remove(&mut self, id: BodyId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let index = id.index();
        let value = self.slots[index].take();
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push_back(index);
        self.live -= 1;
        value
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.generations.get(id.index()).copied() == Some(id.generation())
            && self.slots[id.index()].is_some()
    }

    pub fn get(&self, id: BodyId) -> Option<&T> {
        if self.contains(id) {
            self.slots[id.index()].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut T> {
        if self.contains(id) {
            self.slots[id.index()].as_mut()
        } else {
            None
        }
    }

    /// Mutable access to two distinct values at once.
    pub fn get2_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() || !self.contains(a) || !self.contains(b) {
            return None;
        }

        let (low, high, flipped) = if a.index() < b.index() {
            (a.index(), b.index(), false)
        } else {
            (b.index(), a.index(), true)
        };
        let (left, right) = self.slots.split_at_mut(high);
        let first = left[low].as_mut()?;
        let second = right[0].as_mut()?;
        if flipped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Live values with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.as_ref()
                .map(|value| (BodyId::new(index, self.generations[index]), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut T)> + '_ {
        let generations = &self.generations;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut()
                    .map(|value| (BodyId::new(index, generations[index]), value))
            })
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut().flatten()
    }

    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Upper bound on slot indices ever handed out.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(feature = "parallel")]
impl<T: Send> Arena<T> {
    pub fn par_values_mut(&mut self) -> impl rayon::iter::ParallelIterator<Item = &mut T> + '_ {
        use rayon::prelude::*;
        self.slots.par_iter_mut().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handles_stop_resolving() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.remove(a), Some("a"));
        assert!(arena.get(a).is_none());

        let c = arena.insert("c");
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert_eq!(arena.get(c), Some(&"c"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn get2_mut_preserves_argument_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let (x, y) = arena.get2_mut(b, a).unwrap();
        assert_eq!((*x, *y), (2, 1));
        assert!(arena.get2_mut(a, a).is_none());
    }
}
