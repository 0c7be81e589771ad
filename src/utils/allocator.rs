use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Identity of a collision object (the body side of a pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(pub GenerationalId);

impl EntityId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self(GenerationalId::new(index, generation))
    }

    pub fn from_index(index: u32) -> Self {
        Self::new(index as usize, 0)
    }

    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }

    pub fn is_null(&self) -> bool {
        self.0.index == usize::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self(GenerationalId::new(usize::MAX, 0))
    }
}

/// Handle to a manifold owned by the dispatcher's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifoldHandle(pub GenerationalId);

/// Anything an [`Arena`] can hand out as a key.
pub trait ArenaKey: Copy {
    fn from_raw(id: GenerationalId) -> Self;
    fn raw(&self) -> GenerationalId;
}

impl ArenaKey for EntityId {
    fn from_raw(id: GenerationalId) -> Self {
        Self(id)
    }

    fn raw(&self) -> GenerationalId {
        self.0
    }
}

impl ArenaKey for ManifoldHandle {
    fn from_raw(id: GenerationalId) -> Self {
        Self(id)
    }

    fn raw(&self) -> GenerationalId {
        self.0
    }
}

/// Generational pool: slots are recycled, stale keys fail lookups instead of aliasing.
pub struct Arena<T, K: ArenaKey = EntityId> {
    slots: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    live: usize,
    _key: std::marker::PhantomData<K>,
}

impl<T, K: ArenaKey> Default for Arena<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: ArenaKey> Arena<T, K> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            live: 0,
            _key: std::marker::PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> K {
        self.insert_with(|_| item)
    }

    /// Inserts a value built from its own key (objects that store their id).
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        self.live += 1;
        if let Some(index) = self.free_list.pop_front() {
            let key = K::from_raw(GenerationalId::new(index, self.generations[index]));
            self.slots[index] = Some(build(key));
            return key;
        }

        let index = self.slots.len();
        let key = K::from_raw(GenerationalId::new(index, 0));
        self.slots.push(Some(build(key)));
        self.generations.push(0);
        key
    }

    pub fn get(&self, key: K) -> Option<&T> {
        if self.is_valid(key) {
            self.slots.get(key.raw().index).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        if self.is_valid(key) {
            self.slots
                .get_mut(key.raw().index)
                .and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn remove(&mut self, key: K) -> Option<T> {
        if !self.is_valid(key) {
            return None;
        }
        let index = key.raw().index;
        let taken = self.slots.get_mut(index).and_then(Option::take);
        if taken.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_list.push_back(index);
            self.live -= 1;
        }
        taken
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|item| {
                (
                    K::from_raw(GenerationalId::new(index, self.generations[index])),
                    item,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        let generations = &self.generations;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|item| {
                    (
                        K::from_raw(GenerationalId::new(index, generations[index])),
                        item,
                    )
                })
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn is_valid(&self, key: K) -> bool {
        let raw = key.raw();
        self.generations
            .get(raw.index)
            .copied()
            .map(|gen| gen == raw.generation)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_miss_after_slot_reuse() {
        let mut pool: Arena<&str, ManifoldHandle> = Arena::new();
        let first = pool.insert("first");
        assert_eq!(pool.remove(first), Some("first"));

        let second = pool.insert("second");
        assert_eq!(first.0.index, second.0.index);
        assert!(pool.get(first).is_none());
        assert_eq!(pool.get(second), Some(&"second"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn insert_with_sees_its_own_key() {
        let mut arena: Arena<EntityId> = Arena::new();
        let id = arena.insert_with(|id| id);
        assert_eq!(arena.get(id), Some(&id));
    }
}
