/// A stable, generation-checked index into a [`Slab`].
///
/// A key stays valid until the value it points to is removed. Once the slot
/// is reused the generation no longer matches, so a stale key can never
/// reach the new occupant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A fixed-capacity slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and returns
/// stable [`Key`]s whose slots are reused after removal.
///
/// All storage is reserved by [`with_capacity`](Self::with_capacity).
/// Unlike a growable slab, [`insert`](Self::insert) refuses new values once
/// every slot is taken, so steady-state use never touches the allocator.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Generation counter of each slot, bumped on every removal.
    generations: Vec<u32>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` holding at most `capacity` values.
    ///
    /// Free slots are handed out lowest index first.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(
            u32::try_from(capacity).is_ok(),
            "slab capacity must fit in a u32"
        );

        let items = (0..capacity).map(|_| None).collect();
        let generations = vec![0; capacity];
        let free = (0..capacity).rev().collect();

        Self {
            items,
            generations,
            free,
        }
    }

    /// Inserts a value and returns its key, or hands the value back if the
    /// slab is full.
    pub(crate) fn insert(&mut self, item: T) -> Result<Key, T> {
        let Some(index) = self.free.pop() else {
            return Err(item);
        };

        self.items[index] = Some(item);

        Ok(Key {
            index: index as u32,
            generation: self.generations[index],
        })
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// Returns `None` if the key is stale or its slot is already free.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let index = key.index as usize;

        if self.generations.get(index) != Some(&key.generation) {
            return None;
        }

        let item = self.items[index].take()?;

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(index);

        Some(item)
    }

    /// Returns a reference to the value stored under `key`, if it is live.
    #[cfg(test)]
    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        let index = key.index as usize;

        if self.generations.get(index) != Some(&key.generation) {
            return None;
        }

        self.items[index].as_ref()
    }

    /// Iterates over every live value together with its key.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.items
            .iter()
            .zip(self.generations.iter())
            .enumerate()
            .filter_map(|(index, (item, &generation))| {
                let key = Key {
                    index: index as u32,
                    generation,
                };
                item.as_ref().map(|item| (key, item))
            })
    }

    /// Number of live values.
    pub(crate) fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }

    /// Maximum number of values the slab can hold.
    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_until_full() {
        let mut slab = Slab::with_capacity(2);

        let a = slab.insert('a').unwrap();
        let b = slab.insert('b').unwrap();

        assert_eq!(slab.insert('c'), Err('c'));
        assert_eq!(slab.len(), 2);
        assert_eq!(slab.get(a), Some(&'a'));
        assert_eq!(slab.get(b), Some(&'b'));
    }

    #[test]
    fn stale_key_does_not_reach_new_occupant() {
        let mut slab = Slab::with_capacity(1);

        let old = slab.insert(1).unwrap();
        assert_eq!(slab.remove(old), Some(1));

        let new = slab.insert(2).unwrap();
        assert_eq!(old.index, new.index);
        assert_ne!(old.generation, new.generation);

        assert_eq!(slab.remove(old), None);
        assert_eq!(slab.get(new), Some(&2));
    }

    #[test]
    fn reuse_does_not_grow() {
        let mut slab = Slab::with_capacity(4);

        for round in 0..32 {
            let key = slab.insert(round).unwrap();
            assert_eq!(slab.remove(key), Some(round));
        }

        assert_eq!(slab.capacity(), 4);
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn iter_yields_live_entries_only() {
        let mut slab = Slab::with_capacity(3);

        let a = slab.insert("a").unwrap();
        let _b = slab.insert("b").unwrap();
        slab.remove(a);

        let live: Vec<_> = slab.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec!["b"]);
    }
}
