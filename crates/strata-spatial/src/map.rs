//! The single-item-per-position [`SpatialMap`].

use crate::error::SpatialError;
use crate::events::{ItemAdded, ItemMoved, ItemRemoved};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::slice;
use strata_core::{EventRegistry, Point};

/// A bidirectional item ↔ position index holding at most one item per
/// position.
///
/// Both directions are kept as mutual inverses at every return: an item
/// present in the map has exactly one recorded position, and a position
/// maps back to the item recorded there. All mutating operations are
/// amortized `O(1)` given a well-distributed hasher.
///
/// Item equality and hashing must be independent of any mutable state;
/// for types without a suitable `Eq`/`Hash`, wrap them in
/// [`ById`](strata_core::ById). The hasher type parameter `S` is the
/// extension point for hash strategies tuned to a known coordinate range.
///
/// # Examples
///
/// ```
/// use strata_core::Point;
/// use strata_spatial::SpatialMap;
///
/// let mut map: SpatialMap<&str> = SpatialMap::new();
/// map.add("goblin", Point::new(1, 2)).unwrap();
/// assert_eq!(map.item_at(Point::new(1, 2)), Some(&"goblin"));
///
/// map.move_item(&"goblin", Point::new(3, 4)).unwrap();
/// assert_eq!(map.position_of(&"goblin"), Some(Point::new(3, 4)));
/// assert!(map.item_at(Point::new(1, 2)).is_none());
/// ```
pub struct SpatialMap<T, S = RandomState> {
    forward: IndexMap<T, Point, S>,
    reverse: IndexMap<Point, T, S>,
    added: EventRegistry<ItemAdded<T>>,
    moved: EventRegistry<ItemMoved<T>>,
    removed: EventRegistry<ItemRemoved<T>>,
}

impl<T: Clone + Eq + Hash> SpatialMap<T, RandomState> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty map with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<T: Clone + Eq + Hash> Default for SpatialMap<T, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash, S: BuildHasher + Clone> SpatialMap<T, S> {
    /// Create an empty map using a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Create an empty map with a capacity hint and a custom hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            forward: IndexMap::with_capacity_and_hasher(capacity, hasher.clone()),
            reverse: IndexMap::with_capacity_and_hasher(capacity, hasher),
            added: EventRegistry::new(),
            moved: EventRegistry::new(),
            removed: EventRegistry::new(),
        }
    }
}

impl<T: Clone + Eq + Hash, S: BuildHasher> SpatialMap<T, S> {
    /// Add `item` at `pos`.
    ///
    /// Fails with [`SpatialError::ItemAlreadyPresent`] if the item is in
    /// the map, or [`SpatialError::PositionOccupied`] if another item
    /// holds `pos`. Emits an added event on success.
    pub fn add(&mut self, item: T, pos: Point) -> Result<(), SpatialError> {
        if self.forward.contains_key(&item) {
            return Err(SpatialError::ItemAlreadyPresent);
        }
        if self.reverse.contains_key(&pos) {
            return Err(SpatialError::PositionOccupied { pos });
        }
        self.forward.insert(item.clone(), pos);
        self.reverse.insert(pos, item.clone());
        self.added.emit(&ItemAdded { item, pos });
        Ok(())
    }

    /// Move `item` to `target`.
    ///
    /// Fails with [`SpatialError::ItemNotFound`] if the item is absent,
    /// or [`SpatialError::PositionOccupied`] if a different item holds
    /// `target`. Moving an item onto its current position succeeds
    /// without emitting a moved event.
    pub fn move_item(&mut self, item: &T, target: Point) -> Result<(), SpatialError> {
        let old = *self.forward.get(item).ok_or(SpatialError::ItemNotFound)?;
        if old == target {
            return Ok(());
        }
        if self.reverse.contains_key(&target) {
            return Err(SpatialError::PositionOccupied { pos: target });
        }
        self.reverse.swap_remove(&old);
        self.reverse.insert(target, item.clone());
        self.forward.insert(item.clone(), target);
        self.moved.emit(&ItemMoved {
            item: item.clone(),
            old,
            new: target,
        });
        Ok(())
    }

    /// Remove `item`, returning the position it occupied.
    ///
    /// Fails with [`SpatialError::ItemNotFound`] if absent. Emits a
    /// removed event on success.
    pub fn remove(&mut self, item: &T) -> Result<Point, SpatialError> {
        let pos = self
            .forward
            .swap_remove(item)
            .ok_or(SpatialError::ItemNotFound)?;
        let removed = self
            .reverse
            .swap_remove(&pos)
            .expect("reverse index out of sync with forward index");
        self.removed.emit(&ItemRemoved { item: removed, pos });
        Ok(pos)
    }

    /// Remove whatever occupies `pos`, returning the removed items.
    ///
    /// The result holds zero or one items — the `SmallVec` return keeps
    /// the signature symmetric with the multi-map API. Emits a removed
    /// event per removed item.
    pub fn remove_at(&mut self, pos: Point) -> SmallVec<[T; 1]> {
        let mut out = SmallVec::new();
        if let Some(item) = self.reverse.swap_remove(&pos) {
            self.forward.swap_remove(&item);
            self.removed.emit(&ItemRemoved {
                item: item.clone(),
                pos,
            });
            out.push(item);
        }
        out
    }

    /// Remove every item. No removed events are emitted.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    /// The item at `pos`, if any.
    pub fn item_at(&self, pos: Point) -> Option<&T> {
        self.reverse.get(&pos)
    }

    /// The items at `pos` as a slice of length zero or one.
    ///
    /// Allocation-free; symmetric with the multi-map API.
    pub fn items_at(&self, pos: Point) -> &[T] {
        self.reverse
            .get(&pos)
            .map(slice::from_ref)
            .unwrap_or_default()
    }

    /// The recorded position of `item`, if present.
    pub fn position_of(&self, item: &T) -> Option<Point> {
        self.forward.get(item).copied()
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &T) -> bool {
        self.forward.contains_key(item)
    }

    /// Whether any item occupies `pos`.
    pub fn contains_position(&self, pos: Point) -> bool {
        self.reverse.contains_key(&pos)
    }

    /// Number of items in the map.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the map holds no items.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate over `(item, position)` pairs.
    ///
    /// The iteration order is unspecified; removals may reorder the
    /// remaining entries.
    pub fn iter(&self) -> impl Iterator<Item = (&T, Point)> {
        self.forward.iter().map(|(item, &pos)| (item, pos))
    }

    /// Iterate over the items.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.forward.keys()
    }

    /// Iterate over the occupied positions.
    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.reverse.keys().copied()
    }

    /// Registry for item-added notifications.
    pub fn on_added(&mut self) -> &mut EventRegistry<ItemAdded<T>> {
        &mut self.added
    }

    /// Registry for item-moved notifications.
    pub fn on_moved(&mut self) -> &mut EventRegistry<ItemMoved<T>> {
        &mut self.moved
    }

    /// Registry for item-removed notifications.
    pub fn on_removed(&mut self) -> &mut EventRegistry<ItemRemoved<T>> {
        &mut self.removed
    }
}
