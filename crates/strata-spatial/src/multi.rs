//! The many-items-per-position [`MultiSpatialMap`].

use crate::error::SpatialError;
use crate::events::{ItemAdded, ItemMoved, ItemRemoved};
use crate::pool::{default_shared, SharedListPool};
use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use strata_core::{EventRegistry, Point};

/// A bidirectional item ↔ position index permitting many items per
/// position.
///
/// Items sharing a position are kept in insertion order, in a `Vec`
/// rented from a [`ListPool`](crate::ListPool); when the last item leaves
/// a position the vector is returned to the pool, so add/remove churn
/// does not allocate steadily. Several maps may share one pool to
/// amortize together (single-threaded only).
///
/// `add` never fails due to occupancy — only because the item is already
/// present somewhere in the map.
///
/// # Examples
///
/// ```
/// use strata_core::Point;
/// use strata_spatial::MultiSpatialMap;
///
/// let mut map: MultiSpatialMap<&str> = MultiSpatialMap::new();
/// let p = Point::new(0, 0);
/// map.add("sword", p).unwrap();
/// map.add("shield", p).unwrap();
/// assert_eq!(map.items_at(p), &["sword", "shield"]);
/// ```
pub struct MultiSpatialMap<T, S = RandomState> {
    forward: IndexMap<T, Point, S>,
    reverse: IndexMap<Point, Vec<T>, S>,
    pool: SharedListPool<T>,
    added: EventRegistry<ItemAdded<T>>,
    moved: EventRegistry<ItemMoved<T>>,
    removed: EventRegistry<ItemRemoved<T>>,
}

impl<T: Clone + Eq + Hash + 'static> MultiSpatialMap<T, RandomState> {
    /// Create an empty map with a dedicated default pool.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty map with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher_and_pool(capacity, RandomState::new(), default_shared())
    }

    /// Create an empty map sharing the given list pool.
    pub fn with_pool(pool: SharedListPool<T>) -> Self {
        Self::with_capacity_and_hasher_and_pool(0, RandomState::new(), pool)
    }
}

impl<T: Clone + Eq + Hash + 'static> Default for MultiSpatialMap<T, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash + 'static, S: BuildHasher + Clone> MultiSpatialMap<T, S> {
    /// Create an empty map with a custom hasher and a dedicated pool.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher_and_pool(0, hasher, default_shared())
    }

    /// Create an empty map with a capacity hint, custom hasher, and pool.
    pub fn with_capacity_and_hasher_and_pool(
        capacity: usize,
        hasher: S,
        pool: SharedListPool<T>,
    ) -> Self {
        Self {
            forward: IndexMap::with_capacity_and_hasher(capacity, hasher.clone()),
            reverse: IndexMap::with_capacity_and_hasher(capacity, hasher),
            pool,
            added: EventRegistry::new(),
            moved: EventRegistry::new(),
            removed: EventRegistry::new(),
        }
    }
}

impl<T: Clone + Eq + Hash + 'static, S: BuildHasher> MultiSpatialMap<T, S> {
    /// Add `item` at `pos`.
    ///
    /// Fails with [`SpatialError::ItemAlreadyPresent`] if the item is
    /// anywhere in the map; position occupancy never blocks. Emits an
    /// added event on success.
    pub fn add(&mut self, item: T, pos: Point) -> Result<(), SpatialError> {
        if self.forward.contains_key(&item) {
            return Err(SpatialError::ItemAlreadyPresent);
        }
        self.forward.insert(item.clone(), pos);
        match self.reverse.entry(pos) {
            Entry::Occupied(mut e) => e.get_mut().push(item.clone()),
            Entry::Vacant(e) => {
                let mut list = self.pool.borrow_mut().rent();
                list.push(item.clone());
                e.insert(list);
            }
        }
        self.added.emit(&ItemAdded { item, pos });
        Ok(())
    }

    /// Move `item` to `target`.
    ///
    /// Fails with [`SpatialError::ItemNotFound`] if the item is absent;
    /// target occupancy never blocks. A zero-distance move succeeds
    /// without emitting a moved event.
    pub fn move_item(&mut self, item: &T, target: Point) -> Result<(), SpatialError> {
        let old = *self.forward.get(item).ok_or(SpatialError::ItemNotFound)?;
        if old == target {
            return Ok(());
        }
        self.detach_from_position(item, old);
        self.attach_to_position(item.clone(), target);
        self.forward.insert(item.clone(), target);
        self.moved.emit(&ItemMoved {
            item: item.clone(),
            old,
            new: target,
        });
        Ok(())
    }

    /// Move every item at `from` to `to`, as one atomic batch.
    ///
    /// Returns the number of items moved; fails with
    /// [`SpatialError::NoItemsAtPosition`] if `from` is empty. A
    /// same-position batch succeeds without emitting events.
    pub fn move_all(&mut self, from: Point, to: Point) -> Result<usize, SpatialError> {
        if !self.reverse.contains_key(&from) {
            return Err(SpatialError::NoItemsAtPosition { pos: from });
        }
        if from == to {
            return Ok(self.reverse[&from].len());
        }
        Ok(self.drain_position(from, to))
    }

    /// Move whichever items at `from` can legally move to `to`.
    ///
    /// For a plain multi-map every item is movable, so this is the
    /// never-failing form of [`move_all`](Self::move_all): it returns the
    /// moved items (possibly empty) instead of erroring on an empty
    /// source. The partial-success contract matters for layered
    /// compositions, where single-item layers can block.
    pub fn move_valid(&mut self, from: Point, to: Point) -> Vec<T> {
        if from == to || !self.reverse.contains_key(&from) {
            return Vec::new();
        }
        let snapshot = self.reverse[&from].clone();
        self.drain_position(from, to);
        snapshot
    }

    /// Remove `item`, returning the position it occupied.
    pub fn remove(&mut self, item: &T) -> Result<Point, SpatialError> {
        let pos = self
            .forward
            .swap_remove(item)
            .ok_or(SpatialError::ItemNotFound)?;
        self.detach_from_position(item, pos);
        self.removed.emit(&ItemRemoved {
            item: item.clone(),
            pos,
        });
        Ok(pos)
    }

    /// Remove every item at `pos`, returning them in insertion order.
    ///
    /// Emits a removed event per item. The backing list goes back to the
    /// pool.
    pub fn remove_at(&mut self, pos: Point) -> SmallVec<[T; 2]> {
        let Some(list) = self.reverse.swap_remove(&pos) else {
            return SmallVec::new();
        };
        let out: SmallVec<[T; 2]> = list.iter().cloned().collect();
        self.pool.borrow_mut().give_back(list);
        for item in &out {
            self.forward.swap_remove(item);
            self.removed.emit(&ItemRemoved {
                item: item.clone(),
                pos,
            });
        }
        out
    }

    /// Remove every item. No removed events are emitted; backing lists
    /// return to the pool.
    pub fn clear(&mut self) {
        self.forward.clear();
        let mut pool = self.pool.borrow_mut();
        for (_, list) in self.reverse.drain(..) {
            pool.give_back(list);
        }
    }

    /// The items at `pos`, in insertion order. Allocation-free.
    pub fn items_at(&self, pos: Point) -> &[T] {
        self.reverse.get(&pos).map(Vec::as_slice).unwrap_or_default()
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

    /// Total number of items across all positions.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the map holds no items.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterate over `(item, position)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&T, Point)> {
        self.forward.iter().map(|(item, &pos)| (item, pos))
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

    /// Move every item from `from` onto `to`, emitting moved events.
    /// Caller guarantees `from != to` and that `from` exists.
    fn drain_position(&mut self, from: Point, to: Point) -> usize {
        let list = self
            .reverse
            .swap_remove(&from)
            .expect("drain_position requires an occupied source");
        let count = list.len();
        for item in &list {
            self.forward.insert(item.clone(), to);
        }
        let moved: SmallVec<[T; 4]> = list.iter().cloned().collect();
        match self.reverse.entry(to) {
            Entry::Occupied(mut e) => {
                e.get_mut().extend(list.iter().cloned());
                self.pool.borrow_mut().give_back(list);
            }
            Entry::Vacant(e) => {
                // Reuse the source list wholesale.
                e.insert(list);
            }
        }
        // Emit after the indexes are consistent.
        for item in moved {
            self.moved.emit(&ItemMoved {
                item,
                old: from,
                new: to,
            });
        }
        count
    }

    /// Remove `item` from the position list at `pos`, returning the list
    /// to the pool when it empties. Does not touch the forward index.
    fn detach_from_position(&mut self, item: &T, pos: Point) {
        let list = self
            .reverse
            .get_mut(&pos)
            .expect("reverse index out of sync with forward index");
        let idx = list
            .iter()
            .position(|i| i == item)
            .expect("item missing from its position list");
        list.remove(idx);
        if list.is_empty() {
            let empty = self.reverse.swap_remove(&pos).expect("entry just accessed");
            self.pool.borrow_mut().give_back(empty);
        }
    }

    /// Append `item` to the position list at `pos`, renting a list for a
    /// newly occupied position. Does not touch the forward index.
    fn attach_to_position(&mut self, item: T, pos: Point) {
        match self.reverse.entry(pos) {
            Entry::Occupied(mut e) => e.get_mut().push(item),
            Entry::Vacant(e) => {
                let mut list = self.pool.borrow_mut().rent();
                list.push(item);
                e.insert(list);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{shared, ReusableListPool};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn many_items_share_a_position_in_insertion_order() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        for i in [3, 1, 2] {
            map.add(i, p(0, 0)).unwrap();
        }
        assert_eq!(map.items_at(p(0, 0)), &[3, 1, 2]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn duplicate_item_rejected_even_at_other_position() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        map.add(1, p(0, 0)).unwrap();
        assert_eq!(
            map.add(1, p(5, 5)),
            Err(SpatialError::ItemAlreadyPresent)
        );
        assert_eq!(map.position_of(&1), Some(p(0, 0)));
    }

    #[test]
    fn move_never_blocks_on_occupancy() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        map.add(1, p(0, 0)).unwrap();
        map.add(2, p(1, 1)).unwrap();
        map.move_item(&1, p(1, 1)).unwrap();
        assert_eq!(map.items_at(p(1, 1)), &[2, 1]);
        assert!(!map.contains_position(p(0, 0)));
    }

    #[test]
    fn remove_preserves_order_of_remaining_items() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        for i in [1, 2, 3] {
            map.add(i, p(0, 0)).unwrap();
        }
        map.remove(&2).unwrap();
        assert_eq!(map.items_at(p(0, 0)), &[1, 3]);
    }

    #[test]
    fn last_removal_releases_list_to_pool() {
        let pool = Rc::new(RefCell::new(ReusableListPool::new(4, 16)));
        let handle: SharedListPool<u32> = pool.clone();
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::with_pool(handle);

        map.add(1, p(0, 0)).unwrap();
        map.add(2, p(0, 0)).unwrap();
        assert_eq!(pool.borrow().pooled_count(), 0);

        map.remove(&1).unwrap();
        assert_eq!(pool.borrow().pooled_count(), 0, "position still occupied");
        map.remove(&2).unwrap();
        assert_eq!(pool.borrow().pooled_count(), 1, "list returned on last removal");

        // The returned list is handed out again.
        map.add(3, p(2, 2)).unwrap();
        assert_eq!(pool.borrow().pooled_count(), 0);
    }

    #[test]
    fn remove_at_returns_all_items_and_emits_per_item() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        for i in [1, 2, 3] {
            map.add(i, p(0, 0)).unwrap();
        }
        let removed_events = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&removed_events);
        map.on_removed()
            .subscribe(Box::new(move |e: &ItemRemoved<u32>| {
                r.borrow_mut().push(e.item);
            }));

        let removed = map.remove_at(p(0, 0));
        assert_eq!(removed.as_slice(), &[1, 2, 3]);
        assert_eq!(*removed_events.borrow(), vec![1, 2, 3]);
        assert!(map.is_empty());
    }

    #[test]
    fn move_all_moves_everything_and_counts() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        map.add(1, p(0, 0)).unwrap();
        map.add(2, p(0, 0)).unwrap();
        map.add(3, p(1, 1)).unwrap();

        assert_eq!(map.move_all(p(0, 0), p(1, 1)), Ok(2));
        assert_eq!(map.items_at(p(1, 1)), &[3, 1, 2]);
        assert_eq!(
            map.move_all(p(0, 0), p(1, 1)),
            Err(SpatialError::NoItemsAtPosition { pos: p(0, 0) })
        );
    }

    #[test]
    fn move_all_to_same_position_is_a_counted_no_op() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        map.add(1, p(0, 0)).unwrap();
        map.add(2, p(0, 0)).unwrap();

        let moves = Rc::new(RefCell::new(0));
        let m = Rc::clone(&moves);
        map.on_moved()
            .subscribe(Box::new(move |_| *m.borrow_mut() += 1));

        assert_eq!(map.move_all(p(0, 0), p(0, 0)), Ok(2));
        assert_eq!(*moves.borrow(), 0);
    }

    #[test]
    fn move_valid_returns_moved_items() {
        let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
        map.add(1, p(0, 0)).unwrap();
        map.add(2, p(0, 0)).unwrap();

        assert_eq!(map.move_valid(p(0, 0), p(3, 3)), vec![1, 2]);
        assert!(map.move_valid(p(0, 0), p(3, 3)).is_empty());
        assert_eq!(map.items_at(p(3, 3)), &[1, 2]);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        proptest! {
            #[test]
            fn count_matches_forward_entries_under_churn(
                ops in proptest::collection::vec(
                    (0u32..12, 0i32..4, 0i32..4, any::<bool>()),
                    1..80,
                ),
            ) {
                let mut map: MultiSpatialMap<u32> = MultiSpatialMap::new();
                let mut model: HashMap<u32, Point> = HashMap::new();

                for (item, x, y, remove) in ops {
                    let pos = Point::new(x, y);
                    if remove {
                        prop_assert_eq!(
                            map.remove(&item).is_ok(),
                            model.remove(&item).is_some()
                        );
                    } else if model.contains_key(&item) {
                        map.move_item(&item, pos).unwrap();
                        model.insert(item, pos);
                    } else {
                        map.add(item, pos).unwrap();
                        model.insert(item, pos);
                    }

                    prop_assert_eq!(map.len(), model.len());
                    for (&i, &p) in &model {
                        prop_assert_eq!(map.position_of(&i), Some(p));
                        prop_assert!(map.items_at(p).contains(&i));
                    }
                }
            }
        }
    }
}
