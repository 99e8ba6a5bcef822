//! The [`LayeredSpatialMap`]: independent per-layer sub-maps behind one
//! unified surface.

use crate::error::SpatialError;
use crate::events::{ItemAdded, ItemMoved, ItemRemoved};
use crate::map::SpatialMap;
use crate::mask::{DescendingLayerIter, LayerMask, LayerMasker};
use crate::multi::MultiSpatialMap;
use crate::pool::{default_shared, SharedListPool};
use smallvec::SmallVec;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::slice;
use strata_core::{EventRegistry, HasLayer, Point};

/// One layer's backing map, fixed at construction.
pub enum LayerStore<T, S = RandomState> {
    /// At most one item per position on this layer.
    Single(SpatialMap<T, S>),
    /// Many items per position on this layer.
    Multi(MultiSpatialMap<T, S>),
}

impl<T: Clone + Eq + Hash + 'static, S: BuildHasher> LayerStore<T, S> {
    /// Whether this layer permits multiple items per position.
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// The items at `pos` on this layer, allocation-free.
    pub fn items_at(&self, pos: Point) -> &[T] {
        match self {
            Self::Single(m) => m.items_at(pos),
            Self::Multi(m) => m.items_at(pos),
        }
    }

    /// The recorded position of `item`, if present on this layer.
    pub fn position_of(&self, item: &T) -> Option<Point> {
        match self {
            Self::Single(m) => m.position_of(item),
            Self::Multi(m) => m.position_of(item),
        }
    }

    /// Whether `item` is present on this layer.
    pub fn contains_item(&self, item: &T) -> bool {
        match self {
            Self::Single(m) => m.contains_item(item),
            Self::Multi(m) => m.contains_item(item),
        }
    }

    /// Whether any item occupies `pos` on this layer.
    pub fn contains_position(&self, pos: Point) -> bool {
        match self {
            Self::Single(m) => m.contains_position(pos),
            Self::Multi(m) => m.contains_position(pos),
        }
    }

    /// Number of items on this layer.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(m) => m.len(),
            Self::Multi(m) => m.len(),
        }
    }

    /// Whether this layer holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(item, position)` pairs on this layer.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&T, Point)> + '_> {
        match self {
            Self::Single(m) => Box::new(m.iter()),
            Self::Multi(m) => Box::new(m.iter()),
        }
    }

    fn add(&mut self, item: T, pos: Point) -> Result<(), SpatialError> {
        match self {
            Self::Single(m) => m.add(item, pos),
            Self::Multi(m) => m.add(item, pos),
        }
    }

    fn move_item(&mut self, item: &T, target: Point) -> Result<(), SpatialError> {
        match self {
            Self::Single(m) => m.move_item(item, target),
            Self::Multi(m) => m.move_item(item, target),
        }
    }

    fn remove(&mut self, item: &T) -> Result<Point, SpatialError> {
        match self {
            Self::Single(m) => m.remove(item),
            Self::Multi(m) => m.remove(item),
        }
    }

    fn remove_at(&mut self, pos: Point) -> SmallVec<[T; 2]> {
        match self {
            Self::Single(m) => m.remove_at(pos).into_iter().collect(),
            Self::Multi(m) => m.remove_at(pos),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Single(m) => m.clear(),
            Self::Multi(m) => m.clear(),
        }
    }
}

/// Composes a fixed set of layers — each backed by a single- or
/// multi-item sub-map — under one `add`/`move`/`remove` surface keyed by
/// each item's own [`layer`](HasLayer::layer) number.
///
/// Layers are the contiguous range
/// `starting_layer..starting_layer + num_layers`; operations on items
/// whose layer falls outside it fail with
/// [`SpatialError::LayerOutOfRange`]. Which layers permit multiple items
/// per position is chosen at construction via a [`LayerMask`].
///
/// Masks are absolute: bit `L` always means layer `L`, so caller-built
/// masks need no shifting by `starting_layer`.
///
/// # Ordering contract
///
/// Mask-qualified queries ([`items_at_masked`](Self::items_at_masked))
/// visit layers in **descending** order — callers may interpret the first
/// item returned as "topmost". This is a documented contract, not an
/// implementation accident.
///
/// # Examples
///
/// ```
/// use strata_core::{HasLayer, Point};
/// use strata_spatial::{LayerMask, LayeredSpatialMap};
///
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// struct Entity { id: u64, layer: u32 }
/// impl HasLayer for Entity {
///     fn layer(&self) -> u32 { self.layer }
/// }
///
/// // Layers 0..3; layer 0 (items) permits stacking.
/// let mut map = LayeredSpatialMap::new(3, 0, LayerMask(0b001)).unwrap();
/// let p = Point::new(1, 1);
/// map.add(Entity { id: 1, layer: 0 }, p).unwrap();
/// map.add(Entity { id: 2, layer: 2 }, p).unwrap();
///
/// // Descending: the layer-2 item comes first.
/// let layers: Vec<u32> = map.items_at(p).map(|e| e.layer).collect();
/// assert_eq!(layers, vec![2, 0]);
/// ```
pub struct LayeredSpatialMap<T, S = RandomState> {
    layers: Vec<LayerStore<T, S>>,
    starting_layer: u32,
    masker: LayerMasker,
    /// Mask of the layers this map actually owns (excludes bits below
    /// `starting_layer`).
    valid: LayerMask,
    added: EventRegistry<ItemAdded<T>>,
    moved: EventRegistry<ItemMoved<T>>,
    removed: EventRegistry<ItemRemoved<T>>,
}

impl<T: Clone + Eq + Hash + HasLayer + 'static> LayeredSpatialMap<T, RandomState> {
    /// Create a map of `num_layers` layers beginning at `starting_layer`.
    ///
    /// Layers whose bit is set in `multi_layers` get a multi-item
    /// sub-map (each with its own default list pool); all others are
    /// single-item. Fails with [`SpatialError::InvalidLayerCount`] if
    /// `num_layers` is zero or `starting_layer + num_layers` exceeds 32.
    pub fn new(
        num_layers: u32,
        starting_layer: u32,
        multi_layers: LayerMask,
    ) -> Result<Self, SpatialError> {
        Self::with_capacity_and_hasher_and_pools(
            num_layers,
            starting_layer,
            multi_layers,
            0,
            RandomState::new(),
            |_| default_shared(),
        )
    }
}

impl<T: Clone + Eq + Hash + HasLayer + 'static, S: BuildHasher + Clone> LayeredSpatialMap<T, S> {
    /// Fully parameterized constructor.
    ///
    /// `pool_factory` is invoked once per multi layer with the absolute
    /// layer number, allowing per-layer pool tuning or deliberate pool
    /// sharing across layers.
    pub fn with_capacity_and_hasher_and_pools(
        num_layers: u32,
        starting_layer: u32,
        multi_layers: LayerMask,
        capacity: usize,
        hasher: S,
        mut pool_factory: impl FnMut(u32) -> SharedListPool<T>,
    ) -> Result<Self, SpatialError> {
        if num_layers == 0 || starting_layer.saturating_add(num_layers) > 32 {
            return Err(SpatialError::InvalidLayerCount { count: num_layers });
        }
        // The masker spans the absolute bit range so caller masks need no
        // shifting; bits below starting_layer are excluded via `valid`.
        let masker = LayerMasker::new(starting_layer + num_layers)?;
        let valid = masker.mask_all_above(starting_layer);

        let mut layers = Vec::with_capacity(num_layers as usize);
        for layer in starting_layer..starting_layer + num_layers {
            let store = if masker.has_layer(multi_layers, layer) {
                LayerStore::Multi(MultiSpatialMap::with_capacity_and_hasher_and_pool(
                    capacity,
                    hasher.clone(),
                    pool_factory(layer),
                ))
            } else {
                LayerStore::Single(SpatialMap::with_capacity_and_hasher(
                    capacity,
                    hasher.clone(),
                ))
            };
            layers.push(store);
        }

        Ok(Self {
            layers,
            starting_layer,
            masker,
            valid,
            added: EventRegistry::new(),
            moved: EventRegistry::new(),
            removed: EventRegistry::new(),
        })
    }
}

impl<T: Clone + Eq + Hash + HasLayer + 'static, S: BuildHasher> LayeredSpatialMap<T, S> {
    /// Number of layers.
    pub fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    /// First valid layer number.
    pub fn starting_layer(&self) -> u32 {
        self.starting_layer
    }

    /// The masker governing this map's layer range.
    pub fn masker(&self) -> &LayerMasker {
        &self.masker
    }

    /// Mask of every layer this map owns.
    pub fn all_layers(&self) -> LayerMask {
        self.valid
    }

    /// The single-layer mask selecting `item`'s own layer.
    ///
    /// Returns [`LayerMask::EMPTY`] for items on layers outside this
    /// map's range, so the result feeds straight into the masked query
    /// methods without range-checking first.
    pub fn layer_mask_for(&self, item: &T) -> LayerMask {
        self.masker.mask([item.layer()]) & self.valid
    }

    /// The sub-map backing `layer`, if the layer is in range.
    pub fn layer(&self, layer: u32) -> Option<&LayerStore<T, S>> {
        self.layer_index(layer).ok().map(|i| &self.layers[i])
    }

    /// Add `item` at `pos` on the item's own layer.
    ///
    /// Fails with [`SpatialError::LayerOutOfRange`] for a foreign layer,
    /// or with the target sub-map's error (occupancy on a single-item
    /// layer, duplicate item).
    pub fn add(&mut self, item: T, pos: Point) -> Result<(), SpatialError> {
        let idx = self.layer_index(item.layer())?;
        self.layers[idx].add(item.clone(), pos)?;
        self.added.emit(&ItemAdded { item, pos });
        Ok(())
    }

    /// Move `item` to `target` on its own layer.
    ///
    /// Single-item layers fail with [`SpatialError::PositionOccupied`]
    /// when blocked. Zero-distance moves succeed without emitting.
    pub fn move_item(&mut self, item: &T, target: Point) -> Result<(), SpatialError> {
        let idx = self.layer_index(item.layer())?;
        let store = &mut self.layers[idx];
        let old = store.position_of(item).ok_or(SpatialError::ItemNotFound)?;
        store.move_item(item, target)?;
        if old != target {
            self.moved.emit(&ItemMoved {
                item: item.clone(),
                old,
                new: target,
            });
        }
        Ok(())
    }

    /// Remove `item` from its layer, returning the position it occupied.
    pub fn remove(&mut self, item: &T) -> Result<Point, SpatialError> {
        let idx = self.layer_index(item.layer())?;
        let pos = self.layers[idx].remove(item)?;
        self.removed.emit(&ItemRemoved {
            item: item.clone(),
            pos,
        });
        Ok(pos)
    }

    /// Remove every item at `pos` on every layer, topmost layer first.
    pub fn remove_at(&mut self, pos: Point) -> SmallVec<[T; 2]> {
        self.remove_at_masked(pos, self.valid)
    }

    /// Remove every item at `pos` on the masked layers, topmost first.
    ///
    /// Emits a removed event per item.
    pub fn remove_at_masked(&mut self, pos: Point, mask: LayerMask) -> SmallVec<[T; 2]> {
        let mut out = SmallVec::new();
        for layer in self.masked_layers(mask) {
            let idx = (layer - self.starting_layer) as usize;
            for item in self.layers[idx].remove_at(pos) {
                self.removed.emit(&ItemRemoved {
                    item: item.clone(),
                    pos,
                });
                out.push(item);
            }
        }
        out
    }

    /// Remove every item on every layer. No removed events are emitted.
    pub fn clear(&mut self) {
        for store in &mut self.layers {
            store.clear();
        }
    }

    /// The items at `pos` across all layers, topmost layer first.
    pub fn items_at(&self, pos: Point) -> LayeredItemsIter<'_, T, S> {
        self.items_at_masked(pos, self.valid)
    }

    /// The items at `pos` on the masked layers, topmost layer first.
    ///
    /// Allocation-free: the returned iterator walks the mask and chains
    /// each layer's item slice.
    pub fn items_at_masked(&self, pos: Point, mask: LayerMask) -> LayeredItemsIter<'_, T, S> {
        LayeredItemsIter {
            layers: &self.layers,
            starting_layer: self.starting_layer,
            pos,
            layer_iter: self.masked_layers(mask),
            current: Default::default(),
        }
    }

    /// The topmost item at `pos` under `mask`, if any.
    pub fn item_at_masked(&self, pos: Point, mask: LayerMask) -> Option<&T> {
        self.items_at_masked(pos, mask).next()
    }

    /// The topmost item at `pos` across all layers, if any.
    pub fn item_at(&self, pos: Point) -> Option<&T> {
        self.item_at_masked(pos, self.valid)
    }

    /// The recorded position of `item`, if present on its layer.
    pub fn position_of(&self, item: &T) -> Option<Point> {
        let idx = self.layer_index(item.layer()).ok()?;
        self.layers[idx].position_of(item)
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &T) -> bool {
        self.position_of(item).is_some()
    }

    /// Whether any item occupies `pos` on any layer.
    pub fn contains_position(&self, pos: Point) -> bool {
        self.contains_position_masked(pos, self.valid)
    }

    /// Whether any item occupies `pos` on a masked layer.
    pub fn contains_position_masked(&self, pos: Point, mask: LayerMask) -> bool {
        self.masked_layers(mask).any(|layer| {
            self.layers[(layer - self.starting_layer) as usize].contains_position(pos)
        })
    }

    /// Whether every item at `from` on the masked layers could move to
    /// `to` without displacing anything.
    ///
    /// Only single-item layers can block; a multi layer absorbs any
    /// number of arrivals.
    pub fn can_move_all(&self, from: Point, to: Point, mask: LayerMask) -> bool {
        if from == to {
            return true;
        }
        self.masked_layers(mask).all(|layer| {
            let store = &self.layers[(layer - self.starting_layer) as usize];
            match store {
                LayerStore::Single(m) => {
                    !m.contains_position(from) || !m.contains_position(to)
                }
                LayerStore::Multi(_) => true,
            }
        })
    }

    /// Move every item at `from` on the masked layers to `to`, as one
    /// atomic batch spanning the underlying sub-maps.
    ///
    /// Feasibility is checked across *all* affected sub-maps before any
    /// of them is mutated, so a failure leaves every item at `from`.
    /// Fails with [`SpatialError::PositionOccupied`] if any single-item
    /// layer is blocked, or [`SpatialError::NoItemsAtPosition`] if the
    /// masked layers hold nothing at `from`. Returns the number of items
    /// moved.
    pub fn move_all(&mut self, from: Point, to: Point, mask: LayerMask) -> Result<usize, SpatialError> {
        if !self.can_move_all(from, to, mask) {
            return Err(SpatialError::PositionOccupied { pos: to });
        }
        let count: usize = self
            .masked_layers(mask)
            .map(|layer| {
                self.layers[(layer - self.starting_layer) as usize]
                    .items_at(from)
                    .len()
            })
            .sum();
        if count == 0 {
            return Err(SpatialError::NoItemsAtPosition { pos: from });
        }
        if from == to {
            return Ok(count);
        }
        let moved = self.drain_masked(from, to, mask);
        debug_assert_eq!(moved.len(), count);
        Ok(count)
    }

    /// Move whichever items at `from` on the masked layers can legally
    /// move to `to`, returning the moved subset (possibly empty).
    ///
    /// Best-effort by contract: items on blocked single-item layers stay
    /// behind and no error is raised.
    pub fn move_valid(&mut self, from: Point, to: Point, mask: LayerMask) -> Vec<T> {
        if from == to {
            return Vec::new();
        }
        let mut moved = Vec::new();
        for layer in self.masked_layers(mask) {
            let idx = (layer - self.starting_layer) as usize;
            match &mut self.layers[idx] {
                LayerStore::Single(m) => {
                    if m.contains_position(to) {
                        continue;
                    }
                    if let Some(item) = m.item_at(from).cloned() {
                        m.move_item(&item, to).expect("feasibility just checked");
                        moved.push(item);
                    }
                }
                LayerStore::Multi(m) => {
                    moved.extend(m.move_valid(from, to));
                }
            }
        }
        for item in &moved {
            self.moved.emit(&ItemMoved {
                item: item.clone(),
                old: from,
                new: to,
            });
        }
        moved
    }

    /// Total number of items across all layers.
    pub fn len(&self) -> usize {
        self.layers.iter().map(LayerStore::len).sum()
    }

    /// Whether no layer holds any item.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(LayerStore::is_empty)
    }

    /// Iterate over `(item, position)` pairs across all layers,
    /// bottom layer first.
    pub fn iter(&self) -> impl Iterator<Item = (&T, Point)> {
        self.layers.iter().flat_map(|store| store.iter())
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

    /// Descending iterator over the masked layers this map owns.
    fn masked_layers(&self, mask: LayerMask) -> DescendingLayerIter {
        self.masker.layers(mask & self.valid)
    }

    fn layer_index(&self, layer: u32) -> Result<usize, SpatialError> {
        let num_layers = self.layers.len() as u32;
        if layer < self.starting_layer || layer >= self.starting_layer + num_layers {
            return Err(SpatialError::LayerOutOfRange {
                layer,
                starting_layer: self.starting_layer,
                num_layers,
            });
        }
        Ok((layer - self.starting_layer) as usize)
    }

    /// Move everything at `from` on the masked layers to `to`, emitting
    /// moved events. Caller guarantees feasibility and `from != to`.
    fn drain_masked(&mut self, from: Point, to: Point, mask: LayerMask) -> Vec<T> {
        let mut moved = Vec::new();
        for layer in self.masked_layers(mask) {
            let idx = (layer - self.starting_layer) as usize;
            match &mut self.layers[idx] {
                LayerStore::Single(m) => {
                    if let Some(item) = m.item_at(from).cloned() {
                        m.move_item(&item, to).expect("feasibility pre-checked");
                        moved.push(item);
                    }
                }
                LayerStore::Multi(m) => {
                    moved.extend(m.move_valid(from, to));
                }
            }
        }
        for item in &moved {
            self.moved.emit(&ItemMoved {
                item: item.clone(),
                old: from,
                new: to,
            });
        }
        moved
    }
}

/// Iterator over the items at one position across masked layers, topmost
/// layer first.
///
/// Allocation-free: holds a [`DescendingLayerIter`] plus the current
/// layer's item slice. Produced by
/// [`LayeredSpatialMap::items_at_masked`].
pub struct LayeredItemsIter<'a, T, S = RandomState> {
    layers: &'a [LayerStore<T, S>],
    starting_layer: u32,
    pos: Point,
    layer_iter: DescendingLayerIter,
    current: slice::Iter<'a, T>,
}

impl<'a, T: Clone + Eq + Hash + 'static, S: BuildHasher> Iterator for LayeredItemsIter<'a, T, S> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(item);
            }
            let layer = self.layer_iter.next()?;
            let idx = (layer - self.starting_layer) as usize;
            self.current = self.layers[idx].items_at(self.pos).iter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct Ent {
        id: u32,
        layer: u32,
    }

    impl HasLayer for Ent {
        fn layer(&self) -> u32 {
            self.layer
        }
    }

    fn ent(id: u32, layer: u32) -> Ent {
        Ent { id, layer }
    }

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    /// Six layers 0..6, layers 1 and 3 multi.
    fn make_map() -> LayeredSpatialMap<Ent> {
        LayeredSpatialMap::new(6, 0, LayerMask(0b001010)).unwrap()
    }

    #[test]
    fn items_route_to_their_layer() {
        let mut map = make_map();
        map.add(ent(1, 0), p(0, 0)).unwrap();
        map.add(ent(2, 3), p(0, 0)).unwrap();

        assert!(map.layer(0).unwrap().contains_item(&ent(1, 0)));
        assert!(map.layer(3).unwrap().contains_item(&ent(2, 3)));
        assert!(!map.layer(3).unwrap().contains_item(&ent(1, 3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn out_of_range_layer_rejected_everywhere() {
        let mut map: LayeredSpatialMap<Ent> =
            LayeredSpatialMap::new(3, 2, LayerMask::EMPTY).unwrap();
        let err = Err(SpatialError::LayerOutOfRange {
            layer: 1,
            starting_layer: 2,
            num_layers: 3,
        });
        assert_eq!(map.add(ent(1, 1), p(0, 0)), err);
        assert_eq!(map.move_item(&ent(1, 1), p(0, 0)), err);
        assert_eq!(
            map.remove(&ent(1, 1)),
            Err::<Point, _>(SpatialError::LayerOutOfRange {
                layer: 1,
                starting_layer: 2,
                num_layers: 3,
            })
        );
        assert!(map.add(ent(1, 5), p(0, 0)).is_err());
        assert!(map.add(ent(1, 4), p(0, 0)).is_ok());
    }

    #[test]
    fn construction_rejects_impossible_ranges() {
        assert!(LayeredSpatialMap::<Ent>::new(0, 0, LayerMask::EMPTY).is_err());
        assert!(LayeredSpatialMap::<Ent>::new(33, 0, LayerMask::EMPTY).is_err());
        assert!(LayeredSpatialMap::<Ent>::new(4, 30, LayerMask::EMPTY).is_err());
        assert!(LayeredSpatialMap::<Ent>::new(2, 30, LayerMask::EMPTY).is_ok());
    }

    #[test]
    fn single_layer_occupancy_propagates() {
        let mut map = make_map();
        map.add(ent(1, 0), p(0, 0)).unwrap();
        assert_eq!(
            map.add(ent(2, 0), p(0, 0)),
            Err(SpatialError::PositionOccupied { pos: p(0, 0) })
        );
        // Multi layer absorbs stacking fine.
        map.add(ent(3, 1), p(0, 0)).unwrap();
        map.add(ent(4, 1), p(0, 0)).unwrap();
    }

    #[test]
    fn masked_query_yields_descending_layers_regardless_of_insertion() {
        let mut map = make_map();
        // Insert in scrambled layer order at the same position.
        for (id, layer) in [(1, 2), (2, 5), (3, 1), (4, 4)] {
            map.add(ent(id, layer), p(3, 3)).unwrap();
        }
        let mask = map.masker().mask([1, 2, 4, 5]);
        let layers: Vec<u32> = map
            .items_at_masked(p(3, 3), mask)
            .map(|e| e.layer)
            .collect();
        assert_eq!(layers, vec![5, 4, 2, 1]);
    }

    #[test]
    fn masked_query_skips_unmasked_layers() {
        let mut map = make_map();
        map.add(ent(1, 0), p(0, 0)).unwrap();
        map.add(ent(2, 2), p(0, 0)).unwrap();
        map.add(ent(3, 5), p(0, 0)).unwrap();

        let mask = map.masker().mask([0, 5]);
        let ids: Vec<u32> = map.items_at_masked(p(0, 0), mask).map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(map.item_at_masked(p(0, 0), mask), Some(&ent(3, 5)));
    }

    #[test]
    fn layer_mask_for_selects_exactly_the_items_layer() {
        let mut map = make_map();
        map.add(ent(1, 2), p(0, 0)).unwrap();
        map.add(ent(2, 3), p(0, 0)).unwrap();

        let mask = map.layer_mask_for(&ent(1, 2));
        assert_eq!(mask, LayerMask(1 << 2));
        let ids: Vec<u32> = map.items_at_masked(p(0, 0), mask).map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);

        // Out-of-range layers map to the empty mask.
        assert_eq!(map.layer_mask_for(&ent(9, 9)), LayerMask::EMPTY);
        let elevated: LayeredSpatialMap<Ent> =
            LayeredSpatialMap::new(2, 4, LayerMask::EMPTY).unwrap();
        assert_eq!(elevated.layer_mask_for(&ent(1, 5)), LayerMask(1 << 5));
        assert_eq!(elevated.layer_mask_for(&ent(1, 1)), LayerMask::EMPTY);
    }

    #[test]
    fn empty_position_yields_nothing() {
        let map = make_map();
        assert_eq!(map.items_at(p(9, 9)).count(), 0);
        assert!(map.item_at_masked(p(9, 9), map.all_layers()).is_none());
    }

    #[test]
    fn move_all_is_atomic_across_layers() {
        // Items on layers 1 (multi), 2, 3 (multi) all at p; q blocked on
        // layer 2 only.
        let mut map = make_map();
        map.add(ent(1, 1), p(0, 0)).unwrap();
        map.add(ent(2, 2), p(0, 0)).unwrap();
        map.add(ent(3, 3), p(0, 0)).unwrap();
        map.add(ent(9, 2), p(5, 5)).unwrap();

        let mask = map.all_layers();
        assert_eq!(
            map.move_all(p(0, 0), p(5, 5), mask),
            Err(SpatialError::PositionOccupied { pos: p(5, 5) })
        );
        // Nothing moved.
        for e in [ent(1, 1), ent(2, 2), ent(3, 3)] {
            assert_eq!(map.position_of(&e), Some(p(0, 0)));
        }

        // Unblock layer 2 and retry.
        map.remove(&ent(9, 2)).unwrap();
        assert_eq!(map.move_all(p(0, 0), p(5, 5), mask), Ok(3));
        for e in [ent(1, 1), ent(2, 2), ent(3, 3)] {
            assert_eq!(map.position_of(&e), Some(p(5, 5)));
        }
    }

    #[test]
    fn move_all_fails_on_empty_source() {
        let mut map = make_map();
        assert_eq!(
            map.move_all(p(0, 0), p(1, 1), map.all_layers()),
            Err(SpatialError::NoItemsAtPosition { pos: p(0, 0) })
        );
    }

    #[test]
    fn move_valid_moves_the_unblocked_subset() {
        let mut map = make_map();
        map.add(ent(1, 1), p(0, 0)).unwrap();
        map.add(ent(2, 2), p(0, 0)).unwrap();
        map.add(ent(3, 3), p(0, 0)).unwrap();
        map.add(ent(9, 2), p(5, 5)).unwrap();

        let moved = map.move_valid(p(0, 0), p(5, 5), map.all_layers());
        let mut moved_ids: Vec<u32> = moved.iter().map(|e| e.id).collect();
        moved_ids.sort_unstable();
        assert_eq!(moved_ids, vec![1, 3]);

        assert_eq!(map.position_of(&ent(2, 2)), Some(p(0, 0)));
        assert_eq!(map.position_of(&ent(1, 1)), Some(p(5, 5)));
        assert_eq!(map.position_of(&ent(3, 3)), Some(p(5, 5)));
    }

    #[test]
    fn move_all_respects_the_mask() {
        let mut map = make_map();
        map.add(ent(1, 1), p(0, 0)).unwrap();
        map.add(ent(2, 4), p(0, 0)).unwrap();

        let mask = map.masker().mask([1]);
        assert_eq!(map.move_all(p(0, 0), p(2, 2), mask), Ok(1));
        assert_eq!(map.position_of(&ent(1, 1)), Some(p(2, 2)));
        assert_eq!(map.position_of(&ent(2, 4)), Some(p(0, 0)));
    }

    #[test]
    fn remove_at_masked_removes_topmost_first() {
        let mut map = make_map();
        map.add(ent(1, 0), p(0, 0)).unwrap();
        map.add(ent(2, 2), p(0, 0)).unwrap();
        map.add(ent(3, 5), p(0, 0)).unwrap();

        let removed = map.remove_at_masked(p(0, 0), map.masker().mask([0, 5]));
        let ids: Vec<u32> = removed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(map.len(), 1);
        assert!(map.contains_item(&ent(2, 2)));
    }

    #[test]
    fn layered_events_carry_old_and_new_positions() {
        let mut map = make_map();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        map.on_moved().subscribe(Box::new(move |e: &ItemMoved<Ent>| {
            l.borrow_mut().push((e.item.id, e.old, e.new));
        }));

        map.add(ent(1, 2), p(0, 0)).unwrap();
        map.move_item(&ent(1, 2), p(4, 4)).unwrap();
        map.move_item(&ent(1, 2), p(4, 4)).unwrap(); // zero-distance

        assert_eq!(*log.borrow(), vec![(1, p(0, 0), p(4, 4))]);
    }

    #[test]
    fn masks_are_absolute_with_nonzero_starting_layer() {
        let mut map: LayeredSpatialMap<Ent> =
            LayeredSpatialMap::new(3, 4, LayerMask::EMPTY).unwrap();
        map.add(ent(1, 4), p(0, 0)).unwrap();
        map.add(ent(2, 6), p(0, 0)).unwrap();

        // Bit 6 means layer 6, no shifting by the caller.
        let mask = map.masker().mask([6]);
        let ids: Vec<u32> = map.items_at_masked(p(0, 0), mask).map(|e| e.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(map.contains_position_masked(p(0, 0), mask));
        assert!(!map.contains_position_masked(p(1, 0), map.all_layers()));
    }
}
