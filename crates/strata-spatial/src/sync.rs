//! Auto-sync wrappers: keep an item's own position field and the map
//! index mutually consistent.
//!
//! Items are shared as `Rc<T>` and must expose a
//! [`PositionCell`](strata_core::PositionCell) through the
//! [`Positioned`] capability. Client code may either call the wrapper's
//! move methods (which write the cell back untracked) or write the cell
//! directly (which re-indexes the wrapped map through a registered
//! hook); the two entry points never desynchronize.
//!
//! Single-item and layered wrappers register the *changing* (pre-
//! mutation) hook so the index can still observe the old position;
//! the multi wrapper registers the *changed* (post-mutation) hook and
//! rejects its public move methods entirely — with many items per
//! position, allowing both entry points would create ambiguous update
//! ordering (see [`AutoSyncMultiSpatialMap::move_item`]).
//!
//! A hook that re-enters the same cell's setter, or an event handler
//! that calls back into the wrapper mid-notification, is caller error.

use crate::error::SpatialError;
use crate::events::{ItemAdded, ItemMoved, ItemRemoved};
use crate::layered::LayeredSpatialMap;
use crate::map::SpatialMap;
use crate::mask::{LayerMask, LayerMasker};
use crate::multi::MultiSpatialMap;
use crate::pool::default_shared;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::rc::{Rc, Weak};
use strata_core::{ById, HasId, HasLayer, HookId, Point, Positioned, SubscriberHandle};

/// Key type stored in the wrapped maps.
type Keyed<T> = ById<Rc<T>>;

/// An auto-synced single-item-per-position map.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use strata_core::{HasId, Point, PositionCell, Positioned};
/// use strata_spatial::AutoSyncSpatialMap;
///
/// struct Mob { id: u64, cell: PositionCell }
/// impl HasId for Mob {
///     fn id(&self) -> u64 { self.id }
/// }
/// impl Positioned for Mob {
///     fn position_cell(&self) -> &PositionCell { &self.cell }
/// }
///
/// let mut map: AutoSyncSpatialMap<Mob> = AutoSyncSpatialMap::new();
/// let mob = Rc::new(Mob { id: 1, cell: PositionCell::new(Point::new(1, 2)) });
/// map.add(Rc::clone(&mob)).unwrap();
///
/// // Writing the field re-indexes the map.
/// mob.cell.set(Point::new(3, 4));
/// assert_eq!(map.position_of(&mob), Some(Point::new(3, 4)));
///
/// // Moving through the map writes the field.
/// map.move_item(&mob, Point::new(5, 6)).unwrap();
/// assert_eq!(mob.position(), Point::new(5, 6));
/// ```
pub struct AutoSyncSpatialMap<T: HasId + Positioned + 'static, S: BuildHasher + 'static = RandomState>
{
    inner: Rc<RefCell<SpatialMap<Keyed<T>, S>>>,
    hooks: IndexMap<u64, HookId>,
}

impl<T: HasId + Positioned + 'static> AutoSyncSpatialMap<T, RandomState> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SpatialMap::new())),
            hooks: IndexMap::new(),
        }
    }
}

impl<T: HasId + Positioned + 'static> Default for AutoSyncSpatialMap<T, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + Clone + 'static> AutoSyncSpatialMap<T, S> {
    /// Create an empty map with a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SpatialMap::with_hasher(hasher))),
            hooks: IndexMap::new(),
        }
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + 'static> AutoSyncSpatialMap<T, S> {
    /// Add `item` at its current position.
    ///
    /// On success the wrapper subscribes to the item's *changing* hook;
    /// from then on direct writes to the position cell re-index the map.
    pub fn add(&mut self, item: Rc<T>) -> Result<(), SpatialError> {
        let pos = item.position();
        self.inner.borrow_mut().add(ById(Rc::clone(&item)), pos)?;

        let weak_inner = Rc::downgrade(&self.inner);
        let weak_item = Rc::downgrade(&item);
        let hook = item.position_cell().on_changing(Rc::new(move |chg| {
            sync_single_move(&weak_inner, &weak_item, chg.new);
        }));
        self.hooks.insert(item.id(), hook);
        Ok(())
    }

    /// Move `item` to `target`, writing the position cell back.
    ///
    /// The cell write is untracked, so the hook does not fire again.
    pub fn move_item(&mut self, item: &Rc<T>, target: Point) -> Result<(), SpatialError> {
        self.inner
            .borrow_mut()
            .move_item(&ById(Rc::clone(item)), target)?;
        item.position_cell().set_untracked(target);
        Ok(())
    }

    /// Remove `item`, unsubscribing its hook.
    pub fn remove(&mut self, item: &Rc<T>) -> Result<Point, SpatialError> {
        let pos = self.inner.borrow_mut().remove(&ById(Rc::clone(item)))?;
        self.detach(item);
        Ok(pos)
    }

    /// Remove whatever occupies `pos`, unsubscribing hooks.
    pub fn remove_at(&mut self, pos: Point) -> SmallVec<[Rc<T>; 1]> {
        let removed = self.inner.borrow_mut().remove_at(pos);
        removed
            .into_iter()
            .map(|k| {
                self.detach(&k.0);
                k.0
            })
            .collect()
    }

    /// Remove every item, unsubscribing all hooks.
    pub fn clear(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .items()
            .map(|k| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
        self.inner.borrow_mut().clear();
    }

    /// The item at `pos`, if any.
    pub fn item_at(&self, pos: Point) -> Option<Rc<T>> {
        self.inner.borrow().item_at(pos).map(|k| Rc::clone(&k.0))
    }

    /// The recorded position of `item`, if present.
    pub fn position_of(&self, item: &Rc<T>) -> Option<Point> {
        self.inner.borrow().position_of(&ById(Rc::clone(item)))
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &Rc<T>) -> bool {
        self.inner.borrow().contains_item(&ById(Rc::clone(item)))
    }

    /// Whether any item occupies `pos`.
    pub fn contains_position(&self, pos: Point) -> bool {
        self.inner.borrow().contains_position(pos)
    }

    /// Number of items in the map.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether the map holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Snapshot of all `(item, position)` pairs.
    pub fn pairs(&self) -> Vec<(Rc<T>, Point)> {
        self.inner
            .borrow()
            .iter()
            .map(|(k, pos)| (Rc::clone(&k.0), pos))
            .collect()
    }

    /// Subscribe to item-added notifications.
    pub fn subscribe_added(
        &self,
        mut f: impl FnMut(&ItemAdded<Rc<T>>) + 'static,
    ) -> SubscriberHandle {
        self.inner
            .borrow_mut()
            .on_added()
            .subscribe(Box::new(move |e: &ItemAdded<Keyed<T>>| {
                f(&ItemAdded {
                    item: Rc::clone(&e.item.0),
                    pos: e.pos,
                });
            }))
    }

    /// Subscribe to item-moved notifications.
    ///
    /// Fires for moves through [`move_item`](Self::move_item) *and* for
    /// direct position-cell writes.
    pub fn subscribe_moved(
        &self,
        mut f: impl FnMut(&ItemMoved<Rc<T>>) + 'static,
    ) -> SubscriberHandle {
        self.inner
            .borrow_mut()
            .on_moved()
            .subscribe(Box::new(move |e: &ItemMoved<Keyed<T>>| {
                f(&ItemMoved {
                    item: Rc::clone(&e.item.0),
                    old: e.old,
                    new: e.new,
                });
            }))
    }

    /// Subscribe to item-removed notifications.
    pub fn subscribe_removed(
        &self,
        mut f: impl FnMut(&ItemRemoved<Rc<T>>) + 'static,
    ) -> SubscriberHandle {
        self.inner
            .borrow_mut()
            .on_removed()
            .subscribe(Box::new(move |e: &ItemRemoved<Keyed<T>>| {
                f(&ItemRemoved {
                    item: Rc::clone(&e.item.0),
                    pos: e.pos,
                });
            }))
    }

    fn detach(&mut self, item: &Rc<T>) {
        if let Some(hook) = self.hooks.swap_remove(&item.id()) {
            item.position_cell().remove_changing(hook);
        }
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + 'static> Drop for AutoSyncSpatialMap<T, S> {
    fn drop(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .items()
            .map(|k| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
    }
}

/// Re-key a single-item map after a direct position-cell write.
///
/// Runs from the *changing* hook, before the cell value updates. A
/// blocked move (target occupied) has no error channel back through the
/// field write, so it panics.
fn sync_single_move<T, S>(
    inner: &Weak<RefCell<SpatialMap<Keyed<T>, S>>>,
    item: &Weak<T>,
    target: Point,
) where
    T: HasId + Positioned + 'static,
    S: BuildHasher,
{
    let (Some(inner), Some(item)) = (inner.upgrade(), item.upgrade()) else {
        return; // map or item already gone; nothing to sync
    };
    if let Err(e) = inner.borrow_mut().move_item(&ById(item), target) {
        panic!("auto-sync position write failed: {e}");
    };
}

/// An auto-synced many-items-per-position map.
///
/// Because several items can share a position, a position signal alone
/// cannot identify the mover; the wrapper therefore drives re-indexing
/// from each item's *changed* hook (which carries the item reference via
/// capture) and rejects the public move methods — position-cell writes
/// are the only supported way to move items.
pub struct AutoSyncMultiSpatialMap<
    T: HasId + Positioned + 'static,
    S: BuildHasher + 'static = RandomState,
> {
    inner: Rc<RefCell<MultiSpatialMap<Keyed<T>, S>>>,
    hooks: IndexMap<u64, HookId>,
}

impl<T: HasId + Positioned + 'static> AutoSyncMultiSpatialMap<T, RandomState> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MultiSpatialMap::new())),
            hooks: IndexMap::new(),
        }
    }
}

impl<T: HasId + Positioned + 'static> Default for AutoSyncMultiSpatialMap<T, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + Clone + 'static>
    AutoSyncMultiSpatialMap<T, S>
{
    /// Create an empty map with a custom hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MultiSpatialMap::with_hasher(hasher))),
            hooks: IndexMap::new(),
        }
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + 'static> AutoSyncMultiSpatialMap<T, S> {
    /// Add `item` at its current position and subscribe its hook.
    pub fn add(&mut self, item: Rc<T>) -> Result<(), SpatialError> {
        let pos = item.position();
        self.inner.borrow_mut().add(ById(Rc::clone(&item)), pos)?;

        let weak_inner = Rc::downgrade(&self.inner);
        let weak_item = Rc::downgrade(&item);
        let hook = item.position_cell().on_changed(Rc::new(move |chg| {
            let (Some(inner), Some(item)) = (weak_inner.upgrade(), weak_item.upgrade()) else {
                return;
            };
            inner
                .borrow_mut()
                .move_item(&ById(item), chg.new)
                .expect("indexed item vanished from auto-sync multi map");
        }));
        self.hooks.insert(item.id(), hook);
        Ok(())
    }

    /// Unsupported: write the item's position cell instead.
    ///
    /// # Panics
    ///
    /// Always. Multi-maps re-index from the *changed* hook; also
    /// accepting map-driven moves would create ambiguous update
    /// ordering between the two entry points.
    pub fn move_item(&mut self, _item: &Rc<T>, _target: Point) -> Result<(), SpatialError> {
        panic!("AutoSyncMultiSpatialMap does not support move_item; write the item's position cell instead");
    }

    /// Unsupported: write each item's position cell instead.
    ///
    /// # Panics
    ///
    /// Always, for the same reason as [`move_item`](Self::move_item).
    pub fn move_all(&mut self, _from: Point, _to: Point) -> Result<usize, SpatialError> {
        panic!("AutoSyncMultiSpatialMap does not support move_all; write the items' position cells instead");
    }

    /// Remove `item`, unsubscribing its hook.
    pub fn remove(&mut self, item: &Rc<T>) -> Result<Point, SpatialError> {
        let pos = self.inner.borrow_mut().remove(&ById(Rc::clone(item)))?;
        self.detach(item);
        Ok(pos)
    }

    /// Remove every item at `pos`, unsubscribing hooks.
    pub fn remove_at(&mut self, pos: Point) -> SmallVec<[Rc<T>; 2]> {
        let removed = self.inner.borrow_mut().remove_at(pos);
        removed
            .into_iter()
            .map(|k| {
                self.detach(&k.0);
                k.0
            })
            .collect()
    }

    /// Remove every item, unsubscribing all hooks.
    pub fn clear(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .iter()
            .map(|(k, _)| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
        self.inner.borrow_mut().clear();
    }

    /// The items at `pos`, in insertion order.
    pub fn items_at(&self, pos: Point) -> Vec<Rc<T>> {
        self.inner
            .borrow()
            .items_at(pos)
            .iter()
            .map(|k| Rc::clone(&k.0))
            .collect()
    }

    /// The recorded position of `item`, if present.
    pub fn position_of(&self, item: &Rc<T>) -> Option<Point> {
        self.inner.borrow().position_of(&ById(Rc::clone(item)))
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &Rc<T>) -> bool {
        self.inner.borrow().contains_item(&ById(Rc::clone(item)))
    }

    /// Whether any item occupies `pos`.
    pub fn contains_position(&self, pos: Point) -> bool {
        self.inner.borrow().contains_position(pos)
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether the map holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    fn detach(&mut self, item: &Rc<T>) {
        if let Some(hook) = self.hooks.swap_remove(&item.id()) {
            item.position_cell().remove_changed(hook);
        }
    }
}

impl<T: HasId + Positioned + 'static, S: BuildHasher + 'static> Drop
    for AutoSyncMultiSpatialMap<T, S>
{
    fn drop(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .iter()
            .map(|(k, _)| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
    }
}

/// An auto-synced layered map.
///
/// Items need [`HasLayer`] in addition to the positionable capability.
/// Like the single-item wrapper it registers the *changing* hook;
/// mask-qualified batch moves write every moved item's cell back
/// untracked.
pub struct AutoSyncLayeredSpatialMap<
    T: HasId + HasLayer + Positioned + 'static,
    S: BuildHasher + 'static = RandomState,
> {
    inner: Rc<RefCell<LayeredSpatialMap<Keyed<T>, S>>>,
    hooks: IndexMap<u64, HookId>,
}

impl<T: HasId + HasLayer + Positioned + 'static> AutoSyncLayeredSpatialMap<T, RandomState> {
    /// Create a map of `num_layers` layers beginning at `starting_layer`,
    /// with multi-item sub-maps on the layers in `multi_layers`.
    pub fn new(
        num_layers: u32,
        starting_layer: u32,
        multi_layers: LayerMask,
    ) -> Result<Self, SpatialError> {
        Ok(Self {
            inner: Rc::new(RefCell::new(LayeredSpatialMap::new(
                num_layers,
                starting_layer,
                multi_layers,
            )?)),
            hooks: IndexMap::new(),
        })
    }
}

impl<T: HasId + HasLayer + Positioned + 'static, S: BuildHasher + Clone + 'static>
    AutoSyncLayeredSpatialMap<T, S>
{
    /// Create a map with a custom hasher shared by every layer's sub-map.
    ///
    /// Multi layers each get their own default list pool.
    pub fn with_hasher(
        num_layers: u32,
        starting_layer: u32,
        multi_layers: LayerMask,
        hasher: S,
    ) -> Result<Self, SpatialError> {
        Ok(Self {
            inner: Rc::new(RefCell::new(
                LayeredSpatialMap::with_capacity_and_hasher_and_pools(
                    num_layers,
                    starting_layer,
                    multi_layers,
                    0,
                    hasher,
                    |_| default_shared(),
                )?,
            )),
            hooks: IndexMap::new(),
        })
    }
}

impl<T: HasId + HasLayer + Positioned + 'static, S: BuildHasher + 'static>
    AutoSyncLayeredSpatialMap<T, S>
{
    /// Add `item` at its current position on its own layer.
    pub fn add(&mut self, item: Rc<T>) -> Result<(), SpatialError> {
        let pos = item.position();
        self.inner.borrow_mut().add(ById(Rc::clone(&item)), pos)?;

        let weak_inner = Rc::downgrade(&self.inner);
        let weak_item = Rc::downgrade(&item);
        let hook = item.position_cell().on_changing(Rc::new(move |chg| {
            let (Some(inner), Some(item)) = (weak_inner.upgrade(), weak_item.upgrade()) else {
                return;
            };
            if let Err(e) = inner.borrow_mut().move_item(&ById(item), chg.new) {
                panic!("auto-sync position write failed: {e}");
            };
        }));
        self.hooks.insert(item.id(), hook);
        Ok(())
    }

    /// Move `item` to `target`, writing the position cell back.
    pub fn move_item(&mut self, item: &Rc<T>, target: Point) -> Result<(), SpatialError> {
        self.inner
            .borrow_mut()
            .move_item(&ById(Rc::clone(item)), target)?;
        item.position_cell().set_untracked(target);
        Ok(())
    }

    /// Atomically move every item at `from` on the masked layers to
    /// `to`, writing each moved item's cell back.
    ///
    /// Same contract as
    /// [`LayeredSpatialMap::move_all`].
    pub fn move_all(
        &mut self,
        from: Point,
        to: Point,
        mask: LayerMask,
    ) -> Result<usize, SpatialError> {
        if from == to {
            // Nothing relocates; the inner map still validates occupancy.
            return self.inner.borrow_mut().move_all(from, to, mask);
        }
        let moved = {
            let mut inner = self.inner.borrow_mut();
            if !inner.can_move_all(from, to, mask) {
                return Err(SpatialError::PositionOccupied { pos: to });
            }
            let moved = inner.move_valid(from, to, mask);
            if moved.is_empty() {
                return Err(SpatialError::NoItemsAtPosition { pos: from });
            }
            moved
        };
        for k in &moved {
            k.0.position_cell().set_untracked(to);
        }
        Ok(moved.len())
    }

    /// Best-effort mask-qualified batch move; returns the moved items
    /// with their cells written back.
    pub fn move_valid(&mut self, from: Point, to: Point, mask: LayerMask) -> Vec<Rc<T>> {
        let moved = self.inner.borrow_mut().move_valid(from, to, mask);
        moved
            .into_iter()
            .map(|k| {
                k.0.position_cell().set_untracked(to);
                k.0
            })
            .collect()
    }

    /// Remove `item`, unsubscribing its hook.
    pub fn remove(&mut self, item: &Rc<T>) -> Result<Point, SpatialError> {
        let pos = self.inner.borrow_mut().remove(&ById(Rc::clone(item)))?;
        self.detach(item);
        Ok(pos)
    }

    /// Remove every item at `pos` on the masked layers, topmost first,
    /// unsubscribing hooks.
    pub fn remove_at_masked(&mut self, pos: Point, mask: LayerMask) -> SmallVec<[Rc<T>; 2]> {
        let removed = self.inner.borrow_mut().remove_at_masked(pos, mask);
        removed
            .into_iter()
            .map(|k| {
                self.detach(&k.0);
                k.0
            })
            .collect()
    }

    /// Remove every item on every layer, unsubscribing all hooks.
    pub fn clear(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .iter()
            .map(|(k, _)| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
        self.inner.borrow_mut().clear();
    }

    /// The items at `pos` on the masked layers, topmost layer first.
    pub fn items_at_masked(&self, pos: Point, mask: LayerMask) -> Vec<Rc<T>> {
        self.inner
            .borrow()
            .items_at_masked(pos, mask)
            .map(|k| Rc::clone(&k.0))
            .collect()
    }

    /// The topmost item at `pos` under `mask`, if any.
    pub fn item_at_masked(&self, pos: Point, mask: LayerMask) -> Option<Rc<T>> {
        self.inner
            .borrow()
            .item_at_masked(pos, mask)
            .map(|k| Rc::clone(&k.0))
    }

    /// The recorded position of `item`, if present.
    pub fn position_of(&self, item: &Rc<T>) -> Option<Point> {
        self.inner.borrow().position_of(&ById(Rc::clone(item)))
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &Rc<T>) -> bool {
        self.inner.borrow().contains_item(&ById(Rc::clone(item)))
    }

    /// Total number of items across all layers.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether no layer holds any item.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// A copy of the masker governing this map's layer range.
    pub fn masker(&self) -> LayerMasker {
        *self.inner.borrow().masker()
    }

    /// Mask of every layer this map owns.
    pub fn all_layers(&self) -> LayerMask {
        self.inner.borrow().all_layers()
    }

    fn detach(&mut self, item: &Rc<T>) {
        if let Some(hook) = self.hooks.swap_remove(&item.id()) {
            item.position_cell().remove_changing(hook);
        }
    }
}

impl<T: HasId + HasLayer + Positioned + 'static, S: BuildHasher + 'static> Drop
    for AutoSyncLayeredSpatialMap<T, S>
{
    fn drop(&mut self) {
        let items: Vec<Rc<T>> = self
            .inner
            .borrow()
            .iter()
            .map(|(k, _)| Rc::clone(&k.0))
            .collect();
        for item in &items {
            self.detach(item);
        }
    }
}
