//! The positionable capability: a mutable position with change hooks.

use crate::point::Point;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifies a registered position hook for later removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// Carried by position hooks: the value being replaced and its replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionChange {
    /// The position before the write.
    pub old: Point,
    /// The position after the write.
    pub new: Point,
}

type Hook = Rc<dyn Fn(&PositionChange)>;

/// A mutable position field with pre- and post-change notification hooks.
///
/// Items embed a `PositionCell` to participate in auto-sync spatial maps:
/// *changing* hooks fire before the stored value updates (the old value is
/// still observable through [`get`](PositionCell::get)), *changed* hooks
/// fire after. [`set`](PositionCell::set) with a value equal to the current
/// one is a silent no-op — no hooks fire for a zero-distance write.
///
/// Hooks run synchronously on the calling thread, in registration order.
/// A hook that re-enters [`set`](PositionCell::set) on the same cell is
/// caller error and is not guarded against.
pub struct PositionCell {
    pos: Cell<Point>,
    next_hook: Cell<u64>,
    changing: RefCell<Vec<(HookId, Hook)>>,
    changed: RefCell<Vec<(HookId, Hook)>>,
}

impl PositionCell {
    /// Create a cell holding `pos`.
    pub fn new(pos: Point) -> Self {
        Self {
            pos: Cell::new(pos),
            next_hook: Cell::new(1),
            changing: RefCell::new(Vec::new()),
            changed: RefCell::new(Vec::new()),
        }
    }

    /// The current position.
    pub fn get(&self) -> Point {
        self.pos.get()
    }

    /// Write a new position, firing hooks.
    ///
    /// Fires all *changing* hooks, updates the stored value, then fires
    /// all *changed* hooks. Writing the current value fires nothing.
    pub fn set(&self, new: Point) {
        let old = self.pos.get();
        if old == new {
            return;
        }
        let change = PositionChange { old, new };
        Self::dispatch(&self.changing, &change);
        self.pos.set(new);
        Self::dispatch(&self.changed, &change);
    }

    /// Write a new position without firing any hooks.
    ///
    /// Used by auto-sync maps when the index itself drives the move, so
    /// the write does not re-trigger index maintenance. Calling this from
    /// client code while the cell is indexed desynchronizes the map.
    pub fn set_untracked(&self, new: Point) {
        self.pos.set(new);
    }

    /// Register a hook fired before the stored value updates.
    pub fn on_changing(&self, hook: Rc<dyn Fn(&PositionChange)>) -> HookId {
        Self::register(&self.changing, &self.next_hook, hook)
    }

    /// Register a hook fired after the stored value updates.
    pub fn on_changed(&self, hook: Rc<dyn Fn(&PositionChange)>) -> HookId {
        Self::register(&self.changed, &self.next_hook, hook)
    }

    /// Remove a *changing* hook. Returns `false` if the ID is unknown.
    pub fn remove_changing(&self, id: HookId) -> bool {
        Self::remove(&self.changing, id)
    }

    /// Remove a *changed* hook. Returns `false` if the ID is unknown.
    pub fn remove_changed(&self, id: HookId) -> bool {
        Self::remove(&self.changed, id)
    }

    fn register(
        list: &RefCell<Vec<(HookId, Hook)>>,
        next: &Cell<u64>,
        hook: Hook,
    ) -> HookId {
        let id = HookId(next.get());
        next.set(next.get() + 1);
        list.borrow_mut().push((id, hook));
        id
    }

    fn remove(list: &RefCell<Vec<(HookId, Hook)>>, id: HookId) -> bool {
        let mut list = list.borrow_mut();
        match list.iter().position(|(hid, _)| *hid == id) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    fn dispatch(list: &RefCell<Vec<(HookId, Hook)>>, change: &PositionChange) {
        // Clone the hook list before calling so handlers may register or
        // remove hooks without hitting the registry borrow.
        let hooks: SmallVec<[Hook; 2]> =
            list.borrow().iter().map(|(_, h)| Rc::clone(h)).collect();
        for hook in hooks {
            hook(change);
        }
    }
}

impl fmt::Debug for PositionCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionCell")
            .field("pos", &self.pos.get())
            .field("changing_hooks", &self.changing.borrow().len())
            .field("changed_hooks", &self.changed.borrow().len())
            .finish()
    }
}

/// The "positionable" capability required by auto-sync spatial maps.
///
/// Implementors expose their embedded [`PositionCell`]; the position
/// accessor defaults through it.
pub trait Positioned {
    /// The item's position cell.
    fn position_cell(&self) -> &PositionCell;

    /// The item's current position.
    fn position(&self) -> Point {
        self.position_cell().get()
    }
}

impl<T: Positioned + ?Sized> Positioned for Rc<T> {
    fn position_cell(&self) -> &PositionCell {
        (**self).position_cell()
    }
}
