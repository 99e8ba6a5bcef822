//! Event payloads published by spatial maps.
//!
//! Maps emit these through [`EventRegistry`](strata_core::EventRegistry)
//! synchronously, after the index mutation and before the triggering
//! operation returns.

use strata_core::Point;

/// An item was added to the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemAdded<T> {
    /// The added item.
    pub item: T,
    /// Where it was added.
    pub pos: Point,
}

/// An item was moved to a new position.
///
/// Zero-distance moves succeed without emitting this event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemMoved<T> {
    /// The moved item.
    pub item: T,
    /// Its previous position.
    pub old: Point,
    /// Its new position.
    pub new: Point,
}

/// An item was removed from the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRemoved<T> {
    /// The removed item.
    pub item: T,
    /// The position it occupied.
    pub pos: Point,
}
