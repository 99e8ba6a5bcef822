//! Position-indexed item containers for grid games and simulations.
//!
//! This crate provides the spatial-map family: bidirectional item ↔
//! position indexes with synchronous change notifications.
//!
//! # Map variants
//!
//! - [`SpatialMap`]: at most one item per position
//! - [`MultiSpatialMap`]: many items per position, backed by pooled lists
//! - [`LayeredSpatialMap`]: a fixed set of layers, each backed by a single-
//!   or multi-item sub-map, with [`LayerMask`]-qualified queries
//! - [`AutoSyncSpatialMap`] / [`AutoSyncMultiSpatialMap`] /
//!   [`AutoSyncLayeredSpatialMap`]: wrappers that keep an item's own
//!   position field and the map index mutually consistent
//!
//! # Ordering contracts
//!
//! Mask-qualified layered queries visit layers in **descending** order
//! (highest layer first); callers may rely on "first item returned" being
//! the topmost. Within a multi-map position, insertion order is preserved.
//!
//! All maps are single-threaded and unsynchronized; notifications fire
//! in-line with the triggering mutation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod layered;
pub mod map;
pub mod mask;
pub mod multi;
pub mod pool;
pub mod sync;

pub use error::SpatialError;
pub use events::{ItemAdded, ItemMoved, ItemRemoved};
pub use layered::{LayerStore, LayeredItemsIter, LayeredSpatialMap};
pub use map::SpatialMap;
pub use mask::{DescendingLayerIter, LayerMask, LayerMasker};
pub use multi::MultiSpatialMap;
pub use pool::{ListPool, NoPoolingListPool, ReusableListPool, SharedListPool};
pub use sync::{AutoSyncLayeredSpatialMap, AutoSyncMultiSpatialMap, AutoSyncSpatialMap};
