//! Strata: layered spatial maps and diff-aware grid views for 2D grids.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//! use strata::spatial::LayerStore;
//!
//! #[derive(Clone, Debug, PartialEq, Eq, Hash)]
//! struct Entity {
//!     id: u64,
//!     layer: u32,
//! }
//! impl HasLayer for Entity {
//!     fn layer(&self) -> u32 {
//!         self.layer
//!     }
//! }
//!
//! // Three layers: terrain (0), items (1, several per cell), monsters (2).
//! let mut map: LayeredSpatialMap<Entity> =
//!     LayeredSpatialMap::new(3, 0, LayerMask(0b010)).unwrap();
//!
//! let sword = Entity { id: 1, layer: 1 };
//! let shield = Entity { id: 2, layer: 1 };
//! let orc = Entity { id: 3, layer: 2 };
//! let spot = Point::new(4, 2);
//! map.add(sword.clone(), spot).unwrap();
//! map.add(shield, spot).unwrap();
//! map.add(orc.clone(), spot).unwrap();
//!
//! // Topmost item first; the monster layer sits above the item layer.
//! assert_eq!(map.item_at(spot), Some(&orc));
//!
//! // Mask-qualified queries see only the named layers.
//! let items = map.masker().mask([1]);
//! assert_eq!(map.item_at_masked(spot, items), Some(&sword));
//!
//! // Batch moves are atomic: everything moves or nothing does.
//! let moved = map.move_all(spot, Point::new(5, 2), map.all_layers()).unwrap();
//! assert_eq!(moved, 3);
//! assert!(map.layer(1).is_some_and(LayerStore::is_multi));
//!
//! // Record grid mutations into an undo/redo history.
//! let mut terrain = DiffAwareGridView::new(ArrayView::new(10, 10, '.'));
//! terrain.set(Point::new(3, 3), '#').unwrap();
//! terrain.finalize_current_diff();
//! terrain.revert_to_previous_diff().unwrap();
//! assert_eq!(terrain.get(Point::new(3, 3)), '.');
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `strata-core` | `Point`, grid view traits, capability traits, events |
//! | [`spatial`] | `strata-spatial` | Spatial maps, layer masks, list pools |
//! | [`diff`] | `strata-diff` | Diff recording and history-aware grid views |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Grid primitives and capability traits (`strata-core`).
///
/// Contains [`core::Point`], the [`core::GridView`]/[`core::GridViewMut`]
/// traits with the [`core::ArrayView`] reference implementation, the item
/// capability traits, and the [`core::PositionCell`] used by auto-synced
/// maps.
pub use strata_core as core;

/// Spatial maps, layer masks, and list pools (`strata-spatial`).
///
/// The single-item [`spatial::SpatialMap`], the many-per-position
/// [`spatial::MultiSpatialMap`], the composed
/// [`spatial::LayeredSpatialMap`], and the auto-synced wrappers of all
/// three.
pub use strata_spatial as spatial;

/// Diff recording and navigable grid history (`strata-diff`).
///
/// Wrap any mutable grid view in a [`diff::DiffAwareGridView`] to record
/// changes and walk them backward and forward.
pub use strata_diff as diff;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
///
/// This imports the position and view types, the capability traits, the
/// spatial maps with their masks and errors, and the diff-aware view.
pub mod prelude {
    // Position and grid views
    pub use strata_core::{ArrayView, GridView, GridViewMut, Point};

    // Capability traits and the identity key wrapper
    pub use strata_core::{ById, HasId, HasLayer, PositionCell, Positioned};

    // Spatial maps
    pub use strata_spatial::{
        AutoSyncLayeredSpatialMap, AutoSyncMultiSpatialMap, AutoSyncSpatialMap, LayerMask,
        LayerMasker, LayeredSpatialMap, MultiSpatialMap, SpatialMap,
    };

    // Errors
    pub use strata_diff::DiffError;
    pub use strata_spatial::SpatialError;

    // Diff history
    pub use strata_diff::{Diff, DiffAwareGridView, ValueChange};
}
