//! Core grid primitives and capability traits for the Strata library.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! fundamental abstractions shared by the spatial-map and diff crates:
//! the [`Point`] position key, the [`GridView`]/[`GridViewMut`] traits,
//! the item capability traits ([`HasId`], [`HasLayer`], [`Positioned`]),
//! and the synchronous [`EventRegistry`] used for map notifications.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod event;
pub mod point;
pub mod traits;
pub mod view;

pub use cell::{HookId, PositionCell, PositionChange, Positioned};
pub use event::{EventRegistry, SubscriberHandle};
pub use point::Point;
pub use traits::{ById, HasId, HasLayer};
pub use view::{ArrayView, GridView, GridViewMut};
