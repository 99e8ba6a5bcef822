//! Error types for spatial-map operations.

use std::fmt;
use strata_core::Point;

/// Errors arising from spatial-map mutation or construction.
///
/// Every variant is a precondition violation surfaced synchronously to
/// the caller; no operation leaves the map partially mutated on error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpatialError {
    /// The item is already present in the map.
    ItemAlreadyPresent,
    /// The target position is already occupied in a single-item map.
    PositionOccupied {
        /// The occupied position.
        pos: Point,
    },
    /// The item is not present in the map.
    ItemNotFound,
    /// A batch move found no items at the source position.
    NoItemsAtPosition {
        /// The empty source position.
        pos: Point,
    },
    /// The item's layer lies outside the layered map's configured range.
    LayerOutOfRange {
        /// The item's layer.
        layer: u32,
        /// First valid layer.
        starting_layer: u32,
        /// Number of valid layers.
        num_layers: u32,
    },
    /// A layer masker was constructed with an unsupported layer count.
    InvalidLayerCount {
        /// The requested count; valid counts are 1 through 32.
        count: u32,
    },
}

impl fmt::Display for SpatialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemAlreadyPresent => write!(f, "item is already present in the map"),
            Self::PositionOccupied { pos } => {
                write!(f, "position {pos} is already occupied")
            }
            Self::ItemNotFound => write!(f, "item is not present in the map"),
            Self::NoItemsAtPosition { pos } => {
                write!(f, "no items at position {pos}")
            }
            Self::LayerOutOfRange {
                layer,
                starting_layer,
                num_layers,
            } => write!(
                f,
                "layer {layer} outside valid range [{starting_layer}, {})",
                starting_layer + num_layers
            ),
            Self::InvalidLayerCount { count } => {
                write!(f, "layer count {count} outside supported range 1..=32")
            }
        }
    }
}

impl std::error::Error for SpatialError {}
