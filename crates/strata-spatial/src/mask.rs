//! Layer masks and the [`LayerMasker`] bit-mask algebra.

use crate::error::SpatialError;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A bit-set selecting a subset of layers: bit `L` set means layer `L`.
///
/// Masks are combined with `|` and tested through a [`LayerMasker`],
/// which knows how many layers are actually valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// The empty mask.
    pub const EMPTY: LayerMask = LayerMask(0);

    /// Whether no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: LayerMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LayerMask {
    type Output = LayerMask;

    fn bitand(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 & rhs.0)
    }
}

impl From<u32> for LayerMask {
    fn from(bits: u32) -> Self {
        LayerMask(bits)
    }
}

impl fmt::Display for LayerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034b}", self.0)
    }
}

/// Stateless bit-mask arithmetic over a fixed number of layers.
///
/// Constructed with a layer count `N` in `1..=32`; layers `0..N` are
/// valid. Layer numbers outside the valid range are silently dropped by
/// mask-building operations, so exploratory code may pass speculative
/// layer numbers without first range-checking them.
///
/// # Examples
///
/// ```
/// use strata_spatial::LayerMasker;
///
/// let masker = LayerMasker::new(3).unwrap();
/// let mask = masker.mask([0, 2, 5]); // layer 5 dropped: out of range
/// assert_eq!(mask.0, 0b101);
/// assert_eq!(masker.layers(mask).collect::<Vec<_>>(), vec![2, 0]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerMasker {
    num_layers: u32,
    valid: u32,
}

impl LayerMasker {
    /// Create a masker over `num_layers` layers.
    ///
    /// Fails with [`SpatialError::InvalidLayerCount`] unless
    /// `1 <= num_layers <= 32`.
    pub fn new(num_layers: u32) -> Result<Self, SpatialError> {
        if num_layers == 0 || num_layers > 32 {
            return Err(SpatialError::InvalidLayerCount { count: num_layers });
        }
        let valid = if num_layers == 32 {
            u32::MAX
        } else {
            (1u32 << num_layers) - 1
        };
        Ok(Self { num_layers, valid })
    }

    /// Number of valid layers.
    pub const fn num_layers(&self) -> u32 {
        self.num_layers
    }

    /// Build a mask from the given layers, dropping out-of-range ones.
    pub fn mask(&self, layers: impl IntoIterator<Item = u32>) -> LayerMask {
        let mut bits = 0u32;
        for layer in layers {
            if layer < self.num_layers {
                bits |= 1 << layer;
            }
        }
        LayerMask(bits)
    }

    /// OR additional layers into `mask`, dropping out-of-range ones.
    pub fn add_layers(&self, mask: LayerMask, layers: impl IntoIterator<Item = u32>) -> LayerMask {
        mask | self.mask(layers)
    }

    /// OR two masks together, clipped to the valid layers.
    pub fn union(&self, a: LayerMask, b: LayerMask) -> LayerMask {
        LayerMask((a.0 | b.0) & self.valid)
    }

    /// Whether `layer` is valid and present in `mask`.
    pub fn has_layer(&self, mask: LayerMask, layer: u32) -> bool {
        layer < self.num_layers && mask.0 & (1 << layer) != 0
    }

    /// Lazily enumerate the valid layers in `mask`, highest first.
    ///
    /// The **descending** order is a contract: layered spatial maps build
    /// their "topmost item wins" semantics on it.
    pub fn layers(&self, mask: LayerMask) -> DescendingLayerIter {
        DescendingLayerIter {
            remaining: mask.0 & self.valid,
        }
    }

    /// Mask of all valid layers at or above `layer` (inclusive).
    pub fn mask_all_above(&self, layer: u32) -> LayerMask {
        if layer >= 32 {
            return LayerMask(0);
        }
        LayerMask((u32::MAX << layer) & self.valid)
    }

    /// Mask of all valid layers at or below `layer` (inclusive).
    pub fn mask_all_below(&self, layer: u32) -> LayerMask {
        let bits = if layer >= 31 {
            u32::MAX
        } else {
            (1u32 << (layer + 1)) - 1
        };
        LayerMask(bits & self.valid)
    }

    /// Mask of every valid layer.
    pub const fn all_layers(&self) -> LayerMask {
        LayerMask(self.valid)
    }

    /// The empty mask.
    pub const fn no_layers(&self) -> LayerMask {
        LayerMask(0)
    }
}

impl Default for LayerMasker {
    /// A masker over all 32 layers.
    fn default() -> Self {
        Self {
            num_layers: 32,
            valid: u32::MAX,
        }
    }
}

/// Lazy iterator over the layers in a mask, highest layer first.
///
/// Allocation-free; produced by [`LayerMasker::layers`].
#[derive(Clone, Copy, Debug)]
pub struct DescendingLayerIter {
    remaining: u32,
}

impl Iterator for DescendingLayerIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let top = 31 - self.remaining.leading_zeros();
        self.remaining &= !(1 << top);
        Some(top)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for DescendingLayerIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_layers_silently_dropped() {
        let masker = LayerMasker::new(3).unwrap();
        assert_eq!(masker.mask([0, 2, 5]).0, 5);
    }

    #[test]
    fn layers_enumerates_descending() {
        let masker = LayerMasker::new(8).unwrap();
        let mask = masker.mask([1, 5, 2, 4]);
        assert_eq!(masker.layers(mask).collect::<Vec<_>>(), vec![5, 4, 2, 1]);
    }

    #[test]
    fn layers_clips_to_valid_range() {
        let masker = LayerMasker::new(2).unwrap();
        // Raw mask with invalid high bits set.
        let mask = LayerMask(0b1111);
        assert_eq!(masker.layers(mask).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn mask_all_below_respects_valid_layers() {
        let masker = LayerMasker::new(3).unwrap();
        assert_eq!(masker.mask_all_below(31), masker.all_layers());
        assert_eq!(masker.all_layers().0, 7);
        assert_eq!(masker.mask_all_below(1).0, 0b11);
        assert_eq!(masker.mask_all_below(0).0, 0b1);
    }

    #[test]
    fn mask_all_above_is_inclusive_and_clipped() {
        let masker = LayerMasker::new(4).unwrap();
        assert_eq!(masker.mask_all_above(2).0, 0b1100);
        assert_eq!(masker.mask_all_above(0), masker.all_layers());
        assert_eq!(masker.mask_all_above(32).0, 0);
    }

    #[test]
    fn constructor_rejects_zero_and_oversized_counts() {
        assert_eq!(
            LayerMasker::new(0),
            Err(SpatialError::InvalidLayerCount { count: 0 })
        );
        assert_eq!(
            LayerMasker::new(33),
            Err(SpatialError::InvalidLayerCount { count: 33 })
        );
        assert!(LayerMasker::new(32).is_ok());
    }

    #[test]
    fn full_width_masker_covers_all_bits() {
        let masker = LayerMasker::default();
        assert_eq!(masker.all_layers().0, u32::MAX);
        assert!(masker.has_layer(masker.all_layers(), 31));
        assert_eq!(masker.layers(masker.all_layers()).count(), 32);
    }

    #[test]
    fn has_layer_rejects_out_of_range() {
        let masker = LayerMasker::new(3).unwrap();
        assert!(masker.has_layer(LayerMask(0b100), 2));
        assert!(!masker.has_layer(LayerMask(0b100), 3));
        assert!(!masker.has_layer(LayerMask(0xFFFF_FFFF), 10));
    }

    #[test]
    fn union_clips_invalid_bits() {
        let masker = LayerMasker::new(2).unwrap();
        let u = masker.union(LayerMask(0b01), LayerMask(0b1110));
        assert_eq!(u.0, 0b11);
    }

    #[test]
    fn iterator_is_restartable_by_cloning() {
        let masker = LayerMasker::new(8).unwrap();
        let iter = masker.layers(masker.mask([3, 6]));
        assert_eq!(iter.clone().collect::<Vec<_>>(), vec![6, 3]);
        assert_eq!(iter.collect::<Vec<_>>(), vec![6, 3]);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn descending_order_holds_for_arbitrary_masks(bits in any::<u32>(), n in 1u32..=32) {
                let masker = LayerMasker::new(n).unwrap();
                let layers: Vec<u32> = masker.layers(LayerMask(bits)).collect();
                for pair in layers.windows(2) {
                    prop_assert!(pair[0] > pair[1]);
                }
                for &layer in &layers {
                    prop_assert!(layer < n);
                    prop_assert!(bits & (1 << layer) != 0);
                }
            }

            #[test]
            fn mask_round_trips_through_layers(layers in proptest::collection::btree_set(0u32..16, 0..10)) {
                let masker = LayerMasker::new(16).unwrap();
                let mask = masker.mask(layers.iter().copied());
                let mut out: Vec<u32> = masker.layers(mask).collect();
                out.sort_unstable();
                prop_assert_eq!(out, layers.into_iter().collect::<Vec<_>>());
            }
        }
    }
}
