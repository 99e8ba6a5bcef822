//! Item capability traits and the identity-keyed [`ById`] wrapper.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A stable identity usable for equality and hashing.
///
/// The returned ID must be fixed for the item's lifetime and independent
/// of any mutable state (notably its position), so that moving an item
/// never changes its place in a hash-based index.
pub trait HasId {
    /// The item's stable identity.
    fn id(&self) -> u64;
}

/// An integer layer number routing an item within a layered spatial map.
///
/// The layer must be fixed for as long as the item is present in a map;
/// changing it while indexed leaves the map unable to find the item.
pub trait HasLayer {
    /// The item's layer number.
    fn layer(&self) -> u32;
}

impl<T: HasId + ?Sized> HasId for &T {
    fn id(&self) -> u64 {
        (**self).id()
    }
}

impl<T: HasId + ?Sized> HasId for Rc<T> {
    fn id(&self) -> u64 {
        (**self).id()
    }
}

impl<T: HasLayer + ?Sized> HasLayer for &T {
    fn layer(&self) -> u32 {
        (**self).layer()
    }
}

impl<T: HasLayer + ?Sized> HasLayer for Rc<T> {
    fn layer(&self) -> u32 {
        (**self).layer()
    }
}

/// Wraps a value so that `Eq` and `Hash` go through [`HasId::id`].
///
/// Spatial maps key their indexes on item equality and hashing. For item
/// types whose natural `Eq`/`Hash` would touch mutable state (or that
/// have none at all), `ById` supplies an identity-based comparison that
/// is safe to index on.
///
/// # Examples
///
/// ```
/// use strata_core::{ById, HasId};
///
/// #[derive(Debug)]
/// struct Orc { id: u64, hp: i32 }
/// impl HasId for Orc {
///     fn id(&self) -> u64 { self.id }
/// }
///
/// let a = ById(Orc { id: 1, hp: 10 });
/// let b = ById(Orc { id: 1, hp: 3 });
/// assert_eq!(a, b); // same identity, hp ignored
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ById<T>(pub T);

impl<T: HasId> PartialEq for ById<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl<T: HasId> Eq for ById<T> {}

impl<T: HasId> Hash for ById<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}

impl<T: HasId> HasId for ById<T> {
    fn id(&self) -> u64 {
        self.0.id()
    }
}

impl<T: HasLayer> HasLayer for ById<T> {
    fn layer(&self) -> u32 {
        self.0.layer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    #[derive(Debug)]
    struct Tagged {
        id: u64,
        label: &'static str,
    }

    impl HasId for Tagged {
        fn id(&self) -> u64 {
            self.id
        }
    }

    fn hash_of<T: Hash>(v: &T) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn equality_ignores_non_id_fields() {
        let a = ById(Tagged { id: 5, label: "a" });
        let b = ById(Tagged { id: 5, label: "b" });
        let c = ById(Tagged { id: 6, label: "a" });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn id_forwards_through_rc() {
        let item = Rc::new(Tagged { id: 9, label: "x" });
        assert_eq!(item.id(), 9);
        assert_eq!(ById(Rc::clone(&item)).id(), 9);
    }
}
