//! Reusable-list allocation for multi-item spatial maps.
//!
//! Multi-maps materialize a `Vec` of items per occupied position. Under
//! heavy add/remove churn those vectors would otherwise be allocated and
//! dropped constantly; a [`ListPool`] keeps returned vectors on a free
//! list and hands them back out cleared.

use std::cell::RefCell;
use std::rc::Rc;

/// A reusable-`Vec` allocator.
///
/// `rent` always returns an empty vector; `give_back` returns one to the
/// pool for reuse. Implementations are not thread-safe; sharing a pool
/// across maps is permitted but concurrent access requires external
/// synchronization (see the crate-level concurrency notes).
pub trait ListPool<T> {
    /// Take a cleared vector from the pool, allocating if none is free.
    fn rent(&mut self) -> Vec<T>;

    /// Return a vector to the pool. The pool clears it before reuse.
    fn give_back(&mut self, list: Vec<T>);
}

/// A [`ListPool`] with a bounded free list.
///
/// Retains at most `max_pooled` vectors, and only vectors whose capacity
/// does not exceed `max_retained_capacity` — a position that once held
/// thousands of items should not pin that allocation forever.
///
/// # Examples
///
/// ```
/// use strata_spatial::{ListPool, ReusableListPool};
///
/// let mut pool: ReusableListPool<u32> = ReusableListPool::new(8, 64);
/// let mut list = pool.rent();
/// list.push(1);
/// pool.give_back(list);
/// assert_eq!(pool.pooled_count(), 1);
/// assert!(pool.rent().is_empty()); // cleared on return
/// ```
#[derive(Clone, Debug)]
pub struct ReusableListPool<T> {
    free: Vec<Vec<T>>,
    max_pooled: usize,
    max_retained_capacity: usize,
}

impl<T> ReusableListPool<T> {
    /// Create a pool retaining up to `max_pooled` vectors of capacity at
    /// most `max_retained_capacity`.
    pub fn new(max_pooled: usize, max_retained_capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            max_pooled,
            max_retained_capacity,
        }
    }

    /// Number of vectors currently waiting on the free list.
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }
}

impl<T> Default for ReusableListPool<T> {
    /// A pool retaining up to 32 vectors of capacity at most 64.
    fn default() -> Self {
        Self::new(32, 64)
    }
}

impl<T> ListPool<T> for ReusableListPool<T> {
    fn rent(&mut self) -> Vec<T> {
        self.free.pop().unwrap_or_default()
    }

    fn give_back(&mut self, mut list: Vec<T>) {
        if self.free.len() >= self.max_pooled || list.capacity() > self.max_retained_capacity {
            return;
        }
        list.clear();
        self.free.push(list);
    }
}

/// A [`ListPool`] that never pools: every `rent` allocates fresh and
/// every `give_back` drops.
///
/// Substitutable wherever deterministic allocation behavior is preferred
/// over amortization.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPoolingListPool;

impl<T> ListPool<T> for NoPoolingListPool {
    fn rent(&mut self) -> Vec<T> {
        Vec::new()
    }

    fn give_back(&mut self, _list: Vec<T>) {}
}

/// A shareable handle to a list pool.
///
/// Several maps may deliberately share one pool to amortize allocation
/// together; the handle is single-threaded (`Rc`).
pub type SharedListPool<T> = Rc<RefCell<dyn ListPool<T>>>;

/// Wrap a pool in a [`SharedListPool`] handle.
pub fn shared<T, P: ListPool<T> + 'static>(pool: P) -> SharedListPool<T> {
    Rc::new(RefCell::new(pool))
}

/// A fresh shared [`ReusableListPool`] with default bounds.
pub fn default_shared<T: 'static>() -> SharedListPool<T> {
    shared(ReusableListPool::default())
}
