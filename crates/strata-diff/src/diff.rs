//! Recorded change sets: [`ValueChange`] and [`Diff`].

use crate::error::DiffError;
use strata_core::Point;

/// One recorded cell mutation: `pos` went from `old` to `new`.
///
/// Immutable once recorded. Replaying `new` values forward or `old`
/// values backward moves a grid between the states on either side of the
/// containing [`Diff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueChange<T> {
    /// The mutated position.
    pub pos: Point,
    /// The value before the mutation.
    pub old: T,
    /// The value after the mutation.
    pub new: T,
}

impl<T> ValueChange<T> {
    /// Record that `pos` changed from `old` to `new`.
    pub fn new(pos: Point, old: T, new: T) -> Self {
        Self { pos, old, new }
    }
}

/// An ordered group of cell changes forming one history step.
///
/// Changes accumulate in mutation order until the diff is finalized;
/// [`compress`](Self::compress) collapses repeated writes to the same
/// position into a single net change and drops positions whose value
/// ended where it started.
///
/// # Examples
///
/// ```
/// use strata_core::Point;
/// use strata_diff::{Diff, ValueChange};
///
/// let mut diff = Diff::new();
/// let p = Point::new(1, 1);
/// diff.add(ValueChange::new(p, 0, 5)).unwrap();
/// diff.add(ValueChange::new(p, 5, 9)).unwrap();
/// diff.compress();
/// assert_eq!(diff.changes(), &[ValueChange::new(p, 0, 9)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff<T> {
    changes: Vec<ValueChange<T>>,
    finalized: bool,
    compressed: bool,
}

impl<T: Copy + Eq> Diff<T> {
    /// Create an empty, open diff.
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
            finalized: false,
            compressed: false,
        }
    }

    /// The recorded changes, in mutation order (or compressed order after
    /// [`compress`](Self::compress)).
    pub fn changes(&self) -> &[ValueChange<T>] {
        &self.changes
    }

    /// Whether the diff has been closed against further changes.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether [`compress`](Self::compress) has run since the last change
    /// was added.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Append a change.
    ///
    /// Fails with [`DiffError::DiffFinalized`] once the diff is closed.
    pub fn add(&mut self, change: ValueChange<T>) -> Result<(), DiffError> {
        if self.finalized {
            return Err(DiffError::DiffFinalized);
        }
        self.changes.push(change);
        self.compressed = false;
        Ok(())
    }

    /// Close the diff against further changes. Idempotent.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Collapse the change list to at most one net change per position.
    ///
    /// Changes are stably ordered by `(x, y)` (ties keep mutation order),
    /// each position's run collapses to its first `old` and last `new`,
    /// and positions whose net change is a no-op are dropped. Idempotent;
    /// replaying the compressed diff in either direction produces the
    /// same grid states as replaying the original.
    pub fn compress(&mut self) {
        if self.compressed {
            return;
        }
        self.changes.sort_by_key(|c| (c.pos.x, c.pos.y));

        let mut collapsed: Vec<ValueChange<T>> = Vec::with_capacity(self.changes.len());
        for &change in &self.changes {
            match collapsed.last_mut() {
                Some(prev) if prev.pos == change.pos => prev.new = change.new,
                _ => collapsed.push(change),
            }
        }
        collapsed.retain(|c| c.old != c.new);

        self.changes = collapsed;
        self.compressed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn compress_collapses_runs_per_position() {
        let mut diff = Diff::new();
        diff.add(ValueChange::new(p(2, 0), 0, 1)).unwrap();
        diff.add(ValueChange::new(p(1, 0), 5, 6)).unwrap();
        diff.add(ValueChange::new(p(2, 0), 1, 3)).unwrap();
        diff.add(ValueChange::new(p(2, 0), 3, 7)).unwrap();
        diff.compress();
        assert_eq!(
            diff.changes(),
            &[ValueChange::new(p(1, 0), 5, 6), ValueChange::new(p(2, 0), 0, 7)]
        );
    }

    #[test]
    fn compress_drops_net_no_ops() {
        let mut diff = Diff::new();
        diff.add(ValueChange::new(p(0, 0), 1, 2)).unwrap();
        diff.add(ValueChange::new(p(0, 0), 2, 1)).unwrap();
        diff.compress();
        assert!(diff.changes().is_empty());
    }

    #[test]
    fn compress_is_idempotent() {
        let mut diff = Diff::new();
        diff.add(ValueChange::new(p(0, 1), 0, 4)).unwrap();
        diff.add(ValueChange::new(p(3, 1), 2, 2)).unwrap();
        diff.compress();
        let once = diff.clone();
        diff.compress();
        assert_eq!(diff, once);
    }

    #[test]
    fn finalized_diff_rejects_changes() {
        let mut diff = Diff::new();
        diff.add(ValueChange::new(p(0, 0), 0, 1)).unwrap();
        diff.finalize();
        assert_eq!(
            diff.add(ValueChange::new(p(0, 0), 1, 2)),
            Err(DiffError::DiffFinalized)
        );
        assert_eq!(diff.changes().len(), 1);
    }

    #[test]
    fn adding_after_compress_clears_the_flag() {
        let mut diff = Diff::new();
        diff.add(ValueChange::new(p(0, 0), 0, 1)).unwrap();
        diff.compress();
        assert!(diff.is_compressed());
        diff.add(ValueChange::new(p(0, 0), 1, 2)).unwrap();
        assert!(!diff.is_compressed());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn arb_changes() -> impl Strategy<Value = Vec<(u8, u8, i8)>> {
            // (x, y, new value); old values are threaded in below.
            prop::collection::vec((0u8..4, 0u8..4, any::<i8>()), 0..64)
        }

        fn thread_old_values(raw: &[(u8, u8, i8)]) -> Vec<ValueChange<i8>> {
            let mut state: BTreeMap<(u8, u8), i8> = BTreeMap::new();
            raw.iter()
                .map(|&(x, y, new)| {
                    let old = state.insert((x, y), new).unwrap_or(0);
                    ValueChange::new(p(i32::from(x), i32::from(y)), old, new)
                })
                .collect()
        }

        fn replay_forward(changes: &[ValueChange<i8>]) -> BTreeMap<(i32, i32), i8> {
            let mut state = BTreeMap::new();
            for c in changes {
                state.insert((c.pos.x, c.pos.y), c.new);
            }
            state.retain(|_, v| *v != 0);
            state
        }

        proptest! {
            #[test]
            fn compressed_forward_replay_matches_original(raw in arb_changes()) {
                let changes = thread_old_values(&raw);
                let mut diff = Diff::new();
                for &c in &changes {
                    diff.add(c).unwrap();
                }
                let original = replay_forward(diff.changes());
                diff.compress();
                prop_assert_eq!(replay_forward(diff.changes()), original);
            }

            #[test]
            fn compression_leaves_at_most_one_change_per_position(raw in arb_changes()) {
                let changes = thread_old_values(&raw);
                let mut diff = Diff::new();
                for &c in &changes {
                    diff.add(c).unwrap();
                }
                diff.compress();
                let mut seen = std::collections::BTreeSet::new();
                for c in diff.changes() {
                    prop_assert!(seen.insert((c.pos.x, c.pos.y)));
                    prop_assert_ne!(c.old, c.new);
                }
            }
        }
    }
}
