//! The [`DiffAwareGridView`] wrapper.

use crate::diff::{Diff, ValueChange};
use crate::error::DiffError;
use indexmap::IndexMap;
use std::fmt;
use strata_core::{GridView, GridViewMut, Point};

/// A grid view that records every write into a navigable diff history.
///
/// Writes go through the inherent [`set`](Self::set) rather than
/// [`GridViewMut::set`], so that recording can refuse writes that would
/// fork the history. Read access implements [`GridView`] and always
/// reflects the wrapped view's current contents.
///
/// The history position is `current`: `None` means the baseline state
/// before any recorded diff, `Some(i)` means diffs `0..=i` are applied.
/// New writes are only accepted at the newest diff (or baseline with an
/// empty history); navigating backward and then writing requires either
/// re-applying forward or [`clear_history`](Self::clear_history).
///
/// # Examples
///
/// ```
/// use strata_core::{ArrayView, GridView, Point};
/// use strata_diff::DiffAwareGridView;
///
/// let mut view = DiffAwareGridView::new(ArrayView::new(4, 4, 0));
/// let p = Point::new(1, 2);
/// view.set(p, 7).unwrap();
/// view.finalize_current_diff();
///
/// assert_eq!(view.revert_to_previous_diff().unwrap(), 1);
/// assert_eq!(view.get(p), 0);
/// assert_eq!(view.apply_next_diff().unwrap(), 1);
/// assert_eq!(view.get(p), 7);
/// ```
pub struct DiffAwareGridView<T, V> {
    view: V,
    diffs: Vec<Diff<T>>,
    current: Option<usize>,
    auto_compress: bool,
}

impl<T, V> DiffAwareGridView<T, V>
where
    T: Copy + Eq,
    V: GridViewMut<T>,
{
    /// Wrap `view` with auto-compression enabled.
    pub fn new(view: V) -> Self {
        Self::with_auto_compress(view, true)
    }

    /// Wrap `view`, choosing whether diffs are compressed automatically
    /// when finalized or navigated across.
    pub fn with_auto_compress(view: V, auto_compress: bool) -> Self {
        Self {
            view,
            diffs: Vec::new(),
            current: None,
            auto_compress,
        }
    }

    /// The recorded diffs, oldest first.
    pub fn diffs(&self) -> &[Diff<T>] {
        &self.diffs
    }

    /// The index of the newest applied diff, or `None` at baseline.
    pub fn current_diff_index(&self) -> Option<usize> {
        self.current
    }

    /// Shared access to the wrapped view.
    pub fn inner(&self) -> &V {
        &self.view
    }

    /// Unwrap, discarding the recorded history.
    pub fn into_inner(self) -> V {
        self.view
    }

    /// Write `value` at `pos`, recording the change in the current diff.
    ///
    /// Opens a fresh diff if the history is empty or the current diff has
    /// been finalized. Writing a cell's existing value records nothing.
    ///
    /// Fails with [`DiffError::PendingRedo`] while unapplied diffs sit
    /// ahead of the current position.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is outside the wrapped view's bounds.
    pub fn set(&mut self, pos: Point, value: T) -> Result<(), DiffError> {
        let pending = self.pending_count();
        if pending > 0 {
            return Err(DiffError::PendingRedo { pending });
        }

        let old = self.view.get(pos);
        if old == value {
            return Ok(());
        }

        if self.diffs.last().map_or(true, Diff::is_finalized) {
            self.diffs.push(Diff::new());
            self.current = Some(self.diffs.len() - 1);
        }
        let diff = self
            .diffs
            .last_mut()
            .expect("a diff was just ensured to exist");
        diff.add(ValueChange::new(pos, old, value))
            .expect("the current diff is open");
        self.view.set(pos, value);
        Ok(())
    }

    /// Re-apply the next recorded diff, returning how many cell changes
    /// were replayed.
    ///
    /// Fails with [`DiffError::NoDiffsToApply`] when already at the
    /// newest diff.
    pub fn apply_next_diff(&mut self) -> Result<usize, DiffError> {
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.diffs.len() {
            return Err(DiffError::NoDiffsToApply);
        }

        let diff = &mut self.diffs[next];
        diff.finalize();
        if self.auto_compress {
            diff.compress();
        }
        for change in diff.changes() {
            self.view.set(change.pos, change.new);
        }
        let count = diff.changes().len();
        self.current = Some(next);
        Ok(count)
    }

    /// Undo the current diff, returning how many cell changes were rolled
    /// back.
    ///
    /// The diff being left is finalized (and compressed when
    /// auto-compression is on); if its net change is empty it is dropped
    /// from the history entirely. Fails with [`DiffError::AtBaseline`]
    /// when no diff is applied.
    pub fn revert_to_previous_diff(&mut self) -> Result<usize, DiffError> {
        let index = self.current.ok_or(DiffError::AtBaseline)?;

        let diff = &mut self.diffs[index];
        diff.finalize();
        if self.auto_compress {
            diff.compress();
        }
        for change in diff.changes().iter().rev() {
            self.view.set(change.pos, change.old);
        }
        let count = diff.changes().len();
        if diff.changes().is_empty() {
            self.diffs.remove(index);
        }
        self.current = index.checked_sub(1);
        Ok(count)
    }

    /// Close the current diff so the next write opens a fresh one.
    ///
    /// A diff whose net change is empty is dropped rather than retained,
    /// so navigation never crosses an empty step. No-op at baseline.
    pub fn finalize_current_diff(&mut self) {
        let Some(index) = self.current else {
            return;
        };
        let diff = &mut self.diffs[index];
        diff.finalize();
        if self.auto_compress {
            diff.compress();
        }
        if diff.changes().is_empty() {
            self.diffs.remove(index);
            self.current = index.checked_sub(1);
        }
    }

    /// Drop the entire recorded history, keeping the wrapped view's
    /// current contents as the new baseline.
    pub fn clear_history(&mut self) {
        self.diffs.clear();
        self.current = None;
    }

    fn pending_count(&self) -> usize {
        self.diffs.len() - self.current.map_or(0, |i| i + 1)
    }
}

impl<T, V> DiffAwareGridView<T, V>
where
    T: Copy + Eq + fmt::Debug,
    V: GridViewMut<T>,
{
    /// Replace the recorded history wholesale.
    ///
    /// The supplied history must be consistent with the wrapped view's
    /// current contents: replaying diffs `0..=current` backward from the
    /// present state must match each change's `new` value, and replaying
    /// diffs `current + 1..` forward must match each `old` value. The
    /// first divergence rejects the whole history with
    /// [`DiffError::InconsistentHistory`] and leaves the view untouched.
    ///
    /// `current` follows the same convention as
    /// [`current_diff_index`](Self::current_diff_index): `None` places
    /// the view at the baseline with every supplied diff still ahead.
    pub fn set_history(
        &mut self,
        diffs: Vec<Diff<T>>,
        current: Option<usize>,
    ) -> Result<(), DiffError> {
        if let Some(index) = current {
            if index >= diffs.len() {
                return Err(DiffError::InvalidHistoryIndex {
                    index,
                    len: diffs.len(),
                });
            }
        }

        // Validation never writes the view; divergence from the recorded
        // values is tracked in an overlay keyed by position.
        let mut state: IndexMap<Point, T> = IndexMap::new();
        if let Some(index) = current {
            for diff in diffs[..=index].iter().rev() {
                for change in diff.changes().iter().rev() {
                    let found = self.inferred_value(&state, change.pos)?;
                    if found != change.new {
                        return Err(DiffError::InconsistentHistory {
                            pos: change.pos,
                            detail: format!(
                                "expected {:?} rolling back, found {:?}",
                                change.new, found
                            ),
                        });
                    }
                    state.insert(change.pos, change.old);
                }
            }
        }

        state.clear();
        let first_ahead = current.map_or(0, |i| i + 1);
        for diff in &diffs[first_ahead..] {
            for change in diff.changes() {
                let found = self.inferred_value(&state, change.pos)?;
                if found != change.old {
                    return Err(DiffError::InconsistentHistory {
                        pos: change.pos,
                        detail: format!(
                            "expected {:?} replaying forward, found {:?}",
                            change.old, found
                        ),
                    });
                }
                state.insert(change.pos, change.new);
            }
        }

        self.diffs = diffs;
        self.current = current;
        Ok(())
    }

    fn inferred_value(&self, state: &IndexMap<Point, T>, pos: Point) -> Result<T, DiffError> {
        if let Some(&value) = state.get(&pos) {
            return Ok(value);
        }
        if !self.view.contains(pos) {
            return Err(DiffError::InconsistentHistory {
                pos,
                detail: format!(
                    "position outside the {}x{} view",
                    self.view.width(),
                    self.view.height()
                ),
            });
        }
        Ok(self.view.get(pos))
    }
}

impl<T, V> GridView<T> for DiffAwareGridView<T, V>
where
    T: Copy + Eq,
    V: GridViewMut<T>,
{
    fn width(&self) -> usize {
        self.view.width()
    }

    fn height(&self) -> usize {
        self.view.height()
    }

    fn get(&self, pos: Point) -> T {
        self.view.get(pos)
    }
}

impl<T, V> fmt::Debug for DiffAwareGridView<T, V>
where
    T: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffAwareGridView")
            .field("view", &self.view)
            .field("diffs", &self.diffs.len())
            .field("current", &self.current)
            .field("auto_compress", &self.auto_compress)
            .finish()
    }
}
