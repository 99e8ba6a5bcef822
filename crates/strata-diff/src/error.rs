//! Error types for diff recording and history navigation.

use std::fmt;
use strata_core::Point;

/// Errors arising from diff-aware view mutation or history manipulation.
///
/// Every variant is surfaced before the wrapped view is touched; a failed
/// operation never leaves the view or the history partially updated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// A write was attempted while unapplied future diffs exist.
    ///
    /// Mutating mid-history would fork it; apply the remaining diffs or
    /// call
    /// [`clear_history`](crate::DiffAwareGridView::clear_history) first.
    PendingRedo {
        /// Number of recorded diffs ahead of the current position.
        pending: usize,
    },
    /// There is no recorded diff ahead of the current position.
    NoDiffsToApply,
    /// The view is already at the state preceding all recorded diffs.
    AtBaseline,
    /// A change was added to a diff that has been finalized.
    DiffFinalized,
    /// A history was supplied with a current index past its end.
    InvalidHistoryIndex {
        /// The supplied index.
        index: usize,
        /// Number of diffs in the supplied history.
        len: usize,
    },
    /// A supplied history does not replay consistently against the
    /// wrapped view's contents.
    InconsistentHistory {
        /// The first position at which replay diverged.
        pos: Point,
        /// What was expected there versus what was found.
        detail: String,
    },
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingRedo { pending } => {
                write!(f, "cannot write with {pending} unapplied diff(s) ahead")
            }
            Self::NoDiffsToApply => write!(f, "no recorded diff ahead of the current position"),
            Self::AtBaseline => write!(f, "already at the baseline state"),
            Self::DiffFinalized => write!(f, "diff has been finalized and accepts no changes"),
            Self::InvalidHistoryIndex { index, len } => {
                write!(f, "history index {index} out of range for {len} diff(s)")
            }
            Self::InconsistentHistory { pos, detail } => {
                write!(f, "history inconsistent at {pos}: {detail}")
            }
        }
    }
}

impl std::error::Error for DiffError {}
