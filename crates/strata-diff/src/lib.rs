//! Change-recording grid views with navigable history.
//!
//! [`DiffAwareGridView`] wraps any [`GridViewMut`](strata_core::GridViewMut)
//! and records every mutation into an ordered sequence of [`Diff`]s. The
//! history can be walked backward ([`revert_to_previous_diff`]) and
//! forward ([`apply_next_diff`]) like an undo/redo stack, and a recorded
//! history can be transplanted onto a compatible view with
//! [`set_history`] after bidirectional consistency validation.
//!
//! [`revert_to_previous_diff`]: DiffAwareGridView::revert_to_previous_diff
//! [`apply_next_diff`]: DiffAwareGridView::apply_next_diff
//! [`set_history`]: DiffAwareGridView::set_history

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod view;

pub use diff::{Diff, ValueChange};
pub use error::DiffError;
pub use view::DiffAwareGridView;
