//! History navigation integration: record an editing session, walk it in
//! both directions, and transplant it onto a second view.

use strata_core::{ArrayView, GridView, Point};
use strata_diff::{DiffAwareGridView, DiffError};

// ── Helpers ─────────────────────────────────────────────────────

const WALL: char = '#';
const FLOOR: char = '.';
const DOOR: char = '+';

fn p(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

fn blank() -> DiffAwareGridView<char, ArrayView<char>> {
    DiffAwareGridView::new(ArrayView::new(8, 8, FLOOR))
}

/// Carve a room outline as one diff, then punch a door as a second.
fn carve_room(view: &mut DiffAwareGridView<char, ArrayView<char>>) {
    for x in 2..=5 {
        view.set(p(x, 2), WALL).unwrap();
        view.set(p(x, 5), WALL).unwrap();
    }
    for y in 3..=4 {
        view.set(p(2, y), WALL).unwrap();
        view.set(p(5, y), WALL).unwrap();
    }
    view.finalize_current_diff();

    view.set(p(3, 2), DOOR).unwrap();
    view.finalize_current_diff();
}

// ── Tests ───────────────────────────────────────────────────────

#[test]
fn an_editing_session_undoes_and_redoes_cleanly() {
    let mut view = blank();
    carve_room(&mut view);
    let finished = view.inner().clone();

    assert_eq!(view.diffs().len(), 2);
    assert_eq!(view.current_diff_index(), Some(1));

    // Undo the door, then the room.
    assert_eq!(view.revert_to_previous_diff(), Ok(1));
    assert_eq!(view.get(p(3, 2)), WALL);
    assert!(view.revert_to_previous_diff().is_ok());
    assert_eq!(view.inner(), &ArrayView::new(8, 8, FLOOR));
    assert_eq!(view.revert_to_previous_diff(), Err(DiffError::AtBaseline));

    // Redo everything.
    assert!(view.apply_next_diff().is_ok());
    assert_eq!(view.apply_next_diff(), Ok(1));
    assert_eq!(view.inner(), &finished);
    assert_eq!(view.apply_next_diff(), Err(DiffError::NoDiffsToApply));
}

#[test]
fn editing_mid_history_requires_clearing_or_redoing() {
    let mut view = blank();
    carve_room(&mut view);
    view.revert_to_previous_diff().unwrap();

    assert_eq!(
        view.set(p(0, 0), WALL),
        Err(DiffError::PendingRedo { pending: 1 })
    );

    // Redoing forward unblocks writes at the newest diff.
    view.apply_next_diff().unwrap();
    view.set(p(0, 0), WALL).unwrap();
    assert_eq!(view.diffs().len(), 3);
}

#[test]
fn a_recorded_history_transplants_onto_a_matching_view() {
    let mut source = blank();
    carve_room(&mut source);
    source.revert_to_previous_diff().unwrap();
    let diffs = source.diffs().to_vec();
    let grid = source.into_inner();

    // Same contents, same history position: accepted.
    let mut target = DiffAwareGridView::new(grid.clone());
    target.set_history(diffs.clone(), Some(0)).unwrap();
    assert_eq!(target.apply_next_diff(), Ok(1));
    assert_eq!(target.get(p(3, 2)), DOOR);

    // A view whose contents do not match the history: rejected untouched.
    let mut mismatched = blank();
    let err = mismatched.set_history(diffs, Some(0)).unwrap_err();
    assert!(matches!(err, DiffError::InconsistentHistory { .. }));
    assert!(mismatched.diffs().is_empty());
}

#[test]
fn clearing_history_rebaselines_mid_session() {
    let mut view = blank();
    carve_room(&mut view);
    view.revert_to_previous_diff().unwrap();

    view.clear_history();
    assert_eq!(view.get(p(2, 2)), WALL, "room outline kept");
    assert_eq!(view.get(p(3, 2)), WALL, "door undo kept");

    // Writes resume against the new baseline.
    view.set(p(4, 2), DOOR).unwrap();
    assert_eq!(view.diffs().len(), 1);
    assert_eq!(view.revert_to_previous_diff(), Ok(1));
    assert_eq!(view.get(p(4, 2)), WALL);
}
