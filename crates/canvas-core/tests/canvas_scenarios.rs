// crates/canvas-core/tests/canvas_scenarios.rs
use canvas_core::{CanvasError, CanvasState, Color, LoadOutcome, Position};

fn p(i: u16) -> Position {
    Position::new(i)
}

#[test]
fn edit_updates_cell_and_pending_diff() {
    // 2x2 canvas, blank; paint cell 0.
    let mut state = CanvasState::new(2, 2).unwrap();
    state.apply_edit(p(0), Color::Green).unwrap();

    assert_eq!(state.snapshot_bytes(), vec![1, 0, 0, 0]);
    assert_eq!(state.pending().len(), 1);
    assert_eq!(state.pending().get(p(0)), Some(Color::Green));
}

#[test]
fn every_valid_position_accepts_every_color() {
    let mut state = CanvasState::new(5, 3).unwrap();

    for i in 0..state.size() {
        let pos = Position::from_index(i).unwrap();
        let color = Color::ALL[i % Color::ALL.len()];
        state.apply_edit(pos, color).unwrap();

        assert_eq!(state.color_at(pos), Some(color));
        assert_eq!(state.pending().get(pos), Some(color));
    }
    assert_eq!(state.pending().len(), 15);
}

#[test]
fn second_drain_without_edits_is_empty() {
    let mut state = CanvasState::new(4, 4).unwrap();
    state.apply_edit(p(3), Color::Red).unwrap();
    state.apply_edit(p(9), Color::Blue).unwrap();

    let first = state.drain_diff();
    assert_eq!(first.len(), 2);

    let second = state.drain_diff();
    assert!(second.is_empty());

    // Drained changes stay on the canvas.
    assert_eq!(state.color_at(p(3)), Some(Color::Red));
    assert_eq!(state.color_at(p(9)), Some(Color::Blue));
}

#[test]
fn same_cell_twice_in_one_window_keeps_the_later_color() {
    let mut state = CanvasState::new(2, 2).unwrap();
    state.apply_edit(p(2), Color::Yellow).unwrap();
    state.apply_edit(p(2), Color::Black).unwrap();

    assert_eq!(state.color_at(p(2)), Some(Color::Black));

    let diff = state.drain_diff();
    assert_eq!(diff.into_changes(), vec![(p(2), Color::Black)]);
}

#[test]
fn out_of_range_edit_is_rejected_without_side_effects() {
    let mut state = CanvasState::new(2, 2).unwrap();
    state.apply_edit(p(1), Color::Pink).unwrap();

    let err = state.apply_edit(p(4), Color::Red).unwrap_err();
    assert_eq!(
        err,
        CanvasError::OutOfRange {
            position: p(4),
            size: 4
        }
    );

    assert_eq!(state.snapshot_bytes(), vec![0, 8, 0, 0]);
    assert_eq!(state.pending().len(), 1);
}

#[test]
fn edits_after_a_drain_go_into_the_next_batch() {
    let mut state = CanvasState::new(3, 3).unwrap();
    state.apply_edit(p(0), Color::Red).unwrap();
    let first = state.drain_diff();

    state.apply_edit(p(1), Color::Orange).unwrap();
    let second = state.drain_diff();

    assert_eq!(first.into_changes(), vec![(p(0), Color::Red)]);
    assert_eq!(second.into_changes(), vec![(p(1), Color::Orange)]);
}

#[test]
fn snapshot_survives_a_persist_and_reload() {
    let mut state = CanvasState::new(3, 2).unwrap();
    state.apply_edit(p(0), Color::Purple).unwrap();
    state.apply_edit(p(5), Color::LightBlue).unwrap();

    let blob = state.snapshot_bytes();
    let (restored, outcome) = CanvasState::load(3, 2, Some(&blob)).unwrap();

    assert_eq!(outcome, LoadOutcome::Restored);
    assert_eq!(restored.snapshot(), state.snapshot());
    assert!(restored.pending().is_empty());
}

#[test]
fn reload_with_different_dimensions_starts_blank() {
    let state = CanvasState::new(3, 2).unwrap();
    let blob = state.snapshot_bytes();

    let (restored, outcome) = CanvasState::load(4, 4, Some(&blob)).unwrap();
    assert_eq!(outcome, LoadOutcome::Corrupt);
    assert_eq!(restored.snapshot_bytes(), vec![0; 16]);
}
