//! Integration tests for step reordering.
//!
//! Tests cover:
//! - Every permutation of a timeline loads back in the requested order
//! - Drag and drop moves
//! - Duplicate and unknown ids
//! - Best-effort versus atomic behaviour on partial failure

mod common;

use common::*;
use uuid::Uuid;

fn permutations(ids: &[Uuid]) -> Vec<Vec<Uuid>> {
    if ids.len() <= 1 {
        return vec![ids.to_vec()];
    }
    let mut all = Vec::new();
    for (i, first) in ids.iter().enumerate() {
        let mut rest = ids.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, *first);
            all.push(tail);
        }
    }
    all
}

async fn assert_every_permutation(mode: ReorderMode) -> anyhow::Result<()> {
    let (board, _temp_dir) = create_board_with_mode(mode).await;
    let timeline = board.create_project(make_new_project("Permutations")).await?;
    let id = timeline.project.id;

    for order in permutations(&timeline.step_ids()) {
        board.reorder_steps(id, &order).await?;
        let loaded = board.load(id).await?;
        assert_eq!(loaded.step_ids(), order);
        let positions: Vec<i64> = loaded.steps.iter().map(|s| s.order_index).collect();
        assert_eq!(positions, [1, 2, 3, 4]);
    }
    Ok(())
}

#[tokio::test]
async fn test_every_permutation_atomic() -> anyhow::Result<()> {
    assert_every_permutation(ReorderMode::Atomic).await
}

#[tokio::test]
async fn test_every_permutation_best_effort() -> anyhow::Result<()> {
    assert_every_permutation(ReorderMode::BestEffort).await
}

#[tokio::test]
async fn test_reorder_scenario_cab() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let (id, steps) = create_abc_project(&board).await;
    let (a, b, c) = (&steps[0], &steps[1], &steps[2]);
    assert_eq!(titles(&steps), ["A", "B", "C"]);

    let timeline = board.reorder_steps(id, &[c.id, a.id, b.id]).await?;

    assert_eq!(titles(&timeline.steps), ["C", "A", "B"]);
    let orders: Vec<(&str, i64)> = timeline
        .steps
        .iter()
        .map(|s| (s.title.as_str(), s.order_index))
        .collect();
    assert_eq!(orders, [("C", 1), ("A", 2), ("B", 3)]);
    assert_eq!(timeline.current_step().map(|s| s.id), Some(b.id));
    assert_eq!(timeline.steps[2].status, StepStatus::InProgress);

    Ok(())
}

#[tokio::test]
async fn test_move_step_like_drag_and_drop() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let (id, _steps) = create_abc_project(&board).await;

    let timeline = board.move_step(id, 0, 2).await?;
    assert_eq!(titles(&timeline.steps), ["B", "C", "A"]);

    let timeline = board.move_step(id, 2, 0).await?;
    assert_eq!(titles(&timeline.steps), ["A", "B", "C"]);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_ids_are_rejected_before_writing() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let (id, steps) = create_abc_project(&board).await;

    let result = board
        .reorder_steps(id, &[steps[2].id, steps[0].id, steps[2].id])
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::DuplicateStep(dup))) if dup == steps[2].id
    ));
    assert_eq!(titles(&board.load(id).await?.steps), ["A", "B", "C"]);

    Ok(())
}

#[tokio::test]
async fn test_best_effort_reports_unknown_id_and_keeps_the_rest() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_board_with_mode(ReorderMode::BestEffort).await;
    let (id, steps) = create_abc_project(&board).await;
    let unknown = Uuid::new_v4();

    let result = board
        .reorder_steps(id, &[steps[2].id, unknown, steps[1].id, steps[0].id])
        .await;
    match result {
        Err(Error::ReorderFailed { failed }) => assert_eq!(failed, [unknown]),
        other => panic!("expected ReorderFailed, got {:?}", other.map(|t| t.step_ids())),
    }

    let loaded = board.load(id).await?;
    let orders: Vec<(&str, i64)> = loaded
        .steps
        .iter()
        .map(|s| (s.title.as_str(), s.order_index))
        .collect();
    assert_eq!(orders, [("C", 1), ("B", 3), ("A", 4)]);

    Ok(())
}

#[tokio::test]
async fn test_atomic_rolls_back_on_unknown_id() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_board_with_mode(ReorderMode::Atomic).await;
    let (id, steps) = create_abc_project(&board).await;
    let unknown = Uuid::new_v4();

    let result = board
        .reorder_steps(id, &[steps[2].id, unknown, steps[1].id, steps[0].id])
        .await;
    assert!(matches!(result, Err(Error::ReorderFailed { ref failed }) if failed == &[unknown]));

    let loaded = board.load(id).await?;
    let orders: Vec<(&str, i64)> = loaded
        .steps
        .iter()
        .map(|s| (s.title.as_str(), s.order_index))
        .collect();
    assert_eq!(orders, [("A", 1), ("B", 2), ("C", 3)]);

    Ok(())
}

#[tokio::test]
async fn test_step_of_another_project_counts_as_failed() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_board_with_mode(ReorderMode::BestEffort).await;
    let (id, steps) = create_abc_project(&board).await;
    let other = board.create_project(make_new_project("Other")).await?;
    let foreign = other.steps[0].id;

    let result = board.reorder_steps(id, &[foreign, steps[0].id]).await;
    assert!(matches!(result, Err(Error::ReorderFailed { ref failed }) if failed == &[foreign]));

    let untouched = board.load(other.project.id).await?;
    assert_eq!(untouched.steps[0].id, foreign);
    assert_eq!(untouched.steps[0].order_index, 1);

    Ok(())
}

#[tokio::test]
async fn test_omitted_steps_keep_stale_positions() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let (id, steps) = create_abc_project(&board).await;

    let timeline = board.reorder_steps(id, &[steps[2].id, steps[1].id]).await?;

    let orders: Vec<(&str, i64)> = timeline
        .steps
        .iter()
        .map(|s| (s.title.as_str(), s.order_index))
        .collect();
    // A still holds position 1, sharing it with C.
    assert_eq!(orders.len(), 3);
    assert!(orders.contains(&("A", 1)));
    assert!(orders.contains(&("C", 1)));
    assert!(orders.contains(&("B", 2)));

    Ok(())
}
