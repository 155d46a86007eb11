//! Integration tests for timeline step operations.
//!
//! Tests cover:
//! - Appending steps at the end of the order
//! - Deleting steps without touching the other positions
//! - Partial edits, clearing fields and date validation
//! - Keeping exactly one current step
//! - Overdue detection on stored steps

mod common;

use common::*;
use time::macros::date;
use uuid::Uuid;

#[tokio::test]
async fn test_add_step_appends_at_end() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;

    let step = board.add_step(id, &make_step("Inspection", StepStatus::Pending)).await?;
    assert_eq!(step.order_index, 5);
    assert_eq!(step.project_id, id);
    assert!(!step.is_current);
    assert_eq!(step.top_annotation, None);
    assert_eq!(step.start_date, None);

    let timeline = board.load(id).await?;
    assert_eq!(timeline.steps.last().map(|s| s.id), Some(step.id));

    Ok(())
}

#[tokio::test]
async fn test_add_then_delete_restores_order() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;
    let before = board.load(id).await?.steps;

    let step = board.add_step(id, &make_step("Extra", StepStatus::Pending)).await?;
    assert_eq!(board.load(id).await?.steps.len(), before.len() + 1);

    board.delete_step(id, step.id).await?;
    let after = board.load(id).await?.steps;
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.order_index, new.order_index);
    }

    Ok(())
}

#[tokio::test]
async fn test_delete_leaves_gaps() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let timeline = board.create_project(make_new_project("Plaza")).await?;
    let id = timeline.project.id;

    board.delete_step(id, timeline.steps[1].id).await?;
    let orders: Vec<i64> = board.load(id).await?.steps.iter().map(|s| s.order_index).collect();
    assert_eq!(orders, [1, 3, 4]);

    let step = board.add_step(id, &make_step("Next", StepStatus::Pending)).await?;
    assert_eq!(step.order_index, 5);

    Ok(())
}

#[tokio::test]
async fn test_add_step_rejects_blank_title() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;

    let result = board.add_step(id, &make_step("  ", StepStatus::Pending)).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::EmptyTitle))
    ));
    assert_eq!(board.load(id).await?.steps.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_add_step_to_missing_project() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let result = board
        .add_step(Uuid::new_v4(), &make_step("Orphan", StepStatus::Pending))
        .await;
    assert!(matches!(result, Err(Error::NotFound { entity: "Project", .. })));
    Ok(())
}

#[tokio::test]
async fn test_edit_step_partial_update() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;
    let step = board
        .add_step(
            id,
            &NewStep {
                top_annotation: Some("Requested".to_string()),
                responsible_agency: Some("City Hall".to_string()),
                ..make_dated_step("Permit", Some(date!(2024 - 03 - 01)), Some(date!(2024 - 04 - 01)))
            },
        )
        .await?;

    let update = StepUpdate {
        status: Some(StepStatus::InProgress),
        top_annotation: Some(None),
        responsible_sector: Some(Some("Legal".to_string())),
        ..Default::default()
    };
    let edited = board.edit_step(id, step.id, &update).await?;

    assert_eq!(edited.title, "Permit");
    assert_eq!(edited.status, StepStatus::InProgress);
    assert_eq!(edited.top_annotation, None);
    assert_eq!(edited.responsible_agency.as_deref(), Some("City Hall"));
    assert_eq!(edited.responsible_sector.as_deref(), Some("Legal"));
    assert_eq!(edited.start_date, Some(date!(2024 - 03 - 01)));
    assert_eq!(edited.order_index, step.order_index);

    Ok(())
}

#[tokio::test]
async fn test_edit_rejects_forecast_before_stored_start() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;
    let step = board
        .add_step(id, &make_dated_step("Permit", Some(date!(2024 - 06 - 01)), None))
        .await?;

    let update = StepUpdate {
        title: Some("Renamed".to_string()),
        completion_forecast: Some(Some(date!(2024 - 05 - 01))),
        ..Default::default()
    };
    let result = board.edit_step(id, step.id, &update).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::ForecastBeforeStart { .. }))
    ));

    let stored = board
        .repo()
        .get_project_repo(id)
        .await?
        .get_step_by_id(step.id)
        .await?
        .expect("step still stored");
    assert_eq!(stored.title, "Permit");
    assert_eq!(stored.completion_forecast, None);

    Ok(())
}

#[tokio::test]
async fn test_add_rejects_forecast_before_start() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;

    let result = board
        .add_step(
            id,
            &make_dated_step("Backwards", Some(date!(2024 - 06 - 01)), Some(date!(2024 - 01 - 01))),
        )
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(board.load(id).await?.steps.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_set_current_clears_other_steps() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let timeline = board.create_project(make_new_project("Plaza")).await?;
    let id = timeline.project.id;
    let execution = timeline.steps[2].id;

    board.set_current_step(id, execution).await?;

    let timeline = board.load(id).await?;
    let current: Vec<_> = timeline.steps.iter().filter(|s| s.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, execution);
    assert_eq!(timeline.current_index(), Some(2));

    let missing = board.set_current_step(id, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(Error::NotFound { entity: "Step", .. })));
    assert_eq!(board.load(id).await?.current_step().map(|s| s.id), Some(execution));

    Ok(())
}

#[tokio::test]
async fn test_new_and_edited_current_steps_stay_unique() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let timeline = board.create_project(make_new_project("Plaza")).await?;
    let id = timeline.project.id;

    let added = board
        .add_step(
            id,
            &NewStep {
                is_current: true,
                ..make_step("Handover", StepStatus::InProgress)
            },
        )
        .await?;
    let current: Vec<_> = board.load(id).await?.steps.into_iter().filter(|s| s.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, added.id);

    let first = timeline.steps[0].id;
    board
        .edit_step(
            id,
            first,
            &StepUpdate {
                is_current: Some(true),
                ..Default::default()
            },
        )
        .await?;
    let current: Vec<_> = board.load(id).await?.steps.into_iter().filter(|s| s.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, first);

    Ok(())
}

#[tokio::test]
async fn test_overdue_until_completed() -> anyhow::Result<()> {
    let (board, _temp_dir) = create_test_board().await;
    let id = board.create_project(make_new_project("Plaza")).await?.project.id;
    let step = board
        .add_step(id, &make_dated_step("Late", None, Some(date!(2024 - 01 - 10))))
        .await?;
    let today = date!(2024 - 02 - 01);

    let timeline = board.load(id).await?;
    let overdue: Vec<_> = timeline.overdue_steps(today).map(|s| s.id).collect();
    assert_eq!(overdue, [step.id]);

    board
        .edit_step(
            id,
            step.id,
            &StepUpdate {
                status: Some(StepStatus::Completed),
                ..Default::default()
            },
        )
        .await?;
    let timeline = board.load(id).await?;
    assert_eq!(timeline.overdue_steps(today).count(), 0);

    Ok(())
}
