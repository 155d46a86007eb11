#![allow(dead_code)]

use tempfile::TempDir;
use time::Date;
use uuid::Uuid;
use worksboard::core::db::{BoardDb, NewProject, NewStep, StepStatus, TimelineStep};
use worksboard::{Board, Config, ReorderMode};

/// Creates a BoardDb backed by a database file in a fresh temp directory.
/// Returns both the database and the temp directory (which must be kept alive).
pub async fn create_test_db() -> (BoardDb, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let db = BoardDb::new(dir.path().join("board.db"))
        .await
        .expect("Failed to create test database");
    (db, dir)
}

/// Board with the default configuration.
pub async fn create_test_board() -> (Board<BoardDb>, TempDir) {
    create_test_board_with(Config::default()).await
}

pub async fn create_test_board_with(mut config: Config) -> (Board<BoardDb>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    config.database.path = dir.path().join("board.db");
    let db = BoardDb::with_config(&config.database)
        .await
        .expect("Failed to create test database");
    (Board::new(db, config), dir)
}

pub async fn create_board_with_mode(mode: ReorderMode) -> (Board<BoardDb>, TempDir) {
    let mut config = Config::default();
    config.reorder.mode = mode;
    create_test_board_with(config).await
}

pub fn make_new_project(title: &str) -> NewProject {
    NewProject {
        title: title.to_string(),
        description: format!("{} description", title),
        ..Default::default()
    }
}

pub fn make_step(title: &str, status: StepStatus) -> NewStep {
    NewStep {
        title: title.to_string(),
        status,
        ..Default::default()
    }
}

pub fn make_dated_step(title: &str, start: Option<Date>, forecast: Option<Date>) -> NewStep {
    NewStep {
        start_date: start,
        completion_forecast: forecast,
        ..make_step(title, StepStatus::Pending)
    }
}

/// Project whose timeline is A (pending), B (in progress, current), C (completed).
pub async fn create_abc_project(board: &Board<BoardDb>) -> (Uuid, Vec<TimelineStep>) {
    let project = NewProject {
        steps: vec![
            make_step("A", StepStatus::Pending),
            NewStep {
                is_current: true,
                ..make_step("B", StepStatus::InProgress)
            },
            make_step("C", StepStatus::Completed),
        ],
        ..make_new_project("Scenario")
    };
    let timeline = board
        .create_project(project)
        .await
        .expect("Failed to create scenario project");
    (timeline.project.id, timeline.steps)
}

pub fn titles(steps: &[TimelineStep]) -> Vec<&str> {
    steps.iter().map(|s| s.title.as_str()).collect()
}
