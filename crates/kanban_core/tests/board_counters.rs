use kanban_core::model::board::CountDelta;
use kanban_core::model::task::{STATUS_ARCHIVE, STATUS_DONE, STATUS_IN_PROGRESS};
use kanban_core::{BoardId, Registries, TaskCounts, TaskDraft, TaskPatch};

fn assert_counters_match(registries: &Registries) {
    for board in registries.boards.boards() {
        let expected = TaskCounts::from_statuses(
            registries
                .tasks
                .for_board(board.id)
                .map(|task| task.status.as_str()),
        );
        assert_eq!(
            board.tasks_count, expected,
            "counters drifted for board {}",
            board.id
        );
    }
}

fn board(registries: &mut Registries, name: &str) -> BoardId {
    let Registries {
        boards, columns, ..
    } = registries;
    boards.add_board(columns, name, "").unwrap().id
}

#[test]
fn counters_follow_every_task_mutation() {
    let mut registries = Registries::new();
    let alpha = board(&mut registries, "Alpha");
    let beta = board(&mut registries, "Beta");
    let Registries { boards, tasks, .. } = &mut registries;

    let first = tasks.add_task(boards, TaskDraft::new(alpha, "write")).unwrap();
    let second = tasks
        .add_task(boards, TaskDraft::new(alpha, "review").with_status(STATUS_IN_PROGRESS))
        .unwrap();
    tasks
        .add_task(boards, TaskDraft::new(beta, "ship").with_status(STATUS_DONE))
        .unwrap();
    assert_counters_match(&registries);

    let Registries { boards, tasks, .. } = &mut registries;
    tasks.move_task(boards, first.id, STATUS_DONE).unwrap();
    tasks.move_task(boards, second.id, "qa").unwrap();
    tasks
        .update_task(
            boards,
            second.id,
            TaskPatch {
                title: Some("review again".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_counters_match(&registries);

    let alpha_counts = registries.boards.get(alpha).unwrap().tasks_count;
    assert_eq!(
        alpha_counts,
        TaskCounts {
            total: 2,
            completed: 1,
            in_progress: 1,
        }
    );

    let Registries { boards, tasks, .. } = &mut registries;
    tasks.delete_task(boards, first.id).unwrap();
    assert!(tasks.delete_task(boards, first.id).is_none());
    assert_counters_match(&registries);
    assert_eq!(registries.boards.get(alpha).unwrap().tasks_count.total, 1);
}

#[test]
fn archive_keeps_total_and_leaves_progress_counters() {
    let mut registries = Registries::new();
    let alpha = board(&mut registries, "Alpha");
    let Registries { boards, tasks, .. } = &mut registries;

    let task = tasks
        .add_task(boards, TaskDraft::new(alpha, "done soon").with_status(STATUS_DONE))
        .unwrap();
    tasks.move_task(boards, task.id, STATUS_ARCHIVE).unwrap();

    let counts = registries.boards.get(alpha).unwrap().tasks_count;
    assert_eq!(counts.total, 1);
    assert_eq!(counts.completed, 0);
    assert_eq!(counts.in_progress, 0);
    assert_counters_match(&registries);
}

#[test]
fn completed_at_tracks_done_transitions() {
    let mut registries = Registries::new();
    let alpha = board(&mut registries, "Alpha");
    let Registries { boards, tasks, .. } = &mut registries;

    let task = tasks.add_task(boards, TaskDraft::new(alpha, "flip")).unwrap();
    assert_eq!(task.status_history.len(), 1);
    assert_eq!(task.status_history[0].from, None);

    let done = tasks.move_task(boards, task.id, STATUS_DONE).unwrap().unwrap();
    assert!(done.completed_at.is_some());
    let reopened = tasks
        .move_task(boards, task.id, STATUS_IN_PROGRESS)
        .unwrap()
        .unwrap();
    assert_eq!(reopened.completed_at, None);
    assert_eq!(reopened.status_history.len(), 3);
    assert_eq!(reopened.status_history[2].from.as_deref(), Some(STATUS_DONE));

    let unchanged = tasks
        .move_task(boards, task.id, STATUS_IN_PROGRESS)
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status_history.len(), 3);
}

#[test]
fn counters_never_go_negative() {
    let mut registries = Registries::new();
    let alpha = board(&mut registries, "Alpha");

    assert!(registries.boards.apply_counter_delta(
        alpha,
        CountDelta {
            total: -10,
            completed: -3,
            in_progress: -7,
        },
    ));
    assert_eq!(
        registries.boards.get(alpha).unwrap().tasks_count,
        TaskCounts::default()
    );
    assert!(!registries
        .boards
        .apply_counter_delta(uuid::Uuid::new_v4(), CountDelta::for_status(STATUS_DONE)));
}

#[test]
fn deleting_a_board_cascades_synchronously() {
    let mut registries = Registries::new();
    let alpha = board(&mut registries, "Alpha");
    let beta = board(&mut registries, "Beta");
    let Registries {
        boards,
        tasks,
        columns,
        ..
    } = &mut registries;
    tasks.add_task(boards, TaskDraft::new(alpha, "one")).unwrap();
    tasks.add_task(boards, TaskDraft::new(alpha, "two")).unwrap();
    let survivor = tasks.add_task(boards, TaskDraft::new(beta, "keep")).unwrap();

    let deletion = boards.delete_board(alpha, tasks, columns).unwrap();
    assert_eq!(deletion.board.id, alpha);
    assert_eq!(deletion.removed_tasks, 2);
    assert_eq!(deletion.removed_columns, 3);

    assert!(registries.orphan_ids().is_empty());
    assert_eq!(registries.tasks.tasks().len(), 1);
    assert_eq!(registries.tasks.tasks()[0].id, survivor.id);
    assert_eq!(registries.columns.for_board(alpha).len(), 0);
    assert_eq!(registries.columns.for_board(beta).len(), 3);
    assert_counters_match(&registries);
}

#[test]
fn adding_to_an_unknown_board_is_rejected() {
    let mut registries = Registries::new();
    let Registries { boards, tasks, .. } = &mut registries;

    let err = tasks
        .add_task(boards, TaskDraft::new(uuid::Uuid::new_v4(), "lost"))
        .unwrap_err();
    assert!(matches!(err, kanban_core::StoreError::BoardNotFound(_)));
    assert!(registries.tasks.tasks().is_empty());
}
