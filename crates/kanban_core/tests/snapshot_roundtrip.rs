use kanban_core::db::{open_db, open_db_in_memory};
use kanban_core::model::task::STATUS_IN_PROGRESS;
use kanban_core::persist::{StorageKey, EXPORT_VERSION};
use kanban_core::service::kanban_service::PERSISTENCE_ERROR_KEY;
use kanban_core::store::ui_store::ToastKind;
use kanban_core::{
    ColumnDraft, ExportDocument, KanbanConfig, KanbanService, KvError, KvRepository,
    PersistError, Priority, SqliteKvRepository, TaskDraft, TaskPatch,
};
use serde_json::json;

fn populate<R: KvRepository>(service: &mut KanbanService<R>) {
    let board = service.create_board("Website", "relaunch").unwrap();
    service.create_board("Hiring", "").unwrap();
    let tag = service.create_tag("design", "#F472B6").unwrap();
    service
        .create_column(board.id, ColumnDraft::new("Review", "review", "#a855f7"))
        .unwrap();

    let task = service
        .create_task(
            TaskDraft::new(board.id, "Hero section")
                .with_priority(Priority::High)
                .with_due_date(1_800_000_000_000)
                .with_tags(vec![tag]),
        )
        .unwrap();
    service
        .update_task(
            task.id,
            TaskPatch {
                estimate: Some(Some(2.5)),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    service.move_task(task.id, STATUS_IN_PROGRESS).unwrap();
    let subtask = service.add_subtask(task.id, "copy").unwrap().unwrap();
    service.toggle_subtask(task.id, subtask.id).unwrap();
    service
        .create_task(TaskDraft::new(board.id, "Footer").with_status("review"))
        .unwrap();
}

#[test]
fn export_then_import_reproduces_registries() {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("export.json");

    let source_conn = open_db(dir.path().join("source.db")).unwrap();
    let mut source =
        KanbanService::open(SqliteKvRepository::new(&source_conn), &KanbanConfig::default())
            .unwrap();
    populate(&mut source);

    let document = source.export_snapshot().unwrap();
    assert_eq!(document.version, EXPORT_VERSION);
    assert_eq!(document.data.len(), 4);
    assert!(!source.has_pending_writes());
    std::fs::write(&export_path, document.to_json_pretty().unwrap()).unwrap();

    let target_conn = open_db(dir.path().join("target.db")).unwrap();
    let mut target =
        KanbanService::open(SqliteKvRepository::new(&target_conn), &KanbanConfig::default())
            .unwrap();
    let raw = std::fs::read_to_string(&export_path).unwrap();
    target
        .import_snapshot(&ExportDocument::from_json_str(&raw).unwrap())
        .unwrap();

    assert_eq!(target.registries(), source.registries());
    assert_eq!(
        target.ui().toasts().last().map(|toast| toast.kind),
        Some(ToastKind::Success)
    );
    for key in StorageKey::ALL {
        let stored = |repo: &SqliteKvRepository<'_>| -> serde_json::Value {
            serde_json::from_str(&repo.get(key.as_str()).unwrap().unwrap()).unwrap()
        };
        assert_eq!(stored(target.repo()), stored(source.repo()));
    }
}

#[test]
fn export_document_uses_the_documented_shape() {
    let conn = open_db_in_memory().unwrap();
    let mut service =
        KanbanService::open(SqliteKvRepository::new(&conn), &KanbanConfig::default()).unwrap();
    service.create_tag("ops", "#111827").unwrap();

    let document = service.export_snapshot().unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&document.to_json_pretty().unwrap()).unwrap();

    assert_eq!(value["version"], 1);
    assert!(value["exportedAt"].as_i64().unwrap() > 0);
    assert_eq!(value["data"]["kanban-tags"]["tags"][0]["name"], "ops");
    assert!(value["data"].get("kanban-boards").is_none());
}

#[test]
fn import_rebuilds_counters_from_tasks() {
    let conn = open_db_in_memory().unwrap();
    let mut service =
        KanbanService::open(SqliteKvRepository::new(&conn), &KanbanConfig::default()).unwrap();
    let board_id = "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2c01";

    let document: ExportDocument = serde_json::from_value(json!({
        "version": 1,
        "exportedAt": 1_700_000_000_000_i64,
        "data": {
            "kanban-boards": {"boards": [{
                "id": board_id,
                "name": "Imported",
                "description": "",
                "tasksCount": {"total": 99, "completed": 42, "inProgress": 7},
                "createdAt": 1, "updatedAt": 2, "starred": true
            }]},
            "kanban-tasks": {"tasks": [
                {
                    "id": "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2c02",
                    "title": "a", "status": "done", "boardId": board_id,
                    "createdAt": 1, "updatedAt": 1
                },
                {
                    "id": "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2c03",
                    "title": "b", "status": "blocked", "boardId": board_id,
                    "createdAt": 1, "updatedAt": 1
                }
            ]}
        }
    }))
    .unwrap();
    service.import_snapshot(&document).unwrap();

    let board = service.registries().boards.boards()[0].clone();
    assert_eq!(board.tasks_count.total, 2);
    assert_eq!(board.tasks_count.completed, 1);
    assert_eq!(board.tasks_count.in_progress, 1);
    assert!(service.registries().columns.columns().is_empty());
}

#[test]
fn import_validates_before_writing_anything() {
    let conn = open_db_in_memory().unwrap();
    let mut service =
        KanbanService::open(SqliteKvRepository::new(&conn), &KanbanConfig::default()).unwrap();
    service.create_board("Keep me", "").unwrap();
    assert!(service.flush().is_ok());
    let before = service.registries().clone();

    let bad_blob: ExportDocument = serde_json::from_value(json!({
        "version": 1,
        "exportedAt": 0,
        "data": {
            "kanban-tags": {"tags": []},
            "kanban-tasks": {"tasks": "not a list"}
        }
    }))
    .unwrap();
    let err = service.import_snapshot(&bad_blob).unwrap_err();
    assert!(matches!(err, PersistError::Json { ref key, .. } if key == "kanban-tasks"));
    assert!(service.ui().error(PERSISTENCE_ERROR_KEY).is_some());
    assert_eq!(
        service.ui().toasts().last().map(|toast| toast.kind),
        Some(ToastKind::Error)
    );

    let future = ExportDocument {
        version: EXPORT_VERSION + 1,
        ..bad_blob.clone()
    };
    assert!(matches!(
        service.import_snapshot(&future).unwrap_err(),
        PersistError::UnsupportedVersion(2)
    ));

    let mut unknown = bad_blob;
    unknown.data.clear();
    unknown.data.insert("kanban-ui".to_string(), json!({}));
    assert!(matches!(
        service.import_snapshot(&unknown).unwrap_err(),
        PersistError::UnknownKey(_)
    ));

    assert_eq!(service.registries(), &before);
    assert!(service
        .repo()
        .get(StorageKey::Boards.as_str())
        .unwrap()
        .is_some());
    assert!(service.repo().get(StorageKey::Tags.as_str()).unwrap().is_none());
}

#[test]
fn import_over_quota_leaves_storage_untouched() {
    let conn = open_db_in_memory().unwrap();
    let config = KanbanConfig {
        storage_quota_bytes: Some(3_000),
        ..KanbanConfig::default()
    };
    let repo = SqliteKvRepository::with_quota(&conn, config.storage_quota_bytes);
    let mut service = KanbanService::open(repo, &config).unwrap();
    service.create_tag("ops", "#111827").unwrap();
    service.create_board("Keep me", "").unwrap();
    assert!(service.flush().is_ok());
    let before = service.registries().clone();
    let stored_before: Vec<_> = StorageKey::ALL
        .iter()
        .map(|key| service.repo().get(key.as_str()).unwrap())
        .collect();

    let oversized: ExportDocument = serde_json::from_value(json!({
        "version": 1,
        "exportedAt": 0,
        "data": {
            "kanban-boards": {"boards": [{
                "id": "3a3c1f0e-1d7e-4c55-8f7e-8a1f2b9c4d10",
                "name": "Huge",
                "description": "x".repeat(5_000),
                "tasksCount": {"total": 0, "completed": 0, "inProgress": 0},
                "createdAt": 1, "updatedAt": 1, "starred": false
            }]}
        }
    }))
    .unwrap();
    let err = service.import_snapshot(&oversized).unwrap_err();
    assert!(matches!(err, PersistError::Kv(KvError::QuotaExceeded { .. })));

    let stored_after: Vec<_> = StorageKey::ALL
        .iter()
        .map(|key| service.repo().get(key.as_str()).unwrap())
        .collect();
    assert_eq!(stored_after, stored_before);
    assert!(service
        .repo()
        .get(StorageKey::Tags.as_str())
        .unwrap()
        .is_some());
    assert!(service
        .repo()
        .get(StorageKey::Columns.as_str())
        .unwrap()
        .is_some());
    assert_eq!(service.registries(), &before);

    // Every key is queued again so memory reaches storage on the next flush.
    assert!(service.has_pending_writes());
    let report = service.flush();
    assert!(report.is_ok());
    assert_eq!(report.written, StorageKey::ALL.to_vec());

    let reopened = KanbanService::open(
        SqliteKvRepository::with_quota(&conn, config.storage_quota_bytes),
        &config,
    )
    .unwrap();
    assert_eq!(reopened.registries(), &before);
}

#[test]
fn import_rejects_records_for_missing_boards() {
    let conn = open_db_in_memory().unwrap();
    let mut service =
        KanbanService::open(SqliteKvRepository::new(&conn), &KanbanConfig::default()).unwrap();
    service.create_board("Keep me", "").unwrap();
    assert!(service.flush().is_ok());
    let before = service.registries().clone();

    let stray_task = "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2d01";
    let tasks_only: ExportDocument = serde_json::from_value(json!({
        "version": 1,
        "exportedAt": 0,
        "data": {
            "kanban-tasks": {"tasks": [{
                "id": stray_task,
                "title": "lost", "status": "todo",
                "boardId": "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2cff",
                "createdAt": 1, "updatedAt": 1
            }]}
        }
    }))
    .unwrap();
    let err = service.import_snapshot(&tasks_only).unwrap_err();
    let PersistError::OrphanedRecords(ids) = &err else {
        panic!("expected orphaned records, got {err:?}");
    };
    assert_eq!(ids, &vec![stray_task.parse::<uuid::Uuid>().unwrap()]);

    let board_id = "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2e01";
    let stray_column = "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2e02";
    let mismatched: ExportDocument = serde_json::from_value(json!({
        "version": 1,
        "exportedAt": 0,
        "data": {
            "kanban-boards": {"boards": [{
                "id": board_id,
                "name": "Imported", "description": "",
                "tasksCount": {"total": 0, "completed": 0, "inProgress": 0},
                "createdAt": 1, "updatedAt": 1, "starred": false
            }]},
            "kanban-columns": {"columns": [{
                "id": stray_column,
                "title": "Elsewhere", "status": "todo", "color": "#64748b",
                "order": 0, "isFixed": true,
                "boardId": "0f6f3a1e-7c2b-4d38-9a0b-5b8f6b1d2eff"
            }]}
        }
    }))
    .unwrap();
    assert!(matches!(
        service.import_snapshot(&mismatched).unwrap_err(),
        PersistError::OrphanedRecords(ids) if ids == vec![stray_column.parse::<uuid::Uuid>().unwrap()]
    ));

    assert_eq!(service.registries(), &before);
    assert!(service.repo().get(StorageKey::Boards.as_str()).unwrap().is_some());
    assert!(service.repo().get(StorageKey::Tasks.as_str()).unwrap().is_none());
    assert!(service
        .ui()
        .error(PERSISTENCE_ERROR_KEY)
        .is_some_and(|message| message.contains("missing")));
}
