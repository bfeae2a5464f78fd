use std::sync::Arc;

use docket_core::board::{RowRef, TaskBoard};
use docket_core::error::MutationError;
use docket_core::filter::{KindFlag, TaskSelector};
use docket_core::mutation::OptimisticCoordinator;
use docket_core::remote::{CallKind, MemoryRemote, RemoteCall};
use docket_core::session::ModalMode;
use docket_core::task::{TaskField, TaskId, TaskKind, TaskRecord, TaskStatus};
use docket_core::toggle::DropdownKind;
use docket_shared::TaskPatch;

fn record(id: &str, kind: TaskKind, entity: &str, status: TaskStatus) -> TaskRecord {
    TaskRecord {
        id: Some(TaskId::store(id)),
        date: "2024-03-01".to_string(),
        time: "09:30".to_string(),
        entity: entity.to_string(),
        task: kind,
        person: "Dana".to_string(),
        notes: String::new(),
        status,
        ..TaskRecord::default()
    }
}

fn three() -> Vec<TaskRecord> {
    vec![
        record("1", TaskKind::Call, "Acme", TaskStatus::Open),
        record("2", TaskKind::Meeting, "Globex", TaskStatus::Closed),
        record("3", TaskKind::VideoCall, "Initech", TaskStatus::Open),
    ]
}

async fn loaded(records: Vec<TaskRecord>) -> (Arc<MemoryRemote>, TaskBoard) {
    let remote = Arc::new(MemoryRemote::with_records(records));
    let mut board = TaskBoard::with_remote(remote.clone());
    board.load().await.expect("load");
    (remote, board)
}

fn ids(tasks: &[TaskRecord]) -> Vec<Option<TaskId>> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

async fn create_task(board: &mut TaskBoard, entity: &str) -> Result<(), MutationError> {
    board.open_for_create();
    let session = board.session_mut();
    session.set_field(TaskField::Entity, entity).expect("entity");
    session.set_field(TaskField::Task, "Meeting").expect("task");
    session.set_field(TaskField::Person, "Sam").expect("person");
    board.submit().await
}

#[tokio::test]
async fn search_matches_status_text() {
    let (_, mut board) =
        loaded(vec![record("1", TaskKind::Call, "Acme", TaskStatus::Open)]).await;
    board.set_query("open");
    assert_eq!(ids(board.view()), vec![Some(TaskId::store("1"))]);
}

#[tokio::test]
async fn call_only_selector_keeps_calls() {
    let (_, mut board) = loaded(vec![
        record("1", TaskKind::Call, "Acme", TaskStatus::Open),
        record("2", TaskKind::Meeting, "Globex", TaskStatus::Open),
    ])
    .await;
    board.set_selector(TaskSelector::only(KindFlag::Call));
    assert_eq!(ids(board.view()), vec![Some(TaskId::store("1"))]);
}

#[tokio::test]
async fn status_change_closes_dropdown_and_patches_store() {
    let (remote, mut board) = loaded(three()).await;
    assert!(board.toggle_dropdown(DropdownKind::Status, 0).expect("row"));
    assert!(board.canonical()[0].status_dropdown_open);

    board
        .set_status(TaskId::store("1"), TaskStatus::Closed)
        .await
        .expect("status change");

    let task = &board.canonical()[0];
    assert_eq!(task.status, TaskStatus::Closed);
    assert!(!task.status_dropdown_open);
    assert!(!board.view()[0].status_dropdown_open);
    assert_eq!(
        remote.calls().last(),
        Some(&RemoteCall::Update {
            id: "1".to_string(),
            patch: TaskPatch::status("Closed"),
        })
    );
    assert_eq!(remote.stored()[0].status, TaskStatus::Closed);
}

#[tokio::test]
async fn failed_status_change_leaves_state_alone() {
    let (remote, mut board) = loaded(three()).await;
    remote.fail(CallKind::Update);

    let err = board
        .toggle_status(RowRef::Position(1))
        .await
        .expect_err("store is failing");
    assert!(err.is_remote());
    assert_eq!(board.canonical()[1].status, TaskStatus::Closed);
    assert!(board.last_error().is_some());

    remote.recover(CallKind::Update);
    board.toggle_status(1).await.expect("recovered");
    assert_eq!(board.canonical()[1].status, TaskStatus::Open);
    assert!(board.last_error().is_none());
}

#[tokio::test]
async fn create_appends_store_id_and_shows_in_view() {
    let (remote, mut board) = loaded(three()).await;

    create_task(&mut board, "Hooli").await.expect("create");

    assert_eq!(board.canonical().len(), 4);
    let created = &board.canonical()[3];
    assert_eq!(created.entity, "Hooli");
    assert_eq!(created.id, Some(TaskId::store("mem-1")));
    assert!(board.view().iter().any(|t| t == created));
    assert!(!board.session().is_open());
    assert_eq!(remote.count_of(CallKind::Create), 1);
}

#[tokio::test]
async fn created_task_hidden_by_filter_stays_canonical() {
    let (_, mut board) = loaded(three()).await;
    board.set_selector(TaskSelector::only(KindFlag::Call));

    create_task(&mut board, "Hooli").await.expect("create");

    assert_eq!(board.canonical().len(), 4);
    assert!(board.view().iter().all(|t| t.entity != "Hooli"));
}

#[tokio::test]
async fn failed_create_keeps_form_open_with_error() {
    let (remote, mut board) = loaded(three()).await;
    remote.fail(CallKind::Create);

    let err = create_task(&mut board, "Hooli").await.expect_err("store is failing");
    assert!(err.is_remote());
    assert_eq!(board.canonical().len(), 3);
    assert_eq!(board.session().mode(), Some(ModalMode::Create));
    assert_eq!(board.session().draft().entity, "Hooli");
    assert!(board.session().error().is_some_and(|e| e.contains("503")));

    remote.recover(CallKind::Create);
    board.submit().await.expect("retry");
    assert_eq!(board.canonical().len(), 4);
    assert!(!board.session().is_open());
}

#[tokio::test]
async fn identical_drafts_are_not_deduplicated() {
    let (remote, mut board) = loaded(vec![]).await;

    board.open_for_create();
    board
        .session_mut()
        .set_field(TaskField::Entity, "Acme")
        .expect("entity");
    let (_, draft) = board.session().begin_submit().expect("open");
    board.submit().await.expect("first");

    // A second click lands after the form closed.
    assert!(matches!(
        board.submit().await,
        Err(MutationError::SessionClosed { .. })
    ));

    board.open_for_create();
    board
        .session_mut()
        .set_field(TaskField::Entity, &draft.entity)
        .expect("entity");
    board.submit().await.expect("second");

    assert_eq!(remote.count_of(CallKind::Create), 2);
    assert_eq!(board.canonical().len(), 2);
}

#[tokio::test]
async fn edit_replaces_record_and_sends_full_patch() {
    let (remote, mut board) = loaded(three()).await;

    board.open_for_edit(TaskId::store("2")).expect("row");
    board
        .session_mut()
        .set_field(TaskField::Entity, "Globex Corp")
        .expect("entity");
    assert_eq!(board.canonical()[1].entity, "Globex");

    board.submit().await.expect("update");
    assert_eq!(board.canonical()[1].entity, "Globex Corp");
    assert_eq!(board.canonical().len(), 3);

    let Some(RemoteCall::Update { id, patch }) = remote.calls().last().cloned() else {
        panic!("expected an update call");
    };
    assert_eq!(id, "2");
    assert_eq!(patch.entity.as_deref(), Some("Globex Corp"));
    assert_eq!(patch.status.as_deref(), Some("Closed"));
}

#[tokio::test]
async fn delete_removes_from_both_collections() {
    let (remote, mut board) = loaded(three()).await;

    board.delete(TaskId::store("2")).await.expect("delete");

    assert_eq!(
        ids(board.canonical()),
        vec![Some(TaskId::store("1")), Some(TaskId::store("3"))]
    );
    assert_eq!(ids(board.view()), ids(board.canonical()));
    assert_eq!(remote.stored().len(), 2);
}

#[tokio::test]
async fn delete_of_unknown_id_is_a_local_noop() {
    let (remote, mut board) = loaded(three()).await;

    board.delete(TaskId::store("404")).await.expect("delete");

    assert_eq!(board.canonical().len(), 3);
    assert_eq!(
        remote.calls().last(),
        Some(&RemoteCall::Delete { id: "404".to_string() })
    );
}

#[tokio::test]
async fn failed_delete_keeps_record() {
    let (remote, mut board) = loaded(three()).await;
    remote.fail(CallKind::Delete);

    assert!(board.delete(0).await.is_err());
    assert_eq!(board.canonical().len(), 3);
    assert_eq!(board.view().len(), 3);
}

#[tokio::test]
async fn duplicate_is_view_only_and_never_reaches_the_store() {
    let (remote, mut board) = loaded(three()).await;
    let calls_before = remote.call_count();

    let id = board.duplicate(0).expect("duplicate");

    assert!(id.is_local());
    assert_eq!(board.canonical().len(), 3);
    assert_eq!(board.view().len(), 4);
    assert_eq!(board.state().position_in_view(&id), Some(3));
    assert!(board.view()[..3].iter().all(|t| t.id.as_ref() != Some(&id)));
    assert!(board.view()[3].same_content(&board.view()[0]));
    assert_eq!(remote.call_count(), calls_before);

    // Re-deriving the view drops the copy.
    board.set_query("");
    assert_eq!(board.view().len(), 3);
}

#[tokio::test]
async fn actions_on_local_copies_fail_before_any_call() {
    let (remote, mut board) = loaded(three()).await;
    let copy = board.duplicate(0).expect("duplicate");
    let calls_before = remote.call_count();

    let err = board
        .set_status(copy.clone(), TaskStatus::Closed)
        .await
        .expect_err("local id");
    assert!(matches!(err, MutationError::MissingIdentity { .. }));

    let err = board.delete(copy).await.expect_err("local id");
    assert!(matches!(err, MutationError::MissingIdentity { .. }));

    assert_eq!(remote.call_count(), calls_before);
    assert_eq!(board.view().len(), 4);
}

#[tokio::test]
async fn optimistic_create_leaves_row_without_identity() {
    let remote = Arc::new(MemoryRemote::with_records(three()));
    let mut board = TaskBoard::new(remote.clone(), Box::new(OptimisticCoordinator));
    board.load().await.expect("load");

    create_task(&mut board, "Hooli").await.expect("create");
    assert_eq!(board.coordinator_name(), "optimistic");
    assert_eq!(board.canonical()[3].id, None);

    let calls_before = remote.call_count();
    let err = board.delete(3).await.expect_err("no identity");
    assert!(matches!(err, MutationError::MissingIdentity { op: "delete" }));

    board.open_notes(3).expect("row");
    board.notes_session_mut().set_notes("follow up");
    let err = board.save_notes().await.expect_err("no identity");
    assert!(matches!(err, MutationError::MissingIdentity { .. }));
    assert!(board.notes_session().is_open());

    assert_eq!(remote.call_count(), calls_before);
    assert_eq!(board.canonical().len(), 4);
}

#[tokio::test]
async fn reconciling_create_without_echo_keeps_draft() {
    let remote = Arc::new(MemoryRemote::with_records(vec![]).without_echo());
    let mut board = TaskBoard::with_remote(remote.clone());
    board.load().await.expect("load");

    create_task(&mut board, "Hooli").await.expect("create");
    assert_eq!(board.canonical()[0].id, None);
    assert_eq!(remote.stored().len(), 1);
}

#[tokio::test]
async fn notes_save_patches_only_notes() {
    let (remote, mut board) = loaded(three()).await;

    board.open_notes(TaskId::store("3")).expect("row");
    assert_eq!(board.notes_session().target(), Some(&TaskId::store("3")));
    board.notes_session_mut().set_notes("send agenda");
    board.save_notes().await.expect("save");

    assert_eq!(board.canonical()[2].notes, "send agenda");
    assert!(!board.notes_session().is_open());
    assert_eq!(
        remote.calls().last(),
        Some(&RemoteCall::Update {
            id: "3".to_string(),
            patch: TaskPatch::notes("send agenda"),
        })
    );
}

#[tokio::test]
async fn dropdowns_toggle_back_and_move_between_rows() {
    let (_, mut board) = loaded(three()).await;

    assert!(board.toggle_dropdown(DropdownKind::Action, 0).expect("row"));
    assert!(!board.toggle_dropdown(DropdownKind::Action, 0).expect("row"));
    assert!(!board.view()[0].action_dropdown_open);

    board.toggle_dropdown(DropdownKind::Action, 0).expect("row");
    board.toggle_dropdown(DropdownKind::Action, 2).expect("row");
    assert!(!board.view()[0].action_dropdown_open);
    assert!(board.view()[2].action_dropdown_open);
    assert!(!board.canonical()[0].action_dropdown_open);
    assert!(board.canonical()[2].action_dropdown_open);

    // Status menus are independent of action menus.
    board.toggle_dropdown(DropdownKind::Status, 1).expect("row");
    assert!(board.view()[2].action_dropdown_open);

    assert!(matches!(
        board.toggle_dropdown(DropdownKind::Status, 9),
        Err(MutationError::NoSuchRow { row: 10 })
    ));
    assert!(!board
        .toggle_dropdown(DropdownKind::Status, TaskId::store("missing"))
        .expect("no-op"));
    assert!(board.view()[1].status_dropdown_open);

    board.close_menus(DropdownKind::Status);
    assert!(board.view().iter().all(|t| !t.status_dropdown_open));
    assert!(board.canonical().iter().all(|t| !t.status_dropdown_open));
    assert!(board.view()[2].action_dropdown_open);
}

#[tokio::test]
async fn failed_load_keeps_board_usable() {
    let remote = Arc::new(MemoryRemote::with_records(three()));
    remote.fail(CallKind::FetchAll);
    let mut board = TaskBoard::with_remote(remote.clone());

    assert!(board.load().await.is_err());
    assert!(board.canonical().is_empty());
    assert!(board.view().is_empty());

    remote.recover(CallKind::FetchAll);
    assert_eq!(board.load().await.expect("reload"), 3);
    assert_eq!(board.view().len(), 3);
}
