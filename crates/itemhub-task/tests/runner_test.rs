//! Integration tests for runner scopes, batches, sequences and hooks.

mod helpers;

use std::sync::Arc;

use itemhub_core::ErrorKind;
use itemhub_core::types::{AccountId, ItemId};
use itemhub_database::TransactionManager;
use itemhub_entity::{CreateItemInput, FOLDER_TYPE};
use itemhub_task::task::kind::{CREATE_ITEM, GET_ITEM};
use itemhub_task::{HookMoment, Task, TaskHook, TaskKind, TaskOutput, TaskStatus, TransactionScope};

use helpers::{HookLog, RecordingHook, TestEnv};

fn create_root(actor: AccountId, name: &str) -> Task {
    Task::new(
        actor,
        TaskKind::CreateItem {
            input: CreateItemInput::new(name, FOLDER_TYPE),
            parent_id: None,
        },
    )
}

#[tokio::test]
async fn test_run_multiple_isolates_failures() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let mut tasks = vec![
        Task::new(
            alice,
            TaskKind::GetItem {
                item_id: ItemId::new(),
            },
        ),
        create_root(alice, "survivor"),
    ];

    let results = env.runner.run_multiple(&mut tasks).await;

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].as_ref().unwrap_err().kind,
        ErrorKind::ItemNotFound
    );
    assert!(results[1].is_ok());
    assert_eq!(tasks[0].status(), TaskStatus::Fail);
    assert_eq!(tasks[1].status(), TaskStatus::Ok);
    assert_eq!(env.item_count().await, 1);
}

#[tokio::test]
async fn test_sequence_feeds_results_forward() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let mut tasks = vec![
        create_root(alice, "parent"),
        Task::deferred(CREATE_ITEM, alice, |previous| {
            let parent = previous[0].as_item().map(|item| item.id);
            Ok(Some(TaskKind::CreateItem {
                input: CreateItemInput::new("child", FOLDER_TYPE),
                parent_id: parent,
            }))
        }),
        Task::deferred(GET_ITEM, alice, |_| Ok(None)),
    ];

    let last = env.runner.run_single_sequence(&mut tasks).await.unwrap();

    let child = last.into_item().unwrap();
    assert_eq!(child.name, "child");
    let parent = tasks[0].result().and_then(TaskOutput::as_item).unwrap();
    assert_eq!(child.parent_id(), Some(parent.id));
    assert!(tasks[2].is_skipped());
    assert_eq!(tasks[2].status(), TaskStatus::New);
    assert_eq!(env.item_count().await, 2);
}

#[tokio::test]
async fn test_sequence_rolls_back_on_failure() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let mut tasks = vec![
        create_root(alice, "doomed"),
        Task::new(
            alice,
            TaskKind::GetItem {
                item_id: ItemId::new(),
            },
        ),
        create_root(alice, "never"),
    ];

    let err = env.runner.run_single_sequence(&mut tasks).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ItemNotFound);
    assert_eq!(tasks[1].status(), TaskStatus::Fail);
    assert_eq!(tasks[2].status(), TaskStatus::New);
    assert_eq!(env.item_count().await, 0);
}

#[tokio::test]
async fn test_skipped_tasks_do_not_run() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let mut tasks = vec![create_root(alice, "skipped").with_skip(true)];

    let last = env.runner.run_single_sequence(&mut tasks).await.unwrap();

    assert_eq!(last, TaskOutput::None);
    assert_eq!(env.item_count().await, 0);
}

#[tokio::test]
async fn test_multiple_sequences_are_independent() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let mut sequences = vec![
        vec![
            create_root(alice, "lost"),
            Task::new(
                alice,
                TaskKind::GetItem {
                    item_id: ItemId::new(),
                },
            ),
        ],
        vec![create_root(alice, "kept")],
    ];

    let results = env.runner.run_multiple_sequences(&mut sequences).await;

    assert!(results[0].is_err());
    assert_eq!(
        results[1].as_ref().unwrap().as_item().map(|i| i.name.as_str()),
        Some("kept")
    );
    assert_eq!(env.item_count().await, 1);
}

#[tokio::test]
async fn test_caller_scope_leaves_commit_to_caller() {
    let env = TestEnv::new();
    let alice = AccountId::new();

    let mut tx = env.db.begin().await.unwrap();
    let mut task = create_root(alice, "uncommitted");
    env.runner
        .run(&mut task, TransactionScope::Caller(tx.as_mut()))
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(env.item_count().await, 0);

    let mut tx = env.db.begin().await.unwrap();
    let mut task = create_root(alice, "committed");
    env.runner
        .run(&mut task, TransactionScope::Caller(tx.as_mut()))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(env.item_count().await, 1);
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let env = TestEnv::new();
    let log = HookLog::new();
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, RecordingHook::new("h1", &log))
        .await;
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, RecordingHook::new("h2", &log))
        .await;
    env.runner
        .set_task_post_hook_handler(CREATE_ITEM, RecordingHook::new("h3", &log))
        .await;

    env.create(AccountId::new(), "hooked", None).await;

    assert_eq!(
        log.entries(),
        vec!["h1:pre:hooked", "h2:pre:hooked", "h3:post:hooked"]
    );
}

#[tokio::test]
async fn test_failing_pre_hook_stops_task() {
    let env = TestEnv::new();
    let log = HookLog::new();
    let second = RecordingHook::new("h2", &log);
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, RecordingHook::failing_on("h1", &log, 1))
        .await;
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, second.clone())
        .await;

    let mut task = create_root(AccountId::new(), "blocked");
    let err = env.runner.run_single(&mut task).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookRejected);
    assert_eq!(task.status(), TaskStatus::Fail);
    assert_eq!(second.calls(), 0);
    assert_eq!(env.item_count().await, 0);
}

#[tokio::test]
async fn test_failing_post_hook_rolls_back_write() {
    let env = TestEnv::new();
    let log = HookLog::new();
    env.runner
        .set_task_post_hook_handler(CREATE_ITEM, RecordingHook::failing_on("post", &log, 1))
        .await;

    let mut task = create_root(AccountId::new(), "rolled-back");
    let err = env.runner.run_single(&mut task).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookRejected);
    assert_eq!(task.status(), TaskStatus::Fail);
    assert_eq!(env.item_count().await, 0);
}

#[tokio::test]
async fn test_unexpected_errors_are_sanitized() {
    let env = TestEnv::new();
    let log = HookLog::new();
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, RecordingHook::crashing("crash", &log))
        .await;

    let err = env
        .run(
            AccountId::new(),
            TaskKind::CreateItem {
                input: CreateItemInput::new("crash", FOLDER_TYPE),
                parent_id: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unexpected);
    assert!(!err.message.contains("crash"));
}

#[tokio::test]
async fn test_unset_hook_is_no_longer_called() {
    let env = TestEnv::new();
    let log = HookLog::new();
    let hook: Arc<dyn TaskHook> = RecordingHook::new("gone", &log);
    env.runner
        .set_task_pre_hook_handler(CREATE_ITEM, hook.clone())
        .await;

    assert!(env.runner.unset_task_pre_hook_handler(CREATE_ITEM, &hook).await);
    assert!(!env.runner.unset_task_pre_hook_handler(CREATE_ITEM, &hook).await);
    assert_eq!(
        env.runner
            .hooks()
            .handler_count(CREATE_ITEM, HookMoment::Pre)
            .await,
        0
    );

    env.create(AccountId::new(), "quiet", None).await;
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_reads_fire_no_hooks() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let root = env.create(alice, "root", None).await;
    let log = HookLog::new();
    env.runner
        .set_task_pre_hook_handler(GET_ITEM, RecordingHook::new("read", &log))
        .await;

    env.run(alice, TaskKind::GetItem { item_id: root.id })
        .await
        .unwrap();

    assert!(log.entries().is_empty());
}
