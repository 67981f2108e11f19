//! Integration tests for deleting items.

mod helpers;

use itemhub_core::ErrorKind;
use itemhub_core::config::LimitsConfig;
use itemhub_core::types::AccountId;
use itemhub_entity::PermissionLevel;
use itemhub_task::task::kind::DELETE_ITEM;
use itemhub_task::{Task, TaskKind, TaskStatus};

use helpers::{HookLog, RecordingHook, TestEnv};

#[tokio::test]
async fn test_delete_removes_subtree_deepest_first() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let bob = AccountId::new();
    let root = env.create(alice, "root", None).await;
    let a = env.create(alice, "a", Some(&root)).await;
    env.create(alice, "b", Some(&a)).await;
    let keep = env.create(alice, "keep", None).await;
    env.share(alice, &a, bob, PermissionLevel::Read).await;

    let log = HookLog::new();
    env.runner
        .set_task_pre_hook_handler(DELETE_ITEM, RecordingHook::new("pre", &log))
        .await;

    let deleted = env
        .run(alice, TaskKind::DeleteItem { item_id: root.id })
        .await
        .unwrap()
        .into_item()
        .unwrap();

    assert_eq!(deleted.id, root.id);
    assert_eq!(log.entries(), vec!["pre:pre:b", "pre:pre:a", "pre:pre:root"]);
    assert_eq!(env.item_count().await, 1);
    assert!(env.item(keep.id).await.is_some());
    assert!(env.memberships_of(bob).await.is_empty());
    assert_eq!(env.memberships_of(alice).await.len(), 1);
}

#[tokio::test]
async fn test_delete_is_all_or_nothing() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let root = env.create(alice, "root", None).await;
    let a = env.create(alice, "a", Some(&root)).await;
    env.create(alice, "b", Some(&a)).await;

    let log = HookLog::new();
    env.runner
        .set_task_post_hook_handler(DELETE_ITEM, RecordingHook::failing_on("post", &log, 2))
        .await;

    let mut task = Task::new(alice, TaskKind::DeleteItem { item_id: root.id });
    let err = env.runner.run_single(&mut task).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HookRejected);
    assert_eq!(task.status(), TaskStatus::Fail);
    assert_eq!(log.entries().len(), 2);
    assert_eq!(env.item_count().await, 3);
}

#[tokio::test]
async fn test_partial_delete_keeps_nodes_removed_before_failure() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let root = env.create(alice, "root", None).await;
    let a = env.create(alice, "a", Some(&root)).await;
    let b = env.create(alice, "b", Some(&a)).await;

    let log = HookLog::new();
    env.runner
        .set_task_post_hook_handler(DELETE_ITEM, RecordingHook::failing_on("post", &log, 2))
        .await;

    let mut task =
        Task::new(alice, TaskKind::DeleteItem { item_id: root.id }).with_partial_subtasks(true);
    env.runner.run_single(&mut task).await.unwrap();

    assert_eq!(task.status(), TaskStatus::Ok);
    assert_eq!(log.entries(), vec!["post:post:b", "post:post:a"]);
    assert_eq!(env.item_count().await, 2);
    assert!(env.item(b.id).await.is_none());
    assert!(env.item(a.id).await.is_some());
    assert!(env.item(root.id).await.is_some());
}

#[tokio::test]
async fn test_large_delete_runs_as_one_mutation() {
    let env = TestEnv::with_limits(LimitsConfig {
        delete_subtask_threshold: 1,
        ..LimitsConfig::default()
    });
    let alice = AccountId::new();
    let bob = AccountId::new();
    let root = env.create(alice, "root", None).await;
    let a = env.create(alice, "a", Some(&root)).await;
    let b = env.create(alice, "b", Some(&a)).await;
    env.share(alice, &b, bob, PermissionLevel::Write).await;

    let log = HookLog::new();
    env.runner
        .set_task_pre_hook_handler(DELETE_ITEM, RecordingHook::new("pre", &log))
        .await;

    env.run(alice, TaskKind::DeleteItem { item_id: root.id })
        .await
        .unwrap();

    assert_eq!(log.entries(), vec!["pre:pre:root"]);
    assert_eq!(env.item_count().await, 0);
    assert!(env.memberships_of(bob).await.is_empty());
}

#[tokio::test]
async fn test_delete_enforces_descendant_limit() {
    let env = TestEnv::with_limits(LimitsConfig {
        max_descendants_for_delete: 1,
        ..LimitsConfig::default()
    });
    let alice = AccountId::new();
    let root = env.create(alice, "root", None).await;
    env.create(alice, "a", Some(&root)).await;
    env.create(alice, "b", Some(&root)).await;

    let err = env
        .run(alice, TaskKind::DeleteItem { item_id: root.id })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::TooManyDescendants);
    assert_eq!(env.item_count().await, 3);
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let env = TestEnv::new();
    let alice = AccountId::new();
    let bob = AccountId::new();
    let root = env.create(alice, "root", None).await;
    env.share(alice, &root, bob, PermissionLevel::Write).await;

    let err = env
        .run(bob, TaskKind::DeleteItem { item_id: root.id })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InsufficientPermissionAdmin);
}

#[tokio::test]
async fn test_delete_missing_item() {
    let env = TestEnv::new();

    let err = env
        .run(
            AccountId::new(),
            TaskKind::DeleteItem {
                item_id: itemhub_core::types::ItemId::new(),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ItemNotFound);
}
