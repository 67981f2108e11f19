//! Shared helpers for task runner integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use itemhub_core::config::LimitsConfig;
use itemhub_core::error::AppError;
use itemhub_core::result::AppResult;
use itemhub_core::types::{AccountId, ItemId};
use itemhub_database::{MemoryDatabase, Transaction};
use itemhub_entity::{CreateItemInput, FOLDER_TYPE, Item, ItemMembership, PermissionLevel};
use itemhub_task::{HookContext, Task, TaskHook, TaskKind, TaskOutput, TaskRunner};

/// Runner over a fresh in-memory database.
pub struct TestEnv {
    /// Handle used to inspect committed state.
    pub db: MemoryDatabase,
    /// Runner under test.
    pub runner: TaskRunner,
}

impl TestEnv {
    /// Environment with default limits.
    pub fn new() -> Self {
        Self::with_limits(LimitsConfig::default())
    }

    /// Environment with custom limits.
    pub fn with_limits(limits: LimitsConfig) -> Self {
        let db = MemoryDatabase::new();
        let runner = TaskRunner::new(Arc::new(db.clone()), limits);
        Self { db, runner }
    }

    /// Run one task in its own transaction.
    pub async fn run(&self, actor: AccountId, kind: TaskKind) -> AppResult<TaskOutput> {
        let mut task = Task::new(actor, kind);
        self.runner.run_single(&mut task).await
    }

    /// Create a folder as `actor`, at root or under `parent`.
    pub async fn create(&self, actor: AccountId, name: &str, parent: Option<&Item>) -> Item {
        self.run(
            actor,
            TaskKind::CreateItem {
                input: CreateItemInput::new(name, FOLDER_TYPE),
                parent_id: parent.map(|p| p.id),
            },
        )
        .await
        .expect("create item")
        .into_item()
        .expect("item output")
    }

    /// Grant `permission` on `item` to `account`, acting as `actor`.
    pub async fn share(
        &self,
        actor: AccountId,
        item: &Item,
        account: AccountId,
        permission: PermissionLevel,
    ) -> ItemMembership {
        self.run(
            actor,
            TaskKind::CreateItemMembership {
                item_id: item.id,
                account_id: account,
                permission,
            },
        )
        .await
        .expect("create membership")
        .into_membership()
        .expect("membership output")
    }

    /// Committed item, if it exists.
    pub async fn item(&self, id: ItemId) -> Option<Item> {
        self.db.snapshot().await.item(id).cloned()
    }

    /// Number of committed items.
    pub async fn item_count(&self) -> usize {
        self.db.snapshot().await.items().count()
    }

    /// Committed grants held by `account`, shallowest first.
    pub async fn memberships_of(&self, account: AccountId) -> Vec<ItemMembership> {
        let mut grants: Vec<ItemMembership> = self
            .db
            .snapshot()
            .await
            .memberships()
            .filter(|m| m.account_id == account)
            .cloned()
            .collect();
        grants.sort_by_key(|m| m.item_path.depth());
        grants
    }
}

/// Ordered record of hook invocations shared between handlers.
#[derive(Default)]
pub struct HookLog(Mutex<Vec<String>>);

impl HookLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Hook that logs `label:moment:item-name` and optionally rejects its
/// n-th call.
pub struct RecordingHook {
    label: String,
    log: Arc<HookLog>,
    fail_on_call: Option<usize>,
    failure: fn(String) -> AppError,
    calls: AtomicUsize,
}

impl RecordingHook {
    pub fn new(label: &str, log: &Arc<HookLog>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
            fail_on_call: None,
            failure: |message| AppError::hook_rejected(message),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_on(label: &str, log: &Arc<HookLog>, call: usize) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
            fail_on_call: Some(call),
            failure: |message| AppError::hook_rejected(message),
            calls: AtomicUsize::new(0),
        })
    }

    /// Rejects its first call with a non-domain error.
    pub fn crashing(label: &str, log: &Arc<HookLog>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
            fail_on_call: Some(1),
            failure: |message| AppError::database(message),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHook for RecordingHook {
    async fn handle(&self, ctx: &HookContext<'_>, _tx: &mut dyn Transaction) -> AppResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let subject = ctx
            .subject
            .as_item()
            .map(|item| item.name.clone())
            .unwrap_or_default();
        self.log
            .push(format!("{}:{}:{}", self.label, ctx.moment, subject));

        if self.fail_on_call == Some(call) {
            return Err((self.failure)(format!("{} rejected call {call}", self.label)));
        }
        Ok(())
    }
}
