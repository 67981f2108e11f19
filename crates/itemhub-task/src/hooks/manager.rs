//! Hook manager: one listener list per (task name, moment).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use itemhub_core::result::AppResult;
use itemhub_database::Transaction;

use super::definitions::{HookContext, HookMoment};

/// A listener invoked before or after a task's mutation.
///
/// Handlers run inside the task's transaction, so writes made through `tx`
/// commit or roll back together with the task.
#[async_trait]
pub trait TaskHook: Send + Sync {
    /// Handle one invocation. Returning an error aborts the task.
    async fn handle(&self, ctx: &HookContext<'_>, tx: &mut dyn Transaction) -> AppResult<()>;
}

type HookList = Arc<RwLock<Vec<Arc<dyn TaskHook>>>>;

/// Registry of hook handlers keyed by task name and moment.
///
/// Each channel's list is shared between the registry and the fan-out.
/// Every invocation snapshots the list first, so handlers registered or
/// removed while a task is in flight only affect later invocations.
#[derive(Default)]
pub struct HookManager {
    channels: RwLock<HashMap<(String, HookMoment), HookList>>,
}

impl HookManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    async fn channel(&self, task: &str, moment: HookMoment) -> HookList {
        let key = (task.to_string(), moment);
        if let Some(list) = self.channels.read().await.get(&key) {
            return list.clone();
        }
        self.channels
            .write()
            .await
            .entry(key)
            .or_default()
            .clone()
    }

    /// Append `handler` to the channel. Handlers run in registration order.
    pub async fn register(&self, task: &str, moment: HookMoment, handler: Arc<dyn TaskHook>) {
        let list = self.channel(task, moment).await;
        let mut handlers = list.write().await;
        handlers.push(handler);
        info!(task, %moment, count = handlers.len(), "Task hook registered");
    }

    /// Remove `handler` from the channel. Returns whether it was registered.
    pub async fn unregister(
        &self,
        task: &str,
        moment: HookMoment,
        handler: &Arc<dyn TaskHook>,
    ) -> bool {
        let list = self.channel(task, moment).await;
        let mut handlers = list.write().await;
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = handlers.len() < before;
        if removed {
            info!(task, %moment, "Task hook unregistered");
        }
        removed
    }

    /// Number of handlers in the channel.
    pub async fn handler_count(&self, task: &str, moment: HookMoment) -> usize {
        match self.channels.read().await.get(&(task.to_string(), moment)) {
            Some(list) => list.read().await.len(),
            None => 0,
        }
    }

    /// Invoke every handler of the channel named by `ctx`, in order,
    /// stopping at the first failure.
    pub async fn run(&self, ctx: &HookContext<'_>, tx: &mut dyn Transaction) -> AppResult<()> {
        let list = self.channel(ctx.task, ctx.moment).await;
        let handlers: Vec<Arc<dyn TaskHook>> = list.read().await.clone();
        if handlers.is_empty() {
            return Ok(());
        }

        debug!(task = ctx.task, moment = %ctx.moment, count = handlers.len(), "Running task hooks");
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler.handle(ctx, tx).await {
                error!(
                    task = ctx.task,
                    moment = %ctx.moment,
                    index,
                    error = %e,
                    "Task hook failed"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use itemhub_core::AppError;
    use itemhub_core::types::AccountId;
    use itemhub_database::{MemoryDatabase, TransactionManager};

    use crate::task::TaskOutput;

    struct Recorder {
        label: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl TaskHook for Recorder {
        async fn handle(&self, _ctx: &HookContext<'_>, _tx: &mut dyn Transaction) -> AppResult<()> {
            self.calls.lock().unwrap().push(self.label);
            if self.fail {
                return Err(AppError::hook_rejected(self.label));
            }
            Ok(())
        }
    }

    fn recorder(
        label: &'static str,
        calls: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn TaskHook> {
        Arc::new(Recorder {
            label,
            calls: calls.clone(),
            fail,
        })
    }

    fn context(subject: &TaskOutput) -> HookContext<'_> {
        HookContext {
            task: "create-item",
            moment: HookMoment::Pre,
            actor: AccountId::new(),
            subject,
            destination: None,
        }
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let manager = HookManager::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        manager
            .register("create-item", HookMoment::Pre, recorder("h1", &calls, false))
            .await;
        manager
            .register("create-item", HookMoment::Pre, recorder("h2", &calls, false))
            .await;

        let db = MemoryDatabase::new();
        let mut tx = db.begin().await.unwrap();
        let subject = TaskOutput::None;
        manager.run(&context(&subject), tx.as_mut()).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["h1", "h2"]);
    }

    #[tokio::test]
    async fn test_failure_stops_fan_out() {
        let manager = HookManager::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        manager
            .register("create-item", HookMoment::Pre, recorder("h1", &calls, true))
            .await;
        manager
            .register("create-item", HookMoment::Pre, recorder("h2", &calls, false))
            .await;

        let db = MemoryDatabase::new();
        let mut tx = db.begin().await.unwrap();
        let subject = TaskOutput::None;
        let err = manager.run(&context(&subject), tx.as_mut()).await.unwrap_err();

        assert_eq!(err.kind, itemhub_core::ErrorKind::HookRejected);
        assert_eq!(*calls.lock().unwrap(), vec!["h1"]);
    }

    #[tokio::test]
    async fn test_unregister_by_identity() {
        let manager = HookManager::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let h1 = recorder("h1", &calls, false);
        let h2 = recorder("h2", &calls, false);
        manager.register("move-item", HookMoment::Post, h1.clone()).await;
        manager.register("move-item", HookMoment::Post, h2).await;

        assert!(manager.unregister("move-item", HookMoment::Post, &h1).await);
        assert!(!manager.unregister("move-item", HookMoment::Post, &h1).await);
        assert_eq!(manager.handler_count("move-item", HookMoment::Post).await, 1);
        assert_eq!(manager.handler_count("move-item", HookMoment::Pre).await, 0);
    }
}
