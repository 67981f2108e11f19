//! In-memory store.
//!
//! Implements the same contracts as the PostgreSQL store over plain maps.
//! A top-level transaction holds the database lock for its whole lifetime
//! (so transactions are serializable) and works on a private copy of the
//! state that replaces the shared state on commit. Nested transactions copy
//! their parent's working state and write it back into the parent on
//! commit, which gives savepoint semantics.

mod items;
mod memberships;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use itemhub_core::result::AppResult;
use itemhub_core::types::{ItemId, MembershipId};
use itemhub_entity::{Item, ItemMembership};

use crate::store::{ItemStore, MembershipStore, Transaction, TransactionManager};

/// Plain snapshot of every stored row.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    items: BTreeMap<ItemId, Item>,
    memberships: BTreeMap<MembershipId, ItemMembership>,
}

impl MemoryState {
    /// Look up an item by id.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// All stored items.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// All stored memberships.
    pub fn memberships(&self) -> impl Iterator<Item = &ItemMembership> {
        self.memberships.values()
    }
}

/// Shared in-memory database handle. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state. Waits for any open transaction.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl TransactionManager for MemoryDatabase {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            working,
            target: CommitTarget::Root(guard),
        }))
    }
}

/// Where a transaction's working state goes on commit.
enum CommitTarget<'p> {
    Root(OwnedMutexGuard<MemoryState>),
    Nested(&'p mut MemoryState),
}

/// A transaction over a [`MemoryDatabase`].
pub struct MemoryTransaction<'p> {
    pub(crate) working: MemoryState,
    target: CommitTarget<'p>,
}

#[async_trait]
impl<'p> Transaction for MemoryTransaction<'p> {
    async fn begin_nested(&mut self) -> AppResult<Box<dyn Transaction + '_>> {
        let working = self.working.clone();
        Ok(Box::new(MemoryTransaction {
            working,
            target: CommitTarget::Nested(&mut self.working),
        }))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        match this.target {
            CommitTarget::Root(mut guard) => *guard = this.working,
            CommitTarget::Nested(parent) => *parent = this.working,
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        debug!("Discarding in-memory transaction");
        Ok(())
    }

    async fn lock_tree(&mut self, _root: ItemId) -> AppResult<()> {
        // The whole database is already locked by the top-level transaction.
        Ok(())
    }

    fn items(&mut self) -> &mut dyn ItemStore {
        self
    }

    fn memberships(&mut self) -> &mut dyn MembershipStore {
        self
    }
}
