//! Membership inheritance rules.
//!
//! A grant attached to an item applies to its whole subtree. When an
//! account holds several grants along one ancestor chain, the grant at the
//! closest (deepest) item is the authoritative one. These functions are
//! pure so both store implementations and the tasks share one definition.

use std::collections::HashMap;

use itemhub_core::types::{AccountId, ItemPath, MembershipId};
use itemhub_entity::ItemMembership;

/// Membership changes that keep access stable across a move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveHousekeeping {
    /// Grants to materialize at the moved item's new path.
    pub inserts: Vec<ItemMembership>,
    /// Grants inside the moved subtree made redundant by the new ancestors.
    pub deletes: Vec<MembershipId>,
}

impl MoveHousekeeping {
    /// Whether the move needs no membership changes.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// The closest grant per account among `grants`.
pub fn closest_grants(grants: &[ItemMembership]) -> HashMap<AccountId, &ItemMembership> {
    let mut closest: HashMap<AccountId, &ItemMembership> = HashMap::new();
    for grant in grants {
        closest
            .entry(grant.account_id)
            .and_modify(|current| {
                if grant.item_path.depth() > current.item_path.depth() {
                    *current = grant;
                }
            })
            .or_insert(grant);
    }
    closest
}

/// Effective grant per account at `path`, given every grant attached at
/// `path` or one of its ancestors. Sorted by account for stable output.
pub fn effective_grants(path: &ItemPath, chain: &[ItemMembership]) -> Vec<ItemMembership> {
    let applicable: Vec<ItemMembership> = chain
        .iter()
        .filter(|grant| grant.item_path.contains(path))
        .cloned()
        .collect();

    let mut effective: Vec<ItemMembership> = closest_grants(&applicable)
        .into_values()
        .cloned()
        .collect();
    effective.sort_by_key(|grant| grant.account_id);
    effective
}

/// Compute the housekeeping for moving the item at `old_path` to
/// `new_path`.
///
/// * `old_grants`: grants attached at strict ancestors of `old_path`.
/// * `new_grants`: grants attached at strict ancestors of `new_path`.
/// * `subtree`: grants attached at `old_path` or below.
///
/// For every account, the grant inherited at the old location that the
/// new ancestor chain does not cover with an equal or stronger grant is
/// re-created at the moved item, unless the account already holds a grant
/// there. Grants inside the subtree that are no stronger than what the
/// new chain already provides are deleted.
pub fn compute_move_housekeeping(
    actor: AccountId,
    old_path: &ItemPath,
    new_path: &ItemPath,
    old_grants: &[ItemMembership],
    new_grants: &[ItemMembership],
    subtree: &[ItemMembership],
) -> MoveHousekeeping {
    let old_inherited = closest_grants(old_grants);
    let new_inherited = closest_grants(new_grants);

    let mut inserts: Vec<ItemMembership> = old_inherited
        .iter()
        .filter(|(account, old)| {
            let covered = new_inherited
                .get(*account)
                .is_some_and(|new| new.permission >= old.permission);
            let own_grant = subtree
                .iter()
                .any(|grant| grant.account_id == **account && grant.is_at(old_path));
            !covered && !own_grant
        })
        .map(|(account, old)| {
            ItemMembership::new(new_path.clone(), *account, old.permission, actor)
        })
        .collect();
    inserts.sort_by_key(|grant| grant.account_id);

    let deletes = subtree
        .iter()
        .filter(|grant| {
            new_inherited
                .get(&grant.account_id)
                .is_some_and(|new| grant.permission <= new.permission)
        })
        .map(|grant| grant.id)
        .collect();

    MoveHousekeeping { inserts, deletes }
}
