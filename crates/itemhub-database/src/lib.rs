//! # itemhub-database
//!
//! Transactional store contracts for items and memberships, with a
//! PostgreSQL implementation, an in-memory implementation used by tests and
//! local tooling, the membership inheritance rules shared by both, and the
//! migration runner.

pub mod connection;
pub mod inheritance;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryDatabase;
pub use store::{ItemStore, MembershipFilter, MembershipStore, Transaction, TransactionManager};
