//! PostgreSQL implementations of the store contracts.

pub mod item;
pub mod membership;
pub mod transaction;

pub use transaction::PgTransaction;
