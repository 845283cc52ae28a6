//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define data access contracts for accounts and their child relations.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate model values before any SQL mutation.
//! - Child lookups are always scoped to the owning account.
//! - Repositories never open their own transactions; callers pass a
//!   connection or transaction that defines the atomic boundary.

pub mod account_repo;
pub mod child_repo;
mod error;
mod schema;

pub use error::{RepoError, RepoResult};
