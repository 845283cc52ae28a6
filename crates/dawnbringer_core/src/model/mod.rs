//! Account domain model.
//!
//! # Responsibility
//! - Define the persisted account record and its four child relations.
//! - Define request payload shapes accepted by create/update use-cases.
//! - Define read models returned to callers.
//!
//! # Invariants
//! - Every persisted child belongs to exactly one account.
//! - Update payloads distinguish an absent relation from an empty one.

pub mod account;
pub mod child;
pub mod payload;
pub mod views;
