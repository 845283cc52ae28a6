//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into account use-case APIs.
//! - Own the transaction boundary of every multi-table write.

pub mod account_service;
