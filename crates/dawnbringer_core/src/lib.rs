//! Core domain logic for Dawnbringer account management.
//! This crate is the single source of truth for account invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::account::{Account, AccountId, AccountStatus, AccountValidationError, NewAccount};
pub use model::child::{
    AddressInfo, AddressInfoPatch, AvatarInfo, AvatarInfoPatch, Child, ChildFields, ChildId,
    ChildValidationError, ContactInfo, ContactInfoPatch, Gender, PersonalInfo, PersonalInfoPatch,
    RelationKind,
};
pub use model::payload::{AccountCreateRequest, AccountUpdateRequest, ChildEntry, RelationPayload};
pub use model::views::{AccountAvatar, AccountListItem, AccountProfile, AddressInfoView};
pub use reconcile::{reconcile, ReconcileOutcome, ReconcileReport};
pub use repo::account_repo::{AccountListQuery, AccountRepository, SqliteAccountRepository};
pub use repo::child_repo::{ChildStore, ChildTable, SqliteChildRepository};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::{
    AccountService, AccountServiceError, AccountUpdateResult, AccountsListResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
