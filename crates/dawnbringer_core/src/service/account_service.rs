//! Account use-case service.
//!
//! # Responsibility
//! - Provide account create/update/get/list/delete APIs.
//! - Run each write use-case inside one `IMMEDIATE` transaction.
//! - Assemble profile, list and avatar read models.
//!
//! # Invariants
//! - `update_account` commits the scalar merge and all four relation
//!   reconciliations together or not at all.
//! - Create inserts children in bulk; update reconciles them.
//! - Relations are reconciled in the order personal, contact, address,
//!   avatar.

use crate::model::account::{
    normalize_middle_name, Account, AccountId, AccountValidationError, NewAccount,
};
use crate::model::child::{
    AddressInfo, AvatarInfo, ChildId, ChildValidationError, ContactInfo, PersonalInfo,
};
use crate::model::payload::{AccountCreateRequest, AccountUpdateRequest};
use crate::model::views::{AccountAvatar, AccountListItem, AccountProfile, AddressInfoView};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::repo::account_repo::{AccountListQuery, AccountRepository, SqliteAccountRepository};
use crate::repo::child_repo::{ChildStore, ChildTable, SqliteChildRepository};
use crate::repo::{RepoError, RepoResult};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const ACCOUNTS_DEFAULT_LIMIT: u32 = 20;
const ACCOUNTS_LIMIT_MAX: u32 = 100;

/// Service error for account use-cases.
#[derive(Debug)]
pub enum AccountServiceError {
    AccountNotFound(AccountId),
    /// `parent_id` of a create request names no account.
    ParentNotFound(AccountId),
    InvalidAccount(AccountValidationError),
    InvalidChild(ChildValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl AccountServiceError {
    /// Whether the request itself was rejected, as opposed to a storage fault.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAccount(_) | Self::InvalidChild(_) | Self::ParentNotFound(_)
        )
    }
}

impl Display for AccountServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNotFound(id) => write!(f, "account not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent account not found: {id}"),
            Self::InvalidAccount(err) => write!(f, "{err}"),
            Self::InvalidChild(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAccount(err) => Some(err),
            Self::InvalidChild(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccountServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AccountNotFound(id) => Self::AccountNotFound(id),
            RepoError::InvalidAccount(err) => Self::InvalidAccount(err),
            RepoError::InvalidChild(err) => Self::InvalidChild(err),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for AccountServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Result of one account update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountUpdateResult {
    /// Read-back of the account after commit.
    pub profile: AccountProfile,
    pub personal_info: ReconcileOutcome,
    pub contact_info: ReconcileOutcome,
    pub address_info: ReconcileOutcome,
    pub avatar_info: ReconcileOutcome,
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountsListResult {
    /// Items sorted by `created DESC`.
    pub items: Vec<AccountListItem>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Account service over a migrated SQLite connection.
pub struct AccountService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> AccountService<'conn> {
    /// Creates a service after checking that every account table is ready.
    pub fn try_new(conn: &'conn mut Connection) -> Result<Self, AccountServiceError> {
        SqliteAccountRepository::try_new(conn)?;
        SqliteChildRepository::<PersonalInfo>::try_new(conn)?;
        SqliteChildRepository::<ContactInfo>::try_new(conn)?;
        SqliteChildRepository::<AddressInfo>::try_new(conn)?;
        SqliteChildRepository::<AvatarInfo>::try_new(conn)?;
        Ok(Self { conn })
    }

    /// Creates an account together with its initial children.
    pub fn create_account(
        &mut self,
        request: &AccountCreateRequest,
    ) -> Result<AccountProfile, AccountServiceError> {
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let profile = match create_in_tx(&tx, request) {
            Ok(profile) => profile,
            Err(err) => {
                error!(
                    "event=account_create module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };
        tx.commit()?;

        info!(
            "event=account_create module=service status=ok account_id={} duration_ms={}",
            profile.account.id,
            started_at.elapsed().as_millis()
        );
        Ok(profile)
    }

    /// Merges scalar fields and reconciles all four child relations.
    ///
    /// Any failure rolls back the whole update, including relations that
    /// were already reconciled.
    pub fn update_account(
        &mut self,
        id: AccountId,
        request: &AccountUpdateRequest,
    ) -> Result<AccountUpdateResult, AccountServiceError> {
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = match update_in_tx(&tx, id, request) {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "event=account_update module=service status=rolled_back account_id={} duration_ms={} error={}",
                    id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };
        tx.commit()?;

        info!(
            "event=account_update module=service status=ok account_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Gets one account profile, including soft-deleted accounts.
    pub fn get_account_profile(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountProfile>, AccountServiceError> {
        let accounts = SqliteAccountRepository::try_new(&*self.conn)?;
        match accounts.get_account(id, true)? {
            Some(account) => Ok(Some(load_profile(&*self.conn, account)?)),
            None => Ok(None),
        }
    }

    /// Lists accounts with parent name/number columns.
    pub fn list_accounts(
        &self,
        include_deleted: bool,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<AccountsListResult, AccountServiceError> {
        let accounts = SqliteAccountRepository::try_new(&*self.conn)?;
        let applied_limit = normalize_account_limit(limit);
        let rows = accounts.list_accounts(&AccountListQuery {
            include_deleted,
            limit: Some(applied_limit),
            offset,
        })?;

        let mut parents: HashMap<AccountId, Option<Account>> = HashMap::new();
        let mut items = Vec::with_capacity(rows.len());
        for account in &rows {
            let parent = match account.parent_id {
                Some(parent_id) => {
                    if !parents.contains_key(&parent_id) {
                        parents.insert(parent_id, accounts.get_account(parent_id, true)?);
                    }
                    parents.get(&parent_id).and_then(Option::as_ref)
                }
                None => None,
            };
            items.push(AccountListItem::new(account, parent));
        }

        Ok(AccountsListResult {
            items,
            applied_limit,
        })
    }

    /// Gets the avatar projection of one account.
    pub fn get_account_avatar(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountAvatar>, AccountServiceError> {
        let accounts = SqliteAccountRepository::try_new(&*self.conn)?;
        let Some(account) = accounts.get_account(id, false)? else {
            return Ok(None);
        };
        let avatars =
            SqliteChildRepository::<AvatarInfo>::try_new(&*self.conn)?.find_all_by_parent(id)?;
        Ok(Some(AccountAvatar::new(&account, &avatars)))
    }

    /// Marks an account deleted. Idempotent; children are kept.
    pub fn soft_delete_account(&mut self, id: AccountId) -> Result<(), AccountServiceError> {
        SqliteAccountRepository::try_new(&*self.conn)?.soft_delete_account(id)?;
        info!("event=account_soft_delete module=service status=ok account_id={id}");
        Ok(())
    }

    /// Removes an account row; its children go with it via foreign keys.
    pub fn delete_account(&mut self, id: AccountId) -> Result<(), AccountServiceError> {
        SqliteAccountRepository::try_new(&*self.conn)?.delete_account(id)?;
        info!("event=account_delete module=service status=ok account_id={id}");
        Ok(())
    }
}

/// Normalizes list limit: 0 or `None` mean default, values above the cap clamp.
pub fn normalize_account_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => ACCOUNTS_DEFAULT_LIMIT,
        Some(value) if value > ACCOUNTS_LIMIT_MAX => ACCOUNTS_LIMIT_MAX,
        Some(value) => value,
    }
}

fn create_in_tx(
    conn: &Connection,
    request: &AccountCreateRequest,
) -> Result<AccountProfile, AccountServiceError> {
    let accounts = SqliteAccountRepository::try_new(conn)?;
    if let Some(parent_id) = request.parent_id {
        if accounts.get_account(parent_id, true)?.is_none() {
            return Err(AccountServiceError::ParentNotFound(parent_id));
        }
    }

    let account = accounts.create_account(&NewAccount {
        first_name: request.first_name.trim().to_string(),
        middle_name: normalize_middle_name(request.middle_name.as_deref()),
        last_name: request.last_name.trim().to_string(),
        account_status: request.account_status,
        parent_id: request.parent_id,
    })?;

    insert_children::<PersonalInfo>(conn, account.id, &request.personal_info)?;
    insert_children::<ContactInfo>(conn, account.id, &request.contact_info)?;
    insert_children::<AddressInfo>(conn, account.id, &request.address_info)?;
    insert_children::<AvatarInfo>(conn, account.id, &request.avatar_info)?;

    Ok(load_profile(conn, account)?)
}

fn update_in_tx(
    conn: &Connection,
    id: AccountId,
    request: &AccountUpdateRequest,
) -> Result<AccountUpdateResult, AccountServiceError> {
    let accounts = SqliteAccountRepository::try_new(conn)?;
    let mut account = accounts
        .get_account(id, true)?
        .ok_or(AccountServiceError::AccountNotFound(id))?;
    merge_account_fields(&mut account, request);
    let account = accounts.update_account(&account)?;

    let personal_info = reconcile::<PersonalInfo, _>(
        &SqliteChildRepository::<PersonalInfo>::try_new(conn)?,
        &account,
        &request.personal_info,
    )?;
    let contact_info = reconcile::<ContactInfo, _>(
        &SqliteChildRepository::<ContactInfo>::try_new(conn)?,
        &account,
        &request.contact_info,
    )?;
    let address_info = reconcile::<AddressInfo, _>(
        &SqliteChildRepository::<AddressInfo>::try_new(conn)?,
        &account,
        &request.address_info,
    )?;
    let avatar_info = reconcile::<AvatarInfo, _>(
        &SqliteChildRepository::<AvatarInfo>::try_new(conn)?,
        &account,
        &request.avatar_info,
    )?;

    Ok(AccountUpdateResult {
        profile: load_profile(conn, account)?,
        personal_info,
        contact_info,
        address_info,
        avatar_info,
    })
}

fn merge_account_fields(account: &mut Account, request: &AccountUpdateRequest) {
    if let Some(first_name) = &request.first_name {
        account.first_name = first_name.trim().to_string();
    }
    if let Some(middle_name) = &request.middle_name {
        account.middle_name = normalize_middle_name(Some(middle_name));
    }
    if let Some(last_name) = &request.last_name {
        account.last_name = last_name.trim().to_string();
    }
    if let Some(account_status) = request.account_status {
        account.account_status = account_status;
    }
    if let Some(is_deleted) = request.is_deleted {
        account.is_deleted = is_deleted;
    }
}

fn insert_children<F: ChildTable>(
    conn: &Connection,
    account_id: AccountId,
    patches: &[F::Patch],
) -> RepoResult<Vec<ChildId>> {
    let store = SqliteChildRepository::<F>::try_new(conn)?;
    patches
        .iter()
        .map(|patch| -> RepoResult<ChildId> {
            let fields = F::from_patch(patch)?;
            Ok(store.create(account_id, &fields)?.id)
        })
        .collect()
}

fn load_profile(conn: &Connection, account: Account) -> RepoResult<AccountProfile> {
    let parent_name = match account.parent_id {
        Some(parent_id) => SqliteAccountRepository::try_new(conn)?
            .get_account(parent_id, true)?
            .map(|parent| parent.full_name()),
        None => None,
    };

    Ok(AccountProfile {
        full_name: account.full_name(),
        account_number: account.account_number(),
        parent_name,
        personal_info: SqliteChildRepository::<PersonalInfo>::try_new(conn)?
            .find_all_by_parent(account.id)?,
        contact_info: SqliteChildRepository::<ContactInfo>::try_new(conn)?
            .find_all_by_parent(account.id)?,
        address_info: SqliteChildRepository::<AddressInfo>::try_new(conn)?
            .find_all_by_parent(account.id)?
            .into_iter()
            .map(AddressInfoView::from)
            .collect(),
        avatar_info: SqliteChildRepository::<AvatarInfo>::try_new(conn)?
            .find_all_by_parent(account.id)?,
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::normalize_account_limit;

    #[test]
    fn account_limit_defaults_and_caps() {
        assert_eq!(normalize_account_limit(None), 20);
        assert_eq!(normalize_account_limit(Some(0)), 20);
        assert_eq!(normalize_account_limit(Some(7)), 7);
        assert_eq!(normalize_account_limit(Some(500)), 100);
    }
}
